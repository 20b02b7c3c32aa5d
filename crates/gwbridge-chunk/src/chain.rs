use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{ChunkError, Result};
use crate::layout::CHUNK_PAYLOAD_SIZE;
use crate::pool::{ChunkHandle, ChunkIndex, ChunkPool};

/// A primary chunk plus the chunks linked behind it.
///
/// The chain owns its handles, so one chunk can never appear twice and the
/// chain is acyclic by construction. Link fields are kept in step with the
/// handle order so the chain can be transferred as a single head index.
#[derive(Debug)]
pub struct ChunkChain {
    chunks: Vec<ChunkHandle>,
    max_extra: usize,
}

impl ChunkChain {
    /// Start a chain with a single primary chunk.
    pub fn new(mut primary: ChunkHandle) -> Self {
        primary.set_link(None);
        let max_extra = primary.max_extra_chunks();
        Self {
            chunks: vec![primary],
            max_extra,
        }
    }

    /// Append `next` behind the current tail.
    ///
    /// Fails with [`ChunkError::ChainTooLong`] once the extra-chunk limit is
    /// reached, and with [`ChunkError::ForeignChunk`] when `next` comes from
    /// another pool. The rejected chunk goes back to its pool.
    pub fn link(&mut self, mut next: ChunkHandle) -> Result<()> {
        if !self.primary().same_pool(&next) {
            warn!(chunk = %next.index(), "rejecting link to a chunk of another pool");
            let index = next.index();
            next.release();
            return Err(ChunkError::ForeignChunk(index));
        }
        if self.extra_count() >= self.max_extra {
            warn!(
                chunk = %next.index(),
                max = self.max_extra,
                "rejecting link beyond extra-chunk limit"
            );
            next.release();
            return Err(ChunkError::ChainTooLong {
                max: self.max_extra,
            });
        }

        next.set_link(None);
        let next_index = next.index();
        if let Some(tail) = self.chunks.last_mut() {
            tail.set_link(Some(next_index));
        }
        self.chunks.push(next);
        debug!(chunk = %next_index, extra = self.extra_count(), "chunk linked");
        Ok(())
    }

    /// The chunk carrying the transport header and socket data.
    pub fn primary(&self) -> &ChunkHandle {
        &self.chunks[0]
    }

    pub fn primary_mut(&mut self) -> &mut ChunkHandle {
        &mut self.chunks[0]
    }

    /// Chunk at `position` in link order (0 is the primary chunk).
    pub fn get(&self, position: usize) -> Option<&ChunkHandle> {
        self.chunks.get(position)
    }

    pub(crate) fn get_mut(&mut self, position: usize) -> Option<&mut ChunkHandle> {
        self.chunks.get_mut(position)
    }

    /// Number of chunks behind the primary chunk.
    pub fn extra_count(&self) -> usize {
        self.chunks.len() - 1
    }

    /// Number of chunks including the primary.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Always false: a chain has at least its primary chunk.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks allowed behind the primary chunk.
    pub fn max_extra(&self) -> usize {
        self.max_extra
    }

    /// Payload bytes the chain holds right now.
    pub fn payload_capacity(&self) -> usize {
        self.chunks.len() * CHUNK_PAYLOAD_SIZE
    }

    /// Chunks in link order.
    pub fn iter(&self) -> impl Iterator<Item = &ChunkHandle> {
        self.chunks.iter()
    }

    /// Return every chunk to the pool.
    pub fn release(self) {
        for chunk in self.chunks {
            chunk.release();
        }
    }

    /// Hand the whole chain to the other side; returns the head index.
    pub fn transfer(self) -> ChunkIndex {
        let head = self.primary().index();
        for chunk in self.chunks {
            chunk.transfer();
        }
        head
    }

    pub(crate) fn pool(&self) -> ChunkPool {
        self.primary().pool()
    }
}

impl ChunkPool {
    /// Hand a chain to the other side; returns the head index.
    pub fn transfer_chain(&self, chain: ChunkChain) -> ChunkIndex {
        chain.transfer()
    }

    /// Claim a chain handed over with [`ChunkPool::transfer_chain`].
    ///
    /// Follows link fields from `head`. A revisited chunk, a link outside the
    /// pool, or more chunks than the extra-chunk limit fail with
    /// [`ChunkError::MalformedChain`]. Chunks claimed so far are released, and
    /// chunks still in transit behind the failure point are reclaimed.
    pub fn receive_chain(&self, head: ChunkIndex) -> Result<ChunkChain> {
        let primary = self.receive(head)?;
        let mut next = primary.link()?;
        let mut chunks = vec![primary];
        let mut seen = HashSet::from([head]);

        while let Some(index) = next {
            if !seen.insert(index) {
                warn!(chunk = %index, "cycle in received chunk chain");
                return Err(ChunkError::MalformedChain(format!(
                    "chunk {index} linked twice"
                )));
            }
            if chunks.len() > self.max_extra_chunks() {
                warn!(head = %head, "received chunk chain exceeds limit");
                self.reclaim_in_transit(index, &mut seen);
                return Err(ChunkError::MalformedChain(format!(
                    "more than {} extra chunks behind {head}",
                    self.max_extra_chunks()
                )));
            }
            let chunk = self.receive(index).map_err(|err| {
                ChunkError::MalformedChain(format!("bad link to {index}: {err}"))
            })?;
            next = chunk.link()?;
            chunks.push(chunk);
        }

        debug!(head = %head, chunks = chunks.len(), "chunk chain received");
        Ok(ChunkChain {
            chunks,
            max_extra: self.max_extra_chunks(),
        })
    }

    /// Release the in-transit chunks reachable from `start` after a chain was
    /// rejected. Their indices live only in link fields, so nobody else can
    /// claim them.
    fn reclaim_in_transit(&self, start: ChunkIndex, seen: &mut HashSet<ChunkIndex>) {
        let mut next = Some(start);
        let mut reclaimed = 0usize;
        while let Some(index) = next {
            if reclaimed >= self.capacity() {
                break;
            }
            let Ok(chunk) = self.receive(index) else {
                break;
            };
            reclaimed += 1;
            next = chunk.link().ok().flatten().filter(|link| seen.insert(*link));
        }
        if reclaimed > 0 {
            debug!(start = %start, reclaimed, "reclaimed chunks behind rejected chain");
        }
    }
}
