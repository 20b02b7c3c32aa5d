use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::{ChunkError, Result};
use crate::layout::{
    decode_link, encode_link, TransportHeader, CHUNK_PAYLOAD_SIZE, LINK_SIZE,
    MAX_EXTRA_LINKED_CHUNKS,
};

/// Default number of chunks in a pool.
pub const DEFAULT_CHUNK_COUNT: usize = 1024;

/// Position of a chunk in the shared pool.
///
/// This is the value that crosses the process boundary; the bytes stay put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkIndex(u32);

impl ChunkIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChunkIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Configuration for a chunk pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of chunks. Default: 1024.
    pub chunk_count: usize,
    /// Chunks allowed behind a primary chunk. Default and upper bound: 32.
    pub max_extra_chunks: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            chunk_count: DEFAULT_CHUNK_COUNT,
            max_extra_chunks: MAX_EXTRA_LINKED_CHUNKS,
        }
    }
}

/// Snapshot of slot ownership in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub free: usize,
    pub owned: usize,
    pub in_transit: usize,
}

/// Raw chunk memory: link field followed by payload.
#[repr(C)]
pub(crate) struct ChunkBuf {
    link: [u8; LINK_SIZE],
    payload: [u8; CHUNK_PAYLOAD_SIZE],
}

impl ChunkBuf {
    fn zeroed() -> Box<Self> {
        Box::new(Self {
            link: [0; LINK_SIZE],
            payload: [0; CHUNK_PAYLOAD_SIZE],
        })
    }

    fn reset(&mut self) {
        self.link = encode_link(None).to_le_bytes();
        self.payload.fill(0);
    }
}

enum Slot {
    Free,
    Owned,
    InTransit(Box<ChunkBuf>),
}

struct PoolState {
    slots: Vec<Slot>,
    free: Vec<(ChunkIndex, Box<ChunkBuf>)>,
}

struct PoolShared {
    state: Mutex<PoolState>,
    capacity: usize,
    max_extra_chunks: usize,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Every transition is a single slot assignment, so a poisoned lock
        // still guards consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put_back(&self, index: ChunkIndex, buf: Box<ChunkBuf>) {
        let mut state = self.lock();
        state.slots[index.get() as usize] = Slot::Free;
        state.free.push((index, buf));
        debug!(chunk = %index, "chunk released");
    }

    fn park(&self, index: ChunkIndex, buf: Box<ChunkBuf>) {
        let mut state = self.lock();
        state.slots[index.get() as usize] = Slot::InTransit(buf);
        debug!(chunk = %index, "chunk in transit");
    }
}

/// A pool of fixed-size chunks shared by the gateway and the host.
///
/// Each chunk has exactly one owner at any time: nobody (free), the holder of
/// a [`ChunkHandle`], or the transfer baton between [`ChunkPool::transfer`]
/// and [`ChunkPool::receive`]. Cloning the pool clones a reference to the same
/// chunks.
#[derive(Clone)]
pub struct ChunkPool {
    shared: Arc<PoolShared>,
}

impl ChunkPool {
    /// Create a pool with explicit configuration.
    pub fn new(config: PoolConfig) -> Self {
        let capacity = config.chunk_count.min(u32::MAX as usize);
        let max_extra_chunks = config.max_extra_chunks.min(MAX_EXTRA_LINKED_CHUNKS);

        let slots = (0..capacity).map(|_| Slot::Free).collect();
        // Reversed so that low indices are handed out first.
        let free = (0..capacity as u32)
            .rev()
            .map(|index| (ChunkIndex::new(index), ChunkBuf::zeroed()))
            .collect();

        Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState { slots, free }),
                capacity,
                max_extra_chunks,
            }),
        }
    }

    /// Create a pool of `chunk_count` chunks with default limits.
    pub fn with_capacity(chunk_count: usize) -> Self {
        Self::new(PoolConfig {
            chunk_count,
            ..PoolConfig::default()
        })
    }

    /// Total number of chunks.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Chunks allowed behind a primary chunk in this pool.
    pub fn max_extra_chunks(&self) -> usize {
        self.shared.max_extra_chunks
    }

    /// Take a free chunk. Never blocks.
    ///
    /// The chunk comes back zeroed with a terminated link field.
    pub fn acquire(&self) -> Result<ChunkHandle> {
        let mut state = self.shared.lock();
        let Some((index, mut buf)) = state.free.pop() else {
            drop(state);
            warn!(capacity = self.shared.capacity, "chunk pool exhausted");
            return Err(ChunkError::PoolExhausted {
                capacity: self.shared.capacity,
            });
        };
        state.slots[index.get() as usize] = Slot::Owned;
        drop(state);

        buf.reset();
        debug!(chunk = %index, "chunk acquired");
        Ok(ChunkHandle::new(index, buf, Arc::clone(&self.shared)))
    }

    /// Return a chunk to the pool.
    pub fn release(&self, handle: ChunkHandle) {
        handle.release();
    }

    /// Hand a chunk to the other side and give up local access to it.
    pub fn transfer(&self, handle: ChunkHandle) -> ChunkIndex {
        handle.transfer()
    }

    /// Claim a chunk handed over with [`ChunkPool::transfer`].
    pub fn receive(&self, index: ChunkIndex) -> Result<ChunkHandle> {
        let mut state = self.shared.lock();
        let slot = state
            .slots
            .get_mut(index.get() as usize)
            .ok_or(ChunkError::InvalidIndex(index))?;

        match std::mem::replace(slot, Slot::Owned) {
            Slot::InTransit(buf) => {
                drop(state);
                debug!(chunk = %index, "chunk received");
                Ok(ChunkHandle::new(index, buf, Arc::clone(&self.shared)))
            }
            other => {
                *slot = other;
                Err(ChunkError::NotInTransit(index))
            }
        }
    }

    /// Count slots by owner.
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.lock();
        let mut stats = PoolStats {
            capacity: self.shared.capacity,
            free: 0,
            owned: 0,
            in_transit: 0,
        };
        for slot in &state.slots {
            match slot {
                Slot::Free => stats.free += 1,
                Slot::Owned => stats.owned += 1,
                Slot::InTransit(_) => stats.in_transit += 1,
            }
        }
        stats
    }
}

impl fmt::Debug for ChunkPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkPool")
            .field("capacity", &self.shared.capacity)
            .field("max_extra_chunks", &self.shared.max_extra_chunks)
            .finish()
    }
}

/// Exclusive ownership of one chunk.
///
/// Consumed by [`release`](Self::release) and [`transfer`](Self::transfer).
/// Dropping the handle releases the chunk.
pub struct ChunkHandle {
    index: ChunkIndex,
    // Taken exactly once, in `Drop`.
    buf: ManuallyDrop<Box<ChunkBuf>>,
    pool: Arc<PoolShared>,
    in_transit: bool,
}

impl ChunkHandle {
    fn new(index: ChunkIndex, buf: Box<ChunkBuf>, pool: Arc<PoolShared>) -> Self {
        Self {
            index,
            buf: ManuallyDrop::new(buf),
            pool,
            in_transit: false,
        }
    }

    /// Position of this chunk in its pool.
    pub fn index(&self) -> ChunkIndex {
        self.index
    }

    /// Payload bytes (everything after the link field).
    pub fn payload(&self) -> &[u8; CHUNK_PAYLOAD_SIZE] {
        &self.buf.payload
    }

    /// Mutable payload bytes.
    pub fn payload_mut(&mut self) -> &mut [u8; CHUNK_PAYLOAD_SIZE] {
        &mut self.buf.payload
    }

    /// Decoded link field.
    pub fn link(&self) -> Result<Option<ChunkIndex>> {
        decode_link(u64::from_le_bytes(self.buf.link))
    }

    pub(crate) fn set_link(&mut self, next: Option<ChunkIndex>) {
        self.buf.link = encode_link(next).to_le_bytes();
    }

    /// Transport metadata at the start of the payload.
    pub fn transport_header(&self) -> TransportHeader {
        TransportHeader::read_from(self.payload())
    }

    pub fn set_transport_header(&mut self, header: &TransportHeader) {
        header.write_to(self.payload_mut());
    }

    /// Return the chunk to its pool.
    pub fn release(self) {
        drop(self);
    }

    /// Hand the chunk to the other side; only the index remains usable.
    pub fn transfer(mut self) -> ChunkIndex {
        self.in_transit = true;
        self.index
    }

    pub(crate) fn max_extra_chunks(&self) -> usize {
        self.pool.max_extra_chunks
    }

    pub(crate) fn same_pool(&self, other: &ChunkHandle) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool)
    }

    pub(crate) fn pool(&self) -> ChunkPool {
        ChunkPool {
            shared: Arc::clone(&self.pool),
        }
    }
}

impl Drop for ChunkHandle {
    fn drop(&mut self) {
        // SAFETY: `drop` runs once and `buf` is not touched after this take.
        let buf = unsafe { ManuallyDrop::take(&mut self.buf) };
        if self.in_transit {
            self.pool.park(self.index, buf);
        } else {
            self.pool.put_back(self.index, buf);
        }
    }
}

impl fmt::Debug for ChunkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkHandle")
            .field("index", &self.index)
            .finish()
    }
}
