//! Reading request bodies and writing responses across linked chunks.
//!
//! A message starts somewhere inside the primary chunk's payload and
//! continues through the full payload of every linked chunk, in link order.

use std::io;

use tracing::{debug, trace};

use crate::chain::ChunkChain;
use crate::error::{ChunkError, StreamError};
use crate::layout::{TransportHeader, CHUNK_PAYLOAD_SIZE, TRANSPORT_HEADER_SIZE};
use crate::pool::ChunkPool;

/// The boundary a request body is read from and a response is written to.
///
/// Both operations may span several linked chunks without the caller
/// noticing.
pub trait DataStream {
    /// Copy the next body bytes into `into`. Returns 0 once the body is
    /// exhausted.
    fn read_body(&mut self, into: &mut [u8]) -> Result<usize, StreamError>;

    /// Append `bytes` to the response.
    fn write_response(&mut self, bytes: &[u8]) -> Result<(), StreamError>;
}

/// Map a message position to (chunk position, payload offset).
fn locate(start: usize, pos: usize) -> (usize, usize) {
    let first = CHUNK_PAYLOAD_SIZE - start;
    if pos < first {
        (0, start + pos)
    } else {
        let rest = pos - first;
        (1 + rest / CHUNK_PAYLOAD_SIZE, rest % CHUNK_PAYLOAD_SIZE)
    }
}

/// Message bytes a chain can hold from `start` in its primary payload.
fn available(chain: &ChunkChain, start: usize) -> usize {
    chain.payload_capacity().saturating_sub(start)
}

/// Copy message bytes `pos..pos + out.len()` into `out`.
fn copy_out(chain: &ChunkChain, start: usize, mut pos: usize, out: &mut [u8]) -> usize {
    let mut copied = 0;
    while copied < out.len() {
        let (position, offset) = locate(start, pos);
        let Some(chunk) = chain.get(position) else {
            break;
        };
        let src = &chunk.payload()[offset..];
        let n = src.len().min(out.len() - copied);
        out[copied..copied + n].copy_from_slice(&src[..n]);
        copied += n;
        pos += n;
    }
    copied
}

/// Read the complete message described by the primary chunk's transport
/// header.
pub fn collect_message(chain: &ChunkChain) -> Result<Vec<u8>, StreamError> {
    let header = chain.primary().transport_header();
    let declared = header.message_len as usize;
    let available = available(chain, TRANSPORT_HEADER_SIZE);
    if declared > available {
        return Err(StreamError::BodyTruncated {
            declared,
            available,
        });
    }

    let mut message = vec![0; declared];
    copy_out(chain, TRANSPORT_HEADER_SIZE, 0, &mut message);
    Ok(message)
}

/// [`DataStream`] over a delivered request chain and a response chain built
/// on demand.
///
/// The request chain is only borrowed, so a request view over its primary
/// chunk can be held at the same time.
pub struct ChunkStream<'c> {
    request: &'c ChunkChain,
    body_start: usize,
    body_len: usize,
    body_pos: usize,
    pool: ChunkPool,
    user_data: u64,
    response: Option<ChunkChain>,
    response_len: usize,
}

impl<'c> ChunkStream<'c> {
    /// Stream a body of `body_len` bytes starting at `body_start` in the
    /// primary chunk's payload.
    pub fn new(
        request: &'c ChunkChain,
        body_start: usize,
        body_len: usize,
    ) -> Result<Self, StreamError> {
        let available = if body_start > CHUNK_PAYLOAD_SIZE {
            0
        } else {
            available(request, body_start)
        };
        if body_len > available {
            return Err(StreamError::BodyTruncated {
                declared: body_len,
                available,
            });
        }

        Ok(Self {
            request,
            body_start,
            body_len,
            body_pos: 0,
            pool: request.pool(),
            user_data: request.primary().transport_header().user_data,
            response: None,
            response_len: 0,
        })
    }

    /// Body bytes not read yet.
    pub fn body_remaining(&self) -> usize {
        self.body_len - self.body_pos
    }

    /// Response bytes written so far.
    pub fn response_len(&self) -> usize {
        self.response_len
    }

    /// Largest response a chain from this pool can carry.
    pub fn max_response_len(&self) -> usize {
        (1 + self.pool.max_extra_chunks()) * CHUNK_PAYLOAD_SIZE - TRANSPORT_HEADER_SIZE
    }

    /// Stamp the transport header and hand back the response chain.
    ///
    /// The header carries the request's `user_data` so the gateway can match
    /// the response to its connection.
    pub fn finish(self) -> Result<ChunkChain, StreamError> {
        let mut chain = match self.response {
            Some(chain) => chain,
            None => ChunkChain::new(self.pool.acquire()?),
        };
        let header = TransportHeader {
            user_data: self.user_data,
            message_len: self.response_len as u32,
            extra_chunks: chain.extra_count() as u32,
        };
        chain.primary_mut().set_transport_header(&header);
        debug!(
            len = self.response_len,
            chunks = chain.len(),
            "response chain finished"
        );
        Ok(chain)
    }

    fn fill(&mut self, chain: &mut ChunkChain, bytes: &[u8]) -> Result<(), ChunkError> {
        let mut written = 0;
        while written < bytes.len() {
            let (position, offset) = locate(TRANSPORT_HEADER_SIZE, self.response_len);
            while chain.len() <= position {
                chain.link(self.pool.acquire()?)?;
            }
            let Some(chunk) = chain.get_mut(position) else {
                break;
            };
            let dst = &mut chunk.payload_mut()[offset..];
            let n = dst.len().min(bytes.len() - written);
            dst[..n].copy_from_slice(&bytes[written..written + n]);
            written += n;
            self.response_len += n;
        }
        Ok(())
    }
}

impl DataStream for ChunkStream<'_> {
    fn read_body(&mut self, into: &mut [u8]) -> Result<usize, StreamError> {
        let want = into.len().min(self.body_remaining());
        let n = copy_out(
            self.request,
            self.body_start,
            self.body_pos,
            &mut into[..want],
        );
        self.body_pos += n;
        trace!(read = n, remaining = self.body_remaining(), "body read");
        Ok(n)
    }

    fn write_response(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        let size = self.response_len + bytes.len();
        let max = self.max_response_len();
        if size > max {
            return Err(StreamError::ResponseTooLarge { size, max });
        }

        let mut chain = match self.response.take() {
            Some(chain) => chain,
            None => ChunkChain::new(self.pool.acquire()?),
        };
        let result = self.fill(&mut chain, bytes);
        self.response = Some(chain);
        result.map_err(StreamError::from)
    }
}

impl io::Read for ChunkStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_body(buf).map_err(io::Error::other)
    }
}

impl io::Write for ChunkStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_response(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
