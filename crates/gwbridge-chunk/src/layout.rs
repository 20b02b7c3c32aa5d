use bytes::{Buf, BufMut};

use crate::error::{ChunkError, Result};
use crate::pool::ChunkIndex;

/// Size of one shared chunk in bytes.
pub const CHUNK_SIZE: usize = 512;

/// Size of the link field at the start of every chunk.
pub const LINK_SIZE: usize = 8;

/// Bytes available after the link field.
pub const CHUNK_PAYLOAD_SIZE: usize = CHUNK_SIZE - LINK_SIZE;

/// Payload bytes reserved for transport metadata.
pub const TRANSPORT_HEADER_SIZE: usize = 32;

/// Payload offset of the socket-scoped data that follows the transport header.
pub const SOCKET_DATA_OFFSET: usize = TRANSPORT_HEADER_SIZE;

/// Maximum number of chunks linked behind the primary chunk of one message.
pub const MAX_EXTRA_LINKED_CHUNKS: usize = 32;

/// Link value marking the last chunk of a chain.
pub const LINK_TERMINATOR: u64 = u64::MAX;

/// Encode the link field value for the next chunk (or the terminator).
///
/// Chunk layout:
/// ```text
/// ┌──────────────┬──────────────────┬────────────────┬─────────────────┐
/// │ Link (8B LE) │ Transport header │ Socket data    │ Message data     │
/// │ next | ~0    │ (32B)            │ (identities,   │ (raw request or  │
/// │              │                  │  offset table) │  response bytes) │
/// └──────────────┴──────────────────┴────────────────┴─────────────────┘
/// ```
pub fn encode_link(next: Option<ChunkIndex>) -> u64 {
    match next {
        Some(index) => u64::from(index.get()),
        None => LINK_TERMINATOR,
    }
}

/// Decode a link field value.
pub fn decode_link(raw: u64) -> Result<Option<ChunkIndex>> {
    if raw == LINK_TERMINATOR {
        return Ok(None);
    }
    u32::try_from(raw)
        .map(|index| Some(ChunkIndex::new(index)))
        .map_err(|_| {
            ChunkError::MalformedChain(format!("link value {raw:#x} is not a chunk index"))
        })
}

/// Transport metadata stored at the start of a primary chunk's payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportHeader {
    /// Opaque value the producer uses to correlate request and response.
    pub user_data: u64,
    /// Message length in bytes, counted from the end of the transport header.
    pub message_len: u32,
    /// Number of chunks linked behind the primary chunk.
    pub extra_chunks: u32,
}

impl TransportHeader {
    /// Decode the header from the first [`TRANSPORT_HEADER_SIZE`] payload bytes.
    ///
    /// Wire format:
    /// ```text
    /// ┌───────────────┬──────────────┬───────────────┬────────────┐
    /// │ user_data     │ message_len  │ extra_chunks  │ reserved   │
    /// │ (8B LE)       │ (4B LE)      │ (4B LE)       │ (16B)      │
    /// └───────────────┴──────────────┴───────────────┴────────────┘
    /// ```
    pub fn read_from(payload: &[u8; CHUNK_PAYLOAD_SIZE]) -> Self {
        let mut src = &payload[..TRANSPORT_HEADER_SIZE];
        Self {
            user_data: src.get_u64_le(),
            message_len: src.get_u32_le(),
            extra_chunks: src.get_u32_le(),
        }
    }

    /// Encode the header into the first [`TRANSPORT_HEADER_SIZE`] payload bytes.
    pub fn write_to(&self, payload: &mut [u8; CHUNK_PAYLOAD_SIZE]) {
        let mut dst = &mut payload[..TRANSPORT_HEADER_SIZE];
        dst.put_u64_le(self.user_data);
        dst.put_u32_le(self.message_len);
        dst.put_u32_le(self.extra_chunks);
        let reserved = dst.len();
        dst.put_bytes(0, reserved);
    }
}
