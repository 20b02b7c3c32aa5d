//! Fixed-size shared chunks for moving one message between the gateway and
//! the host.
//!
//! Every chunk is [`CHUNK_SIZE`] bytes: an 8-byte link field followed by the
//! payload. A message that does not fit one chunk continues in up to
//! [`MAX_EXTRA_LINKED_CHUNKS`] linked chunks.
//!
//! Ownership is explicit. A [`ChunkHandle`] is the only way to touch a chunk's
//! bytes and is consumed by release or transfer. Anything that borrows the
//! handle, such as a request view, keeps the chunk alive while the borrow
//! lasts.

pub mod chain;
pub mod error;
pub mod layout;
pub mod pool;
pub mod stream;

pub use chain::ChunkChain;
pub use error::{ChunkError, Result, StreamError};
pub use layout::{
    decode_link, encode_link, TransportHeader, CHUNK_PAYLOAD_SIZE, CHUNK_SIZE, LINK_SIZE,
    LINK_TERMINATOR, MAX_EXTRA_LINKED_CHUNKS, SOCKET_DATA_OFFSET, TRANSPORT_HEADER_SIZE,
};
pub use pool::{ChunkHandle, ChunkIndex, ChunkPool, PoolConfig, PoolStats, DEFAULT_CHUNK_COUNT};
pub use stream::{collect_message, ChunkStream, DataStream};
