//! Zero-copy access to the HTTP request the gateway placed in a chunk.
//!
//! The gateway's tokenizer records where each request element lives in an
//! [`OffsetTable`] stored next to the socket and session identities. A
//! [`RequestView`] validates that table once and then hands out borrowed
//! slices of the chunk. [`RequestWriter`] produces the same layout and is used
//! to build request chunks outside the gateway.

pub mod error;
pub mod method;
pub mod offsets;
pub mod view;
pub mod writer;

pub use error::{RequestError, Result};
pub use method::HttpMethod;
pub use offsets::{
    HeaderSpan, OffsetTable, Span, MAX_HTTP_HEADERS, OFFSET_TABLE_OFFSET, OFFSET_TABLE_SIZE,
    REQUEST_DATA_OFFSET, SESSION_IDENTITY_OFFSET, SOCKET_IDENTITY_OFFSET,
};
pub use view::RequestView;
pub use writer::RequestWriter;
