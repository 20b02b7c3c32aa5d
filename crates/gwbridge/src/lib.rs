//! Shared-memory bridge between an HTTP gateway and the host process that
//! serves its requests.
//!
//! The gateway parses requests into fixed-size chunks and hands them to the
//! host by index; the host reads them through a zero-copy view and writes the
//! response back into chunks of its own.
//!
//! # Crate Structure
//!
//! - [`chunk`]: Chunk pool, linked chains, ownership transfer and data streams
//! - [`ident`]: Socket and session identity codecs
//! - [`request`]: Offset table and zero-copy request view

/// Re-export chunk transport types.
pub mod chunk {
    pub use gwbridge_chunk::*;
}

/// Re-export identity codecs.
pub mod ident {
    pub use gwbridge_ident::*;
}

/// Re-export request view types.
pub mod request {
    pub use gwbridge_request::*;
}
