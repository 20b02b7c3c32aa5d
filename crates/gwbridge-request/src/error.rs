use gwbridge_ident::IdentityError;

/// Errors raised while reading or laying out a request chunk.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The offset table or identities in the chunk are inconsistent.
    #[error("malformed offset table: {0}")]
    MalformedOffsetTable(String),

    /// The request does not fit in the socket-data window of one chunk.
    #[error("request does not fit in chunk ({needed} bytes, {available} available)")]
    DoesNotFit { needed: usize, available: usize },

    /// More headers than the offset table has slots for.
    #[error("too many headers ({count}, max {max})")]
    TooManyHeaders { count: usize, max: usize },

    /// An identity could not be packed for the chunk.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
}

pub type Result<T> = std::result::Result<T, RequestError>;

pub(crate) fn malformed(message: impl Into<String>) -> RequestError {
    RequestError::MalformedOffsetTable(message.into())
}
