use std::fmt;
use std::io;

use gwbridge_chunk::ChunkError;
use gwbridge_ident::IdentityError;
use gwbridge_request::RequestError;

// Exit codes follow the sysexits-style scheme shared by the 3leaps CLIs.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn chunk_error(context: &str, err: ChunkError) -> CliError {
    match err {
        ChunkError::PoolExhausted { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        ChunkError::MalformedChain(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn identity_error(context: &str, err: IdentityError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn request_error(context: &str, err: RequestError) -> CliError {
    match err {
        RequestError::TooManyHeaders { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        RequestError::Identity(err) => identity_error(context, err),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_maps_to_data_invalid() {
        let err = request_error(
            "inspect",
            RequestError::MalformedOffsetTable("17 headers".into()),
        );
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(err.to_string(), "inspect: malformed offset table: 17 headers");
    }

    #[test]
    fn exhaustion_is_a_plain_failure() {
        let err = chunk_error("acquire", ChunkError::PoolExhausted { capacity: 0 });
        assert_eq!(err.code, FAILURE);
    }
}
