/// Errors raised by the identity codecs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// A field does not fit the width reserved for it in the packed form.
    #[error("{field} value {value:#x} does not fit in {bits} bits")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    /// A session cookie value is not 24 hexadecimal digits.
    #[error("invalid session cookie: {0}")]
    InvalidCookie(String),
}

pub type Result<T> = std::result::Result<T, IdentityError>;
