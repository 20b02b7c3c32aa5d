//! Session identity codec.
//!
//! The external form of a session is a cookie value of 24 uppercase hex
//! digits: 8 for the session index followed by 16 for the random salt. The
//! scheduler id never leaves the process and is carried only by the binary
//! wide form:
//! ```text
//! word0: random_salt
//! word1: session_index | scheduler_id << 32
//! ```

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{IdentityError, Result};

/// Cookie name carrying the session string.
pub const SESSION_COOKIE_NAME: &str = "ScSessionId";

/// Length of the session string in characters.
pub const SESSION_STRING_LEN: usize = 24;

pub const INVALID_SESSION_INDEX: u32 = u32::MAX;
pub const INVALID_SESSION_SALT: u64 = 0;
pub const INVALID_SCHEDULER_ID: u32 = u32::MAX;

const INDEX_DIGITS: usize = 8;
const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Identity of one server-side session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub random_salt: u64,
    pub session_index: u32,
    pub scheduler_id: u32,
}

impl SessionIdentity {
    /// Placeholder for "no session attached".
    pub const INVALID: SessionIdentity = SessionIdentity {
        random_salt: INVALID_SESSION_SALT,
        session_index: INVALID_SESSION_INDEX,
        scheduler_id: INVALID_SCHEDULER_ID,
    };

    pub fn is_valid(&self) -> bool {
        self.session_index != INVALID_SESSION_INDEX && self.random_salt != INVALID_SESSION_SALT
    }

    /// Rebuild an identity from a cookie value, attributing it to `scheduler_id`.
    pub fn from_cookie(value: &[u8], scheduler_id: u32) -> Result<Self> {
        let (session_index, random_salt) = parse_cookie_string(value)?;
        Ok(Self {
            random_salt,
            session_index,
            scheduler_id,
        })
    }

    /// Byte-exact comparison against a cookie value.
    pub fn matches_cookie(&self, value: &[u8]) -> bool {
        value == self.to_cookie_bytes().as_slice()
    }

    /// Encode the session string into a fixed buffer.
    pub fn to_cookie_bytes(&self) -> [u8; SESSION_STRING_LEN] {
        let mut out = [0u8; SESSION_STRING_LEN];
        write_hex(u64::from(self.session_index), &mut out[..INDEX_DIGITS]);
        write_hex(self.random_salt, &mut out[INDEX_DIGITS..]);
        out
    }

    pub fn to_cookie_string(&self) -> String {
        to_cookie_string(self)
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.to_cookie_bytes() {
            write!(f, "{}", char::from(byte))?;
        }
        Ok(())
    }
}

/// Most significant digit first, so the buffer reads as the number.
fn write_hex(value: u64, out: &mut [u8]) {
    for (shift, digit) in out.iter_mut().rev().enumerate() {
        *digit = HEX_DIGITS[((value >> (shift * 4)) & 0xF) as usize];
    }
}

fn parse_hex(digits: &[u8]) -> Option<u64> {
    digits.iter().try_fold(0u64, |acc, &digit| {
        let nibble = char::from(digit).to_digit(16)?;
        Some((acc << 4) | u64::from(nibble))
    })
}

/// The 24-character session string.
pub fn to_cookie_string(identity: &SessionIdentity) -> String {
    identity.to_cookie_bytes().iter().map(|&b| char::from(b)).collect()
}

/// `ScSessionId=<session string>`, ready for a `Set-Cookie` header.
pub fn to_cookie_header(identity: &SessionIdentity) -> String {
    format!("{SESSION_COOKIE_NAME}={}", to_cookie_string(identity))
}

pub fn pack_wide(identity: &SessionIdentity) -> (u64, u64) {
    (
        identity.random_salt,
        u64::from(identity.session_index) | (u64::from(identity.scheduler_id) << 32),
    )
}

pub fn unpack_wide(word0: u64, word1: u64) -> SessionIdentity {
    SessionIdentity {
        random_salt: word0,
        session_index: word1 as u32,
        scheduler_id: (word1 >> 32) as u32,
    }
}

/// Parse a session string into `(session_index, random_salt)`.
///
/// Accepts exactly 24 hex digits in either case.
pub fn parse_cookie_string(value: &[u8]) -> Result<(u32, u64)> {
    if value.len() != SESSION_STRING_LEN {
        return Err(IdentityError::InvalidCookie(format!(
            "expected {SESSION_STRING_LEN} characters, got {}",
            value.len()
        )));
    }
    let (index_digits, salt_digits) = value.split_at(INDEX_DIGITS);
    match (parse_hex(index_digits), parse_hex(salt_digits)) {
        (Some(index), Some(salt)) => Ok((index as u32, salt)),
        _ => Err(IdentityError::InvalidCookie(format!(
            "non-hex characters in {:?}",
            String::from_utf8_lossy(value)
        ))),
    }
}

/// Find the `ScSessionId` value in a `Cookie` header value.
///
/// Cookies are `;`-separated `name=value` pairs; the name must match exactly.
/// The value is returned untouched.
pub fn find_session_cookie(cookie_header: &[u8]) -> Option<&[u8]> {
    session_cookie_range(cookie_header).map(|range| &cookie_header[range])
}

/// Byte range of the `ScSessionId` value within a `Cookie` header value.
pub fn session_cookie_range(cookie_header: &[u8]) -> Option<Range<usize>> {
    let mut pair_start = 0;
    let mut found = None;
    for pair in cookie_header.split(|&b| b == b';') {
        let start = pair_start;
        pair_start += pair.len() + 1;

        let Some(eq) = pair.iter().position(|&b| b == b'=') else {
            continue;
        };
        if pair[..eq].trim_ascii() != SESSION_COOKIE_NAME.as_bytes() {
            continue;
        }
        let value = &pair[eq + 1..];
        let value_start = start + eq + 1 + (value.len() - value.trim_ascii_start().len());
        found = Some(value_start..value_start + value.trim_ascii().len());
        break;
    }
    trace!(found = found.is_some(), "session cookie lookup");
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_string_shape() {
        let id = SessionIdentity {
            random_salt: 123,
            session_index: 1,
            scheduler_id: 0,
        };
        assert_eq!(id.to_cookie_string(), "00000001000000000000007B");
        assert_eq!(id.to_string(), "00000001000000000000007B");
        assert_eq!(to_cookie_header(&id), "ScSessionId=00000001000000000000007B");
    }

    #[test]
    fn cookie_string_is_uppercase_hex() {
        let id = SessionIdentity {
            random_salt: 0xFEDC_BA98_7654_3210,
            session_index: 0xABCD_EF01,
            scheduler_id: 3,
        };
        let s = id.to_cookie_string();
        assert_eq!(s.len(), SESSION_STRING_LEN);
        assert_eq!(s, "ABCDEF01FEDCBA9876543210");
        assert!(s.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));
    }

    #[test]
    fn wide_roundtrip() {
        let id = SessionIdentity {
            random_salt: 83459345345,
            session_index: 123,
            scheduler_id: 1,
        };
        let (word0, word1) = pack_wide(&id);
        assert_eq!(word0, 83459345345);
        assert_eq!(word1, 123 | (1 << 32));
        assert_eq!(unpack_wide(word0, word1), id);
    }

    #[test]
    fn parse_accepts_either_case() {
        assert_eq!(
            parse_cookie_string(b"0000000a00000000000000ff").unwrap(),
            (10, 255)
        );
        assert_eq!(
            parse_cookie_string(b"0000000A00000000000000FF").unwrap(),
            (10, 255)
        );
    }

    #[test]
    fn parse_rejects_bad_values() {
        assert!(matches!(
            parse_cookie_string(b"0001"),
            Err(IdentityError::InvalidCookie(_))
        ));
        assert!(matches!(
            parse_cookie_string(b"0000000G00000000000000FF"),
            Err(IdentityError::InvalidCookie(_))
        ));
        assert!(parse_cookie_string(b"+0000000000000000000000F").is_err());
    }

    #[test]
    fn from_cookie_keeps_scheduler() {
        let id = SessionIdentity::from_cookie(b"00000001000000000000007B", 4).unwrap();
        assert_eq!(id.session_index, 1);
        assert_eq!(id.random_salt, 123);
        assert_eq!(id.scheduler_id, 4);
        assert!(id.matches_cookie(b"00000001000000000000007B"));
        assert!(!id.matches_cookie(b"00000001000000000000007b"));
    }

    #[test]
    fn find_cookie_by_exact_name() {
        let header = b"theme=dark; ScSessionId=00000001000000000000007B; lang=en";
        assert_eq!(
            find_session_cookie(header),
            Some(&b"00000001000000000000007B"[..])
        );
        assert_eq!(find_session_cookie(b"XScSessionId=abc"), None);
        assert_eq!(find_session_cookie(b"scsessionid=abc"), None);
        assert_eq!(find_session_cookie(b"ScSessionId"), None);
        assert_eq!(find_session_cookie(b""), None);
    }

    #[test]
    fn cookie_range_points_into_header() {
        let header = b"a=1;  ScSessionId = 00000001000000000000007B ;b=2";
        let range = session_cookie_range(header).unwrap();
        assert_eq!(range, 20..44);
        assert_eq!(&header[range], b"00000001000000000000007B");
        assert_eq!(session_cookie_range(b"ScSessionId="), Some(12..12));
        assert_eq!(session_cookie_range(b"other=1"), None);
    }

    #[test]
    fn invalid_sentinel() {
        assert!(!SessionIdentity::INVALID.is_valid());
        let id = SessionIdentity {
            random_salt: 1,
            session_index: 0,
            scheduler_id: 0,
        };
        assert!(id.is_valid());
    }
}
