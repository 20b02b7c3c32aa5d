use std::fmt;

use serde::Serialize;

use crate::error::{malformed, RequestError};

/// HTTP method as tagged in the offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum HttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Patch = 3,
    Delete = 4,
    Head = 5,
    Options = 6,
    Trace = 7,
    /// Any method without its own tag.
    Other = 8,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 9] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
        HttpMethod::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Other => "OTHER",
        }
    }

    /// Wire tag stored in the offset table.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Classify a request-line method token. Matching is exact.
    pub fn from_token(token: &[u8]) -> Self {
        Self::ALL[..8]
            .iter()
            .copied()
            .find(|method| method.as_str().as_bytes() == token)
            .unwrap_or(HttpMethod::Other)
    }
}

impl TryFrom<u8> for HttpMethod {
    type Error = RequestError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(tag))
            .copied()
            .ok_or_else(|| malformed(format!("unknown method tag {tag}")))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_follow_wire_order() {
        for (tag, method) in HttpMethod::ALL.iter().enumerate() {
            assert_eq!(method.tag() as usize, tag);
            assert_eq!(HttpMethod::try_from(tag as u8).unwrap(), *method);
        }
        assert_eq!(HttpMethod::Get.tag(), 0);
        assert_eq!(HttpMethod::Other.tag(), 8);
    }

    #[test]
    fn unknown_tag_is_malformed() {
        assert!(matches!(
            HttpMethod::try_from(9),
            Err(RequestError::MalformedOffsetTable(_))
        ));
    }

    #[test]
    fn tokens_classify_exactly() {
        assert_eq!(HttpMethod::from_token(b"DELETE"), HttpMethod::Delete);
        assert_eq!(HttpMethod::from_token(b"get"), HttpMethod::Other);
        assert_eq!(HttpMethod::from_token(b"PROPFIND"), HttpMethod::Other);
        assert_eq!(HttpMethod::from_token(b"OTHER"), HttpMethod::Other);
    }
}
