use std::ops::Range;

use bytes::{Buf, BufMut};

use crate::error::{malformed, Result};

/// Number of header slots in the offset table.
pub const MAX_HTTP_HEADERS: usize = 16;

/// Socket identity (wide form) within the socket-data region.
pub const SOCKET_IDENTITY_OFFSET: usize = 0;

/// Session identity (wide form) within the socket-data region.
pub const SESSION_IDENTITY_OFFSET: usize = 16;

/// Request offset table within the socket-data region.
pub const OFFSET_TABLE_OFFSET: usize = 32;

/// Encoded size of [`OffsetTable`].
pub const OFFSET_TABLE_SIZE: usize = 160;

/// Start of the raw request bytes within the socket-data region.
pub const REQUEST_DATA_OFFSET: usize = OFFSET_TABLE_OFFSET + OFFSET_TABLE_SIZE;

const HEADER_SLOTS_OFFSET: usize = 28;
const TRAILER_OFFSET: usize = HEADER_SLOTS_OFFSET + MAX_HTTP_HEADERS * 8;

/// A byte range relative to the start of the socket-data region.
///
/// A zero length means the element is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub offset: u16,
    pub len: u16,
}

impl Span {
    pub const EMPTY: Span = Span { offset: 0, len: 0 };

    pub fn new(offset: u16, len: u16) -> Self {
        Self { offset, len }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn start(&self) -> usize {
        usize::from(self.offset)
    }

    pub fn end(&self) -> usize {
        self.start() + usize::from(self.len)
    }

    pub fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    fn get(src: &mut &[u8]) -> Self {
        Self {
            offset: src.get_u16_le(),
            len: src.get_u16_le(),
        }
    }

    fn put(&self, dst: &mut &mut [u8]) {
        dst.put_u16_le(self.offset);
        dst.put_u16_le(self.len);
    }
}

/// Name and value of one header line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderSpan {
    pub name: Span,
    pub value: Span,
}

/// Positions of the parsed request elements, filled in by the gateway's
/// tokenizer.
///
/// Wire format (little-endian, 160 bytes):
/// ```text
///   0  request span          (u16 offset, u16 len)
///   4  uri span
///   8  body span
///  12  header block span
///  16  cookie span
///  20  accept span
///  24  session string span
///  28  16 x header slot      (name span, value span)
/// 156  num_headers u8 | method u8 | gzip u8 | reserved u8
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    pub request: Span,
    pub uri: Span,
    pub body: Span,
    pub headers: Span,
    pub cookies: Span,
    pub accept: Span,
    pub session_string: Span,
    pub header_slots: [HeaderSpan; MAX_HTTP_HEADERS],
    pub num_headers: u8,
    /// Raw method tag; see [`crate::HttpMethod`].
    pub method: u8,
    pub gzip_accepted: bool,
}

impl OffsetTable {
    /// Decode the table from the first [`OFFSET_TABLE_SIZE`] bytes of `src`.
    pub fn read_from(src: &[u8]) -> Result<Self> {
        if src.len() < OFFSET_TABLE_SIZE {
            return Err(malformed(format!(
                "offset table needs {OFFSET_TABLE_SIZE} bytes, {} available",
                src.len()
            )));
        }
        let mut src = &src[..OFFSET_TABLE_SIZE];

        let request = Span::get(&mut src);
        let uri = Span::get(&mut src);
        let body = Span::get(&mut src);
        let headers = Span::get(&mut src);
        let cookies = Span::get(&mut src);
        let accept = Span::get(&mut src);
        let session_string = Span::get(&mut src);

        let mut header_slots = [HeaderSpan::default(); MAX_HTTP_HEADERS];
        for slot in &mut header_slots {
            slot.name = Span::get(&mut src);
            slot.value = Span::get(&mut src);
        }

        let num_headers = src.get_u8();
        if usize::from(num_headers) > MAX_HTTP_HEADERS {
            return Err(malformed(format!(
                "{num_headers} headers exceed the {MAX_HTTP_HEADERS} table slots"
            )));
        }
        let method = src.get_u8();
        let gzip_accepted = src.get_u8() != 0;

        Ok(Self {
            request,
            uri,
            body,
            headers,
            cookies,
            accept,
            session_string,
            header_slots,
            num_headers,
            method,
            gzip_accepted,
        })
    }

    /// Encode the table into the first [`OFFSET_TABLE_SIZE`] bytes of `dst`.
    pub fn write_to(&self, dst: &mut [u8]) -> Result<()> {
        if dst.len() < OFFSET_TABLE_SIZE {
            return Err(malformed(format!(
                "offset table needs {OFFSET_TABLE_SIZE} bytes, {} available",
                dst.len()
            )));
        }
        let mut dst = &mut dst[..OFFSET_TABLE_SIZE];

        for span in [
            &self.request,
            &self.uri,
            &self.body,
            &self.headers,
            &self.cookies,
            &self.accept,
            &self.session_string,
        ] {
            span.put(&mut dst);
        }
        for slot in &self.header_slots {
            slot.name.put(&mut dst);
            slot.value.put(&mut dst);
        }
        debug_assert_eq!(dst.len(), OFFSET_TABLE_SIZE - TRAILER_OFFSET);

        dst.put_u8(self.num_headers);
        dst.put_u8(self.method);
        dst.put_u8(u8::from(self.gzip_accepted));
        dst.put_u8(0);
        Ok(())
    }

    /// Slots in use, in header order.
    pub fn used_header_slots(&self) -> &[HeaderSpan] {
        let count = usize::from(self.num_headers).min(MAX_HTTP_HEADERS);
        &self.header_slots[..count]
    }

    /// Method token plus URI: from the request start to the end of the URI.
    pub fn method_and_uri(&self) -> Span {
        let (request, uri) = (self.request, self.uri);
        if request.is_empty() || uri.is_empty() || uri.start() < request.start() {
            return Span::EMPTY;
        }
        Span::new(request.offset, (uri.end() - request.start()) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OffsetTable {
        let mut table = OffsetTable {
            request: Span::new(192, 80),
            uri: Span::new(196, 6),
            body: Span::new(260, 12),
            headers: Span::new(217, 40),
            num_headers: 2,
            method: 1,
            gzip_accepted: true,
            ..OffsetTable::default()
        };
        table.header_slots[0] = HeaderSpan {
            name: Span::new(217, 4),
            value: Span::new(223, 9),
        };
        table.header_slots[1] = HeaderSpan {
            name: Span::new(234, 12),
            value: Span::new(248, 10),
        };
        table
    }

    #[test]
    fn region_constants() {
        assert_eq!(REQUEST_DATA_OFFSET, 192);
        assert_eq!(TRAILER_OFFSET, 156);
    }

    #[test]
    fn table_layout() {
        let table = sample();
        let mut buf = [0xEE; OFFSET_TABLE_SIZE];
        table.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..4], &[192, 0, 80, 0]);
        assert_eq!(&buf[4..8], &[196, 0, 6, 0]);
        assert_eq!(&buf[28..32], &[217, 0, 4, 0]);
        assert_eq!(&buf[TRAILER_OFFSET..], &[2, 1, 1, 0]);
        assert_eq!(OffsetTable::read_from(&buf).unwrap(), table);
    }

    #[test]
    fn too_many_headers_is_malformed() {
        let mut buf = [0u8; OFFSET_TABLE_SIZE];
        sample().write_to(&mut buf).unwrap();
        buf[TRAILER_OFFSET] = 17;
        assert!(OffsetTable::read_from(&buf).is_err());
    }

    #[test]
    fn short_buffers_are_rejected() {
        let mut buf = [0u8; OFFSET_TABLE_SIZE - 1];
        assert!(OffsetTable::read_from(&buf).is_err());
        assert!(sample().write_to(&mut buf).is_err());
    }

    #[test]
    fn method_and_uri_is_derived() {
        let table = sample();
        assert_eq!(table.method_and_uri(), Span::new(192, 10));
        assert_eq!(table.used_header_slots().len(), 2);
    }

    #[test]
    fn method_and_uri_needs_a_request() {
        let table = OffsetTable {
            request: Span::EMPTY,
            ..sample()
        };
        assert_eq!(table.method_and_uri(), Span::EMPTY);
    }
}
