use bytes::BufMut;
use gwbridge_chunk::ChunkHandle;
use gwbridge_ident::session::{self, SessionIdentity};
use gwbridge_ident::socket::{self, SocketIdentity};
use gwbridge_ident::session_cookie_range;
use tracing::debug;

use crate::error::{RequestError, Result};
use crate::method::HttpMethod;
use crate::offsets::{
    OffsetTable, Span, MAX_HTTP_HEADERS, OFFSET_TABLE_OFFSET, REQUEST_DATA_OFFSET,
    SESSION_IDENTITY_OFFSET, SOCKET_IDENTITY_OFFSET,
};

const COOKIE_HEADER: &[u8] = b"Cookie";
const ACCEPT_HEADER: &[u8] = b"Accept";
const ACCEPT_ENCODING_HEADER: &[u8] = b"Accept-Encoding";

/// Lays a request into a chunk the way the gateway does: identities, offset
/// table, then the raw request bytes.
///
/// The request is serialized as HTTP/1.1 text from the parts given, so every
/// span is known without parsing.
#[derive(Debug, Clone)]
pub struct RequestWriter<'r> {
    method: &'r str,
    uri: &'r str,
    headers: Vec<(&'r str, &'r str)>,
    body: &'r [u8],
    socket: SocketIdentity,
    session: SessionIdentity,
    gzip_accepted: Option<bool>,
}

impl<'r> RequestWriter<'r> {
    pub fn new(method: &'r str, uri: &'r str) -> Self {
        Self {
            method,
            uri,
            headers: Vec::new(),
            body: &[],
            socket: SocketIdentity {
                index: 0,
                unique_id: 0,
                scheduler_id: 0,
                gateway_worker_id: 0,
            },
            session: SessionIdentity::INVALID,
            gzip_accepted: None,
        }
    }

    pub fn header(mut self, name: &'r str, value: &'r str) -> Self {
        self.headers.push((name, value));
        self
    }

    pub fn body(mut self, body: &'r [u8]) -> Self {
        self.body = body;
        self
    }

    pub fn socket(mut self, socket: SocketIdentity) -> Self {
        self.socket = socket;
        self
    }

    pub fn session(mut self, session: SessionIdentity) -> Self {
        self.session = session;
        self
    }

    /// Override the gzip flag. By default it is set when the `Accept-Encoding`
    /// header mentions `gz`.
    pub fn gzip_accepted(mut self, accepted: bool) -> Self {
        self.gzip_accepted = Some(accepted);
        self
    }

    /// Serialize the request and compute its offset table.
    ///
    /// Spans are relative to the socket-data region, with the raw request at
    /// [`REQUEST_DATA_OFFSET`].
    pub fn encode(&self) -> Result<(Vec<u8>, OffsetTable)> {
        if self.headers.len() > MAX_HTTP_HEADERS {
            return Err(RequestError::TooManyHeaders {
                count: self.headers.len(),
                max: MAX_HTTP_HEADERS,
            });
        }

        let mut raw = Vec::new();
        let mut table = OffsetTable {
            method: HttpMethod::from_token(self.method.as_bytes()).tag(),
            ..OffsetTable::default()
        };

        raw.put_slice(self.method.as_bytes());
        raw.put_u8(b' ');
        table.uri = span_at(raw.len(), self.uri.len());
        raw.put_slice(self.uri.as_bytes());
        raw.put_slice(b" HTTP/1.1\r\n");

        let headers_start = raw.len();
        for (slot, (name, value)) in table.header_slots.iter_mut().zip(&self.headers) {
            slot.name = span_at(raw.len(), name.len());
            raw.put_slice(name.as_bytes());
            raw.put_slice(b": ");
            slot.value = span_at(raw.len(), value.len());
            raw.put_slice(value.as_bytes());
            raw.put_slice(b"\r\n");
        }
        table.num_headers = self.headers.len() as u8;
        table.headers = span_at(headers_start, raw.len() - headers_start);
        raw.put_slice(b"\r\n");

        table.body = span_at(raw.len(), self.body.len());
        raw.put_slice(self.body);

        let needed = REQUEST_DATA_OFFSET + raw.len();
        if needed > usize::from(u16::MAX) {
            return Err(RequestError::DoesNotFit {
                needed,
                available: usize::from(u16::MAX),
            });
        }
        table.request = span_at(0, raw.len());

        table.cookies = value_of(&table, &raw, COOKIE_HEADER);
        table.accept = value_of(&table, &raw, ACCEPT_HEADER);
        table.session_string = session_span(&raw, table.cookies);
        table.gzip_accepted = self.gzip_accepted.unwrap_or_else(|| {
            let encodings = value_of(&table, &raw, ACCEPT_ENCODING_HEADER);
            raw[encodings.range()].windows(2).any(|pair| pair == b"gz")
        });

        shift(&mut table, REQUEST_DATA_OFFSET as u16);
        Ok((raw, table))
    }

    /// Write the request into the socket-data region of a chunk payload.
    pub fn write_to_payload(
        &self,
        payload: &mut [u8],
        base_offset: usize,
    ) -> Result<OffsetTable> {
        let (raw, table) = self.encode()?;
        let needed = REQUEST_DATA_OFFSET + raw.len();
        let available = payload.len().saturating_sub(base_offset);
        if needed > available {
            return Err(RequestError::DoesNotFit { needed, available });
        }
        let window = &mut payload[base_offset..base_offset + needed];

        let (socket_word0, socket_word1) = socket::pack_wide(&self.socket)?;
        let mut dst = &mut window[SOCKET_IDENTITY_OFFSET..SESSION_IDENTITY_OFFSET];
        dst.put_u64_le(socket_word0);
        dst.put_u64_le(socket_word1);

        let (session_word0, session_word1) = session::pack_wide(&self.session);
        let mut dst = &mut window[SESSION_IDENTITY_OFFSET..OFFSET_TABLE_OFFSET];
        dst.put_u64_le(session_word0);
        dst.put_u64_le(session_word1);

        table.write_to(&mut window[OFFSET_TABLE_OFFSET..])?;
        window[REQUEST_DATA_OFFSET..].copy_from_slice(&raw);
        Ok(table)
    }

    /// Write the request into `chunk` with its socket data at `base_offset`.
    pub fn write_into(&self, chunk: &mut ChunkHandle, base_offset: usize) -> Result<OffsetTable> {
        let table = self.write_to_payload(chunk.payload_mut(), base_offset)?;
        debug!(
            chunk = %chunk.index(),
            method = self.method,
            uri = self.uri,
            bytes = table.request.len,
            "request written"
        );
        Ok(table)
    }
}

/// Only meaningful once the request is known to fit in a u16 range.
fn span_at(offset: usize, len: usize) -> Span {
    if len == 0 {
        return Span::EMPTY;
    }
    Span::new(offset as u16, len as u16)
}

fn value_of(table: &OffsetTable, raw: &[u8], name: &[u8]) -> Span {
    table
        .used_header_slots()
        .iter()
        .find(|slot| &raw[slot.name.range()] == name)
        .map_or(Span::EMPTY, |slot| slot.value)
}

fn session_span(raw: &[u8], cookies: Span) -> Span {
    session_cookie_range(&raw[cookies.range()]).map_or(Span::EMPTY, |range| {
        span_at(cookies.start() + range.start, range.len())
    })
}

fn shift(table: &mut OffsetTable, by: u16) {
    let spans = [
        &mut table.request,
        &mut table.uri,
        &mut table.body,
        &mut table.headers,
        &mut table.cookies,
        &mut table.accept,
        &mut table.session_string,
    ];
    for span in spans {
        if !span.is_empty() {
            span.offset += by;
        }
    }
    for slot in &mut table.header_slots {
        for span in [&mut slot.name, &mut slot.value] {
            if !span.is_empty() {
                span.offset += by;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_point_at_parts() {
        let (raw, table) = RequestWriter::new("POST", "/echo")
            .header("Content-Type", "text/plain")
            .header("Accept", "text/html")
            .header("Accept-Encoding", "gzip, deflate")
            .body(b"hello")
            .encode()
            .unwrap();

        let at = |span: Span| {
            &raw[span.start() - REQUEST_DATA_OFFSET..span.end() - REQUEST_DATA_OFFSET]
        };
        assert_eq!(at(table.uri), b"/echo");
        assert_eq!(at(table.body), b"hello");
        assert_eq!(at(table.accept), b"text/html");
        assert_eq!(at(table.method_and_uri()), b"POST /echo");
        assert_eq!(table.request.start(), REQUEST_DATA_OFFSET);
        assert_eq!(table.method, HttpMethod::Post.tag());
        assert!(table.gzip_accepted);
        assert!(table.cookies.is_empty());
        assert!(raw.starts_with(b"POST /echo HTTP/1.1\r\nContent-Type: text/plain\r\n"));
    }

    #[test]
    fn gzip_follows_accept_encoding_only() {
        let (_, table) = RequestWriter::new("GET", "/")
            .header("Accept", "application/x-gzip")
            .encode()
            .unwrap();
        assert!(!table.gzip_accepted);

        let (_, table) = RequestWriter::new("GET", "/")
            .header("Accept-Encoding", "deflate, br")
            .encode()
            .unwrap();
        assert!(!table.gzip_accepted);

        let (_, table) = RequestWriter::new("GET", "/")
            .header("Accept-Encoding", "gzip")
            .gzip_accepted(false)
            .encode()
            .unwrap();
        assert!(!table.gzip_accepted);
    }

    #[test]
    fn session_string_is_located_in_cookie() {
        let (raw, table) = RequestWriter::new("GET", "/")
            .header("Cookie", "a=1; ScSessionId=00000001000000000000007B")
            .encode()
            .unwrap();
        let start = table.session_string.start() - REQUEST_DATA_OFFSET;
        assert_eq!(&raw[start..start + 24], b"00000001000000000000007B");
    }

    #[test]
    fn header_limit() {
        let writer = (0..=MAX_HTTP_HEADERS).fold(RequestWriter::new("GET", "/"), |w, _| {
            w.header("X-Repeat", "1")
        });
        assert!(matches!(
            writer.encode(),
            Err(RequestError::TooManyHeaders { count: 17, max: 16 })
        ));
    }

    #[test]
    fn oversized_request_does_not_fit() {
        let body = vec![b'x'; 400];
        let mut payload = [0u8; 504];
        let err = RequestWriter::new("PUT", "/blob")
            .body(&body)
            .write_to_payload(&mut payload, 32)
            .unwrap_err();
        assert!(matches!(err, RequestError::DoesNotFit { .. }));
    }
}
