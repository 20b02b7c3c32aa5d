use bytes::Buf;
use gwbridge_chunk::{ChunkHandle, CHUNK_PAYLOAD_SIZE};
use gwbridge_ident::session::{self, SessionIdentity};
use gwbridge_ident::socket::{self, SocketIdentity};
use gwbridge_ident::find_session_cookie;
use tracing::{trace, warn};

use crate::error::{malformed, Result};
use crate::method::HttpMethod;
use crate::offsets::{
    OffsetTable, Span, OFFSET_TABLE_OFFSET, REQUEST_DATA_OFFSET,
    SESSION_IDENTITY_OFFSET, SOCKET_IDENTITY_OFFSET,
};

/// Read-only view of a parsed HTTP request held in a chunk.
///
/// The view borrows the chunk, so the chunk cannot be released or handed
/// back to the gateway while the view is alive. Every span in the offset
/// table is checked against the socket-data window when the view is built;
/// accessors never read outside it.
#[derive(Debug, Clone)]
pub struct RequestView<'a> {
    window: &'a [u8],
    base_offset: usize,
    table: OffsetTable,
    method: HttpMethod,
    socket: SocketIdentity,
    session: SessionIdentity,
    uri: &'a str,
    session_string: &'a str,
}

impl<'a> RequestView<'a> {
    /// Build a view over `chunk`, whose socket-data region starts at payload
    /// offset `base_offset` (normally [`gwbridge_chunk::SOCKET_DATA_OFFSET`]).
    pub fn over(chunk: &'a ChunkHandle, base_offset: usize) -> Result<Self> {
        Self::over_payload(chunk.payload(), base_offset)
            .inspect_err(|err| warn!(chunk = %chunk.index(), %err, "rejecting request chunk"))
    }

    /// Build a view over raw chunk payload bytes.
    pub fn over_payload(
        payload: &'a [u8; CHUNK_PAYLOAD_SIZE],
        base_offset: usize,
    ) -> Result<Self> {
        let window = match payload.get(base_offset..) {
            Some(window) if window.len() >= REQUEST_DATA_OFFSET => window,
            _ => {
                return Err(malformed(format!(
                    "socket data at offset {base_offset} leaves no room for the offset table"
                )))
            }
        };

        let mut words = &window[SOCKET_IDENTITY_OFFSET..SESSION_IDENTITY_OFFSET];
        let socket = socket::unpack_wide(words.get_u64_le(), words.get_u64_le())
            .map_err(|err| malformed(format!("socket identity: {err}")))?;
        let mut words = &window[SESSION_IDENTITY_OFFSET..OFFSET_TABLE_OFFSET];
        let session = session::unpack_wide(words.get_u64_le(), words.get_u64_le());

        let table = OffsetTable::read_from(&window[OFFSET_TABLE_OFFSET..])?;
        check_spans(&table, window.len())?;
        let method = HttpMethod::try_from(table.method)?;

        let uri = utf8(window, table.uri, "uri")?;
        let session_string = utf8(window, table.session_string, "session string")?;

        Ok(Self {
            window,
            base_offset,
            table,
            method,
            socket,
            session,
            uri,
            session_string,
        })
    }

    pub fn uri(&self) -> &'a str {
        self.uri
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The client's `Accept-Encoding` header allows a gzip-encoded response.
    pub fn is_gzip_accepted(&self) -> bool {
        self.table.gzip_accepted
    }

    /// Request body bytes held in this chunk; empty when there is no body.
    pub fn body(&self) -> &'a [u8] {
        self.slice(self.table.body)
    }

    pub fn body_len(&self) -> usize {
        usize::from(self.table.body.len)
    }

    /// Payload offset of the first body byte, for streaming the body.
    pub fn body_start(&self) -> usize {
        self.base_offset + self.table.body.start()
    }

    /// Session string as the gateway found it; empty when absent.
    pub fn session_id_string(&self) -> &'a str {
        self.session_string
    }

    /// Value of the first header whose name matches `name` exactly.
    ///
    /// Names are compared byte for byte: `content-type` does not match
    /// `Content-Type`, and prefixes never match.
    pub fn header(&self, name: &[u8]) -> Option<&'a [u8]> {
        let found = self
            .table
            .used_header_slots()
            .iter()
            .find(|slot| {
                usize::from(slot.name.len) == name.len() && self.slice(slot.name) == name
            })
            .map(|slot| self.slice(slot.value));
        trace!(
            name = %String::from_utf8_lossy(name),
            found = found.is_some(),
            "header lookup"
        );
        found
    }

    /// `(name, value)` pairs in header order.
    pub fn headers(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + '_ {
        self.table
            .used_header_slots()
            .iter()
            .map(|slot| (self.slice(slot.name), self.slice(slot.value)))
    }

    pub fn header_count(&self) -> usize {
        self.table.used_header_slots().len()
    }

    /// The complete raw request.
    pub fn request_raw(&self) -> &'a [u8] {
        self.slice(self.table.request)
    }

    /// Request line up to the end of the URI, e.g. `GET /index.html`.
    pub fn method_and_uri(&self) -> &'a [u8] {
        self.slice(self.table.method_and_uri())
    }

    /// The header block, one line per header.
    pub fn headers_raw(&self) -> &'a [u8] {
        self.slice(self.table.headers)
    }

    /// Value of the `Cookie` header.
    pub fn cookies(&self) -> &'a [u8] {
        self.slice(self.table.cookies)
    }

    /// Value of the `Accept` header.
    pub fn accept(&self) -> &'a [u8] {
        self.slice(self.table.accept)
    }

    /// `ScSessionId` value from the `Cookie` header, if the client sent one.
    pub fn session_cookie_value(&self) -> Option<&'a [u8]> {
        find_session_cookie(self.cookies())
    }

    pub fn socket(&self) -> SocketIdentity {
        self.socket
    }

    pub fn session(&self) -> SessionIdentity {
        self.session
    }

    /// A session is attached to the request.
    pub fn has_session(&self) -> bool {
        self.session.is_valid()
    }

    pub fn offset_table(&self) -> &OffsetTable {
        &self.table
    }

    fn slice(&self, span: Span) -> &'a [u8] {
        if span.is_empty() {
            return &[];
        }
        self.window.get(span.range()).unwrap_or_default()
    }
}

fn check_spans(table: &OffsetTable, window_len: usize) -> Result<()> {
    let request = table.request;
    if !request.is_empty() {
        if request.start() < REQUEST_DATA_OFFSET {
            return Err(malformed(format!(
                "request starts at {} inside the offset table region",
                request.start()
            )));
        }
        if request.end() > window_len {
            return Err(malformed(format!(
                "request span {}..{} exceeds the {window_len}-byte socket-data window",
                request.start(),
                request.end()
            )));
        }
    }

    // Every other element is a part of the request.
    let named = [
        ("uri", table.uri),
        ("body", table.body),
        ("headers", table.headers),
        ("cookies", table.cookies),
        ("accept", table.accept),
        ("session string", table.session_string),
    ];
    let slots = table
        .used_header_slots()
        .iter()
        .flat_map(|slot| [("header name", slot.name), ("header value", slot.value)]);

    for (field, span) in named.into_iter().chain(slots) {
        if span.is_empty() {
            continue;
        }
        if request.is_empty() || span.start() < request.start() || span.end() > request.end() {
            return Err(malformed(format!(
                "{field} span {}..{} lies outside the request {}..{}",
                span.start(),
                span.end(),
                request.start(),
                request.end()
            )));
        }
    }
    Ok(())
}

fn utf8<'a>(window: &'a [u8], span: Span, field: &str) -> Result<&'a str> {
    if span.is_empty() {
        return Ok("");
    }
    std::str::from_utf8(&window[span.range()])
        .map_err(|err| malformed(format!("{field} is not UTF-8: {err}")))
}
