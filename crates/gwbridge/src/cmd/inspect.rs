use std::fs;

use gwbridge_chunk::{decode_link, ChunkPool, PoolConfig, CHUNK_SIZE, LINK_SIZE};
use gwbridge_ident::SocketIdentity;
use gwbridge_request::{HttpMethod, RequestView};
use serde::Serialize;
use tracing::debug;

use crate::cmd::InspectArgs;
use crate::exit::{
    chunk_error, io_error, request_error, CliError, CliResult, DATA_INVALID, SUCCESS,
};
use crate::output::{bytes_preview, hex_word, print_report, OutputFormat, Report};

#[derive(Serialize)]
struct Transport {
    user_data: String,
    message_len: u32,
    extra_chunks: u32,
}

#[derive(Serialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Serialize)]
struct InspectReport {
    /// Next chunk index, or none for the last chunk.
    link: Option<u32>,
    transport: Transport,
    socket: SocketIdentity,
    session: Option<String>,
    method: HttpMethod,
    uri: String,
    gzip_accepted: bool,
    headers: Vec<Header>,
    session_cookie: Option<String>,
    body_len: usize,
    body: String,
}

impl Report for InspectReport {
    fn fields(&self) -> Vec<(String, String)> {
        let link = self
            .link
            .map_or_else(|| "end".to_string(), |index| format!("#{index}"));
        let mut fields = vec![
            ("link".to_string(), link),
            ("user_data".into(), self.transport.user_data.clone()),
            ("message_len".into(), self.transport.message_len.to_string()),
            ("extra_chunks".into(), self.transport.extra_chunks.to_string()),
            ("socket".into(), self.socket.to_string()),
            (
                "session".into(),
                self.session.clone().unwrap_or_else(|| "none".into()),
            ),
            ("method".into(), self.method.to_string()),
            ("uri".into(), self.uri.clone()),
            ("gzip_accepted".into(), self.gzip_accepted.to_string()),
        ];
        for (position, header) in self.headers.iter().enumerate() {
            fields.push((
                format!("header[{position}]"),
                format!("{}: {}", header.name, header.value),
            ));
        }
        if let Some(cookie) = &self.session_cookie {
            fields.push(("session_cookie".into(), cookie.clone()));
        }
        fields.push(("body_len".into(), self.body_len.to_string()));
        fields.push(("body".into(), self.body.clone()));
        fields
    }
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let dump = fs::read(&args.path).map_err(|err| io_error("read chunk dump", err))?;
    if dump.len() != CHUNK_SIZE {
        return Err(CliError::new(
            DATA_INVALID,
            format!("chunk dump must be {CHUNK_SIZE} bytes, got {}", dump.len()),
        ));
    }
    let (link_bytes, payload) = dump.split_at(LINK_SIZE);
    let mut raw_link = [0u8; LINK_SIZE];
    raw_link.copy_from_slice(link_bytes);
    let link = decode_link(u64::from_le_bytes(raw_link))
        .map_err(|err| chunk_error("link field", err))?;

    let pool = ChunkPool::new(PoolConfig {
        chunk_count: args.pool_size,
        ..PoolConfig::default()
    });
    let mut chunk = pool.acquire().map_err(|err| chunk_error("acquire", err))?;
    chunk.payload_mut().copy_from_slice(payload);
    debug!(chunk = %chunk.index(), path = %args.path.display(), "chunk dump loaded");

    let view = RequestView::over(&chunk, args.base_offset)
        .map_err(|err| request_error("inspect", err))?;
    let header = chunk.transport_header();
    let report = InspectReport {
        link: link.map(|index| index.get()),
        transport: Transport {
            user_data: hex_word(header.user_data),
            message_len: header.message_len,
            extra_chunks: header.extra_chunks,
        },
        socket: view.socket(),
        session: view
            .has_session()
            .then(|| view.session().to_cookie_string()),
        method: view.method(),
        uri: view.uri().to_string(),
        gzip_accepted: view.is_gzip_accepted(),
        headers: view
            .headers()
            .map(|(name, value)| Header {
                name: bytes_preview(name),
                value: bytes_preview(value),
            })
            .collect(),
        session_cookie: view.session_cookie_value().map(bytes_preview),
        body_len: view.body_len(),
        body: bytes_preview(view.body()),
    };
    chunk.release();

    print_report(&report, format);
    Ok(SUCCESS)
}
