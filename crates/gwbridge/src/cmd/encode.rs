use std::fs;

use gwbridge_chunk::{encode_link, ChunkPool, TransportHeader, CHUNK_SIZE, TRANSPORT_HEADER_SIZE};
use gwbridge_ident::socket::unpack_compact;
use gwbridge_ident::session::to_cookie_header;
use gwbridge_ident::SessionIdentity;
use gwbridge_request::{RequestWriter, REQUEST_DATA_OFFSET};
use serde::Serialize;
use tracing::info;

use crate::cmd::EncodeArgs;
use crate::exit::{
    chunk_error, identity_error, io_error, request_error, CliError, CliResult, SUCCESS, USAGE,
};
use crate::output::{print_report, OutputFormat, Report};

#[derive(Serialize)]
struct EncodeReport {
    path: String,
    chunk_bytes: usize,
    request_bytes: usize,
    headers: usize,
    message_len: u32,
}

impl Report for EncodeReport {
    fn fields(&self) -> Vec<(String, String)> {
        vec![
            ("path".into(), self.path.clone()),
            ("chunk_bytes".into(), self.chunk_bytes.to_string()),
            ("request_bytes".into(), self.request_bytes.to_string()),
            ("headers".into(), self.headers.to_string()),
            ("message_len".into(), self.message_len.to_string()),
        ]
    }
}

fn split_header(line: &str) -> CliResult<(&str, &str)> {
    line.split_once(':')
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| CliError::new(USAGE, format!("header must be \"Name: value\": {line:?}")))
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.base_offset < TRANSPORT_HEADER_SIZE {
        return Err(CliError::new(
            USAGE,
            format!("--base-offset must be at least {TRANSPORT_HEADER_SIZE}"),
        ));
    }
    let headers = args
        .headers
        .iter()
        .map(|line| split_header(line))
        .collect::<CliResult<Vec<_>>>()?;

    let session = args
        .session
        .as_deref()
        .map(|cookie| SessionIdentity::from_cookie(cookie.as_bytes(), 0))
        .transpose()
        .map_err(|err| identity_error("session", err))?;
    let cookie_line = session.map(|session| to_cookie_header(&session));

    let mut writer = RequestWriter::new(&args.method, &args.uri)
        .socket(unpack_compact(args.socket))
        .body(args.body.as_deref().unwrap_or_default().as_bytes());
    for (name, value) in headers {
        writer = writer.header(name, value);
    }
    if let (Some(session), Some(line)) = (session, cookie_line.as_deref()) {
        writer = writer.session(session).header("Cookie", line);
    }

    let pool = ChunkPool::with_capacity(1);
    let mut chunk = pool.acquire().map_err(|err| chunk_error("acquire", err))?;
    let table = writer
        .write_into(&mut chunk, args.base_offset)
        .map_err(|err| request_error("encode", err))?;

    // Everything after the transport header belongs to the message.
    let message_end = args.base_offset + REQUEST_DATA_OFFSET + usize::from(table.request.len);
    let message_len = (message_end - TRANSPORT_HEADER_SIZE) as u32;
    chunk.set_transport_header(&TransportHeader {
        user_data: 0,
        message_len,
        extra_chunks: 0,
    });

    let mut dump = Vec::with_capacity(CHUNK_SIZE);
    dump.extend_from_slice(&encode_link(None).to_le_bytes());
    dump.extend_from_slice(chunk.payload());
    chunk.release();

    fs::write(&args.output, &dump).map_err(|err| io_error("write chunk dump", err))?;
    info!(path = %args.output.display(), bytes = dump.len(), "chunk dump written");

    let report = EncodeReport {
        path: args.output.display().to_string(),
        chunk_bytes: dump.len(),
        request_bytes: usize::from(table.request.len),
        headers: table.used_header_slots().len(),
        message_len,
    };
    print_report(&report, format);
    Ok(SUCCESS)
}
