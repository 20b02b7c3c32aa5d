use gwbridge_ident::session::{pack_wide, to_cookie_header};
use gwbridge_ident::{find_session_cookie, parse_cookie_string, SessionIdentity};
use serde::Serialize;

use crate::cmd::{SessionDecodeArgs, SessionEncodeArgs};
use crate::exit::{identity_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{hex_word, print_report, OutputFormat, Report};

#[derive(Serialize)]
struct EncodeReport {
    #[serde(flatten)]
    identity: SessionIdentity,
    cookie: String,
    header: String,
    wide: [String; 2],
}

impl Report for EncodeReport {
    fn fields(&self) -> Vec<(String, String)> {
        vec![
            ("session_index".into(), self.identity.session_index.to_string()),
            ("random_salt".into(), hex_word(self.identity.random_salt)),
            ("scheduler_id".into(), self.identity.scheduler_id.to_string()),
            ("cookie".into(), self.cookie.clone()),
            ("header".into(), self.header.clone()),
            ("wide[0]".into(), self.wide[0].clone()),
            ("wide[1]".into(), self.wide[1].clone()),
        ]
    }
}

#[derive(Serialize)]
struct DecodeReport {
    cookie: String,
    session_index: u32,
    random_salt: u64,
    valid: bool,
}

impl Report for DecodeReport {
    fn fields(&self) -> Vec<(String, String)> {
        vec![
            ("cookie".into(), self.cookie.clone()),
            ("session_index".into(), self.session_index.to_string()),
            ("random_salt".into(), hex_word(self.random_salt)),
            ("valid".into(), self.valid.to_string()),
        ]
    }
}

pub fn encode(args: SessionEncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let identity = SessionIdentity {
        random_salt: args.salt,
        session_index: args.index,
        scheduler_id: args.scheduler,
    };
    let (word0, word1) = pack_wide(&identity);
    let report = EncodeReport {
        identity,
        cookie: identity.to_cookie_string(),
        header: to_cookie_header(&identity),
        wide: [hex_word(word0), hex_word(word1)],
    };
    print_report(&report, format);
    Ok(SUCCESS)
}

pub fn decode(args: SessionDecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = args.cookie.trim().as_bytes();
    let value = if input.contains(&b'=') {
        find_session_cookie(input)
            .ok_or_else(|| CliError::new(DATA_INVALID, "no ScSessionId cookie in header"))?
    } else {
        input
    };

    let (session_index, random_salt) =
        parse_cookie_string(value).map_err(|err| identity_error("decode", err))?;
    let identity = SessionIdentity {
        random_salt,
        session_index,
        scheduler_id: 0,
    };
    let report = DecodeReport {
        cookie: String::from_utf8_lossy(value).into_owned(),
        session_index,
        random_salt,
        valid: identity.is_valid(),
    };
    print_report(&report, format);
    Ok(SUCCESS)
}
