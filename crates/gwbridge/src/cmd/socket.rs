use gwbridge_ident::socket::{pack_compact, pack_wide, unpack_compact, unpack_wide};
use gwbridge_ident::SocketIdentity;
use serde::Serialize;

use crate::cmd::{SocketPackArgs, SocketUnpackArgs};
use crate::exit::{identity_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{hex_word, print_report, OutputFormat, Report};

#[derive(Serialize)]
struct SocketReport {
    #[serde(flatten)]
    identity: SocketIdentity,
    compact: String,
    wide: [String; 2],
}

impl SocketReport {
    fn new(identity: SocketIdentity) -> CliResult<Self> {
        let compact = pack_compact(&identity).map_err(|err| identity_error("pack", err))?;
        let (word0, word1) = pack_wide(&identity).map_err(|err| identity_error("pack", err))?;
        Ok(Self {
            identity,
            compact: hex_word(compact),
            wide: [hex_word(word0), hex_word(word1)],
        })
    }
}

impl Report for SocketReport {
    fn fields(&self) -> Vec<(String, String)> {
        vec![
            ("index".into(), self.identity.index.to_string()),
            ("unique_id".into(), self.identity.unique_id.to_string()),
            ("scheduler_id".into(), self.identity.scheduler_id.to_string()),
            (
                "gateway_worker_id".into(),
                self.identity.gateway_worker_id.to_string(),
            ),
            ("compact".into(), self.compact.clone()),
            ("wide[0]".into(), self.wide[0].clone()),
            ("wide[1]".into(), self.wide[1].clone()),
        ]
    }
}

pub fn pack(args: SocketPackArgs, format: OutputFormat) -> CliResult<i32> {
    let identity = SocketIdentity {
        index: args.index,
        unique_id: args.unique_id,
        scheduler_id: args.scheduler,
        gateway_worker_id: args.worker,
    };
    print_report(&SocketReport::new(identity)?, format);
    Ok(SUCCESS)
}

pub fn unpack(args: SocketUnpackArgs, format: OutputFormat) -> CliResult<i32> {
    let identity = match (args.word, args.wide.as_deref()) {
        (Some(word), None) => unpack_compact(word),
        (None, Some(&[word0, word1])) => {
            unpack_wide(word0, word1).map_err(|err| identity_error("unpack", err))?
        }
        _ => {
            return Err(CliError::new(
                USAGE,
                "give either a compact word or --wide WORD0 WORD1",
            ))
        }
    };
    print_report(&SocketReport::new(identity)?, format);
    Ok(SUCCESS)
}
