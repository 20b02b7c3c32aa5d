mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "gwbridge", version, about = "Gateway chunk bridge diagnostics")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{SessionCommand, SocketCommand};

    #[test]
    fn parses_socket_pack() {
        let cli = Cli::try_parse_from([
            "gwbridge",
            "socket",
            "pack",
            "--index",
            "334532",
            "--unique-id",
            "674346456",
            "--scheduler",
            "4",
            "--worker",
            "7",
        ])
        .expect("pack args should parse");

        assert!(matches!(
            cli.command,
            Command::Socket(SocketCommand::Pack(_))
        ));
    }

    #[test]
    fn unpack_requires_a_word() {
        let err = Cli::try_parse_from(["gwbridge", "socket", "unpack"])
            .expect_err("missing word should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn unpack_word_conflicts_with_wide() {
        let err = Cli::try_parse_from([
            "gwbridge", "socket", "unpack", "0x10", "--wide", "1", "2",
        ])
        .expect_err("both forms should conflict");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_session_decode_with_global_format() {
        let cli = Cli::try_parse_from([
            "gwbridge",
            "session",
            "decode",
            "00000001000000000000007B",
            "--format",
            "json",
        ])
        .expect("decode args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(
            cli.command,
            Command::Session(SessionCommand::Decode(_))
        ));
    }
}
