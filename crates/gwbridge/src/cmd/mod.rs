use clap::{ArgGroup, Args, Subcommand};
use std::path::PathBuf;

use gwbridge_chunk::{DEFAULT_CHUNK_COUNT, SOCKET_DATA_OFFSET};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod encode;
pub mod inspect;
pub mod session;
pub mod socket;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pack or unpack socket identities.
    #[command(subcommand)]
    Socket(SocketCommand),
    /// Encode or decode session cookies.
    #[command(subcommand)]
    Session(SessionCommand),
    /// Write a request chunk dump the way the gateway lays it out.
    Encode(EncodeArgs),
    /// Decode a chunk dump and print its request view.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

#[derive(Subcommand, Debug)]
pub enum SocketCommand {
    /// Pack identity fields into compact and wide words.
    Pack(SocketPackArgs),
    /// Unpack a compact word or a pair of wide words.
    Unpack(SocketUnpackArgs),
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Render the cookie string for a session.
    Encode(SessionEncodeArgs),
    /// Parse a cookie string or a whole Cookie header value.
    Decode(SessionDecodeArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Socket(SocketCommand::Pack(args)) => socket::pack(args, format),
        Command::Socket(SocketCommand::Unpack(args)) => socket::unpack(args, format),
        Command::Session(SessionCommand::Encode(args)) => session::encode(args, format),
        Command::Session(SessionCommand::Decode(args)) => session::decode(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Accept words in decimal or `0x` hex.
pub fn parse_word(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => input.replace('_', "").parse(),
    };
    parsed.map_err(|err| format!("invalid word {input:?}: {err}"))
}

#[derive(Args, Debug)]
pub struct SocketPackArgs {
    /// Slot in the gateway socket table (22 bits).
    #[arg(long)]
    pub index: u32,
    /// Reuse counter of the slot (32 bits).
    #[arg(long)]
    pub unique_id: u32,
    /// Owning scheduler (5 bits).
    #[arg(long, default_value = "0")]
    pub scheduler: u8,
    /// Owning gateway worker (5 bits).
    #[arg(long, default_value = "0")]
    pub worker: u8,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["word", "wide"])))]
pub struct SocketUnpackArgs {
    /// Compact identity word.
    #[arg(value_parser = parse_word)]
    pub word: Option<u64>,
    /// Wide identity words.
    #[arg(long, num_args = 2, value_names = ["WORD0", "WORD1"], value_parser = parse_word)]
    pub wide: Option<Vec<u64>>,
}

#[derive(Args, Debug)]
pub struct SessionEncodeArgs {
    /// Session slot index.
    #[arg(long)]
    pub index: u32,
    /// Random salt.
    #[arg(long, value_parser = parse_word)]
    pub salt: u64,
    /// Owning scheduler; kept in the wide form only.
    #[arg(long, default_value = "0")]
    pub scheduler: u32,
}

#[derive(Args, Debug)]
pub struct SessionDecodeArgs {
    /// Session string, or a Cookie header value containing ScSessionId.
    pub cookie: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Destination file for the chunk dump.
    pub output: PathBuf,
    /// Request method token.
    #[arg(long, default_value = "GET")]
    pub method: String,
    /// Request URI.
    #[arg(long, default_value = "/")]
    pub uri: String,
    /// Header line as "Name: value". Repeatable.
    #[arg(long = "header", short = 'H', value_name = "HEADER")]
    pub headers: Vec<String>,
    /// Request body.
    #[arg(long)]
    pub body: Option<String>,
    /// Compact socket identity word.
    #[arg(long, value_parser = parse_word, default_value = "0")]
    pub socket: u64,
    /// Session string to attach; adds a Cookie header.
    #[arg(long)]
    pub session: Option<String>,
    /// Payload offset of the socket-data region.
    #[arg(long, default_value_t = SOCKET_DATA_OFFSET)]
    pub base_offset: usize,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Chunk dump (link field plus payload).
    pub path: PathBuf,
    /// Payload offset of the socket-data region.
    #[arg(long, default_value_t = SOCKET_DATA_OFFSET)]
    pub base_offset: usize,
    /// Chunks in the pool the dump is loaded into.
    #[arg(long, default_value_t = DEFAULT_CHUNK_COUNT)]
    pub pool_size: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
