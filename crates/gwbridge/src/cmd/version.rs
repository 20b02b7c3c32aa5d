use gwbridge_chunk::{CHUNK_SIZE, MAX_EXTRA_LINKED_CHUNKS};
use gwbridge_request::MAX_HTTP_HEADERS;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("gwbridge {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: gwbridge");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("GWBRIDGE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "layout: chunk={CHUNK_SIZE}B extra_chunks={MAX_EXTRA_LINKED_CHUNKS} headers={MAX_HTTP_HEADERS}"
    );

    Ok(SUCCESS)
}
