use extsrv_adapter::{PROTOCOL_NAME, PROTOCOL_VERSION, SERVER_NAME};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("extsrv {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: extsrv");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("server: {SERVER_NAME}");
    println!("protocol: {PROTOCOL_NAME} {PROTOCOL_VERSION}");
    println!(
        "target: {}",
        option_env!("EXTSRV_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("EXTSRV_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);

    Ok(SUCCESS)
}
