use crate::cmd::{connect_with_timeout, parse_duration, CheckArgs};
use crate::exit::{adapter_error, CliResult, SUCCESS};
use crate::output::{print_status, OutputFormat};

/// Print every update until the server ends the stream.
pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mut client = connect_with_timeout(&args.endpoint.socket, timeout)?;

    client
        .watch(&args.service, |status| {
            print_status(&args.service, status, format);
        })
        .map_err(|err| adapter_error("watch failed", err))?;
    Ok(SUCCESS)
}
