use extsrv_adapter::HealthStatus;

use crate::cmd::{connect_with_timeout, parse_duration, CheckArgs};
use crate::exit::{adapter_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_status, OutputFormat};

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mut client = connect_with_timeout(&args.endpoint.socket, timeout)?;

    let status = client
        .check(&args.service)
        .map_err(|err| adapter_error("check failed", err))?;
    print_status(&args.service, status, format);

    Ok(if status == HealthStatus::Serving {
        SUCCESS
    } else {
        HEALTH_CHECK_FAILED
    })
}
