use extsrv_adapter::HealthStatus;

use crate::cmd::{connect_with_timeout, parse_duration, QueryArgs};
use crate::exit::{adapter_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_statuses, OutputFormat};

pub fn run(args: QueryArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mut client = connect_with_timeout(&args.endpoint.socket, timeout)?;

    let statuses = client
        .list()
        .map_err(|err| adapter_error("list failed", err))?;
    print_statuses(&statuses, format);

    let all_serving = statuses
        .values()
        .all(|status| *status == HealthStatus::Serving);
    Ok(if all_serving { SUCCESS } else { HEALTH_CHECK_FAILED })
}
