use serde::Serialize;

use crate::cmd::{connect_with_timeout, parse_duration, QueryArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    server: String,
    peer_id: String,
    protocol: String,
    protocol_version: String,
    max_receive_bytes: u32,
    standalone: bool,
    ping_latency_ms: Option<f64>,
    connected: bool,
}

pub fn run(args: QueryArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mut client = connect_with_timeout(&args.endpoint.socket, timeout)?;

    let ping_latency_ms = client
        .ping()
        .ok()
        .map(|d| (d.as_secs_f64() * 1000.0 * 100.0).round() / 100.0);

    let welcome = client.welcome();
    let out = InfoOutput {
        server: welcome.server.clone(),
        peer_id: welcome.peer_id.clone(),
        protocol: welcome.protocol.clone(),
        protocol_version: welcome.version.clone(),
        max_receive_bytes: welcome.max_receive_bytes,
        standalone: welcome.standalone,
        ping_latency_ms,
        connected: true,
    };

    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Server Info:");
            println!("  Server:           {}", out.server);
            println!("  Peer ID:          {}", out.peer_id);
            println!("  Protocol:         {} {}", out.protocol, out.protocol_version);
            println!("  Max receive:      {} bytes", out.max_receive_bytes);
            println!("  Standalone:       {}", out.standalone);
            match out.ping_latency_ms {
                Some(ms) => println!("  Ping:             {ms:.2}ms"),
                None => println!("  Ping:             unavailable"),
            }
        }
    }
}
