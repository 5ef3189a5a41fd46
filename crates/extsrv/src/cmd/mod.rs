use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use extsrv_adapter::{AdapterError, Client, ClientConfig, HandshakeConfig};
use extsrv_transport::TransportError;

use crate::exit::{adapter_error, CliError, CliResult, TIMEOUT, USAGE};
use crate::output::OutputFormat;

pub mod check;
pub mod info;
pub mod list;
pub mod serve;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the extension server.
    Serve(ServeArgs),
    /// Query the health of one service.
    Check(CheckArgs),
    /// List the health of every known service.
    List(QueryArgs),
    /// Stream health updates for one service.
    Watch(CheckArgs),
    /// Print what a running server announces about itself.
    Info(QueryArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Check(args) => check::run(args, format),
        Command::List(args) => list::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EndpointArgs {
    /// Unix socket path of the extension server.
    #[arg(long, value_name = "PATH", env = "EXTSRV_SOCKET")]
    pub socket: PathBuf,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,
    /// Run decoupled from a managing host.
    #[arg(long, env = "EXTSRV_STANDALONE")]
    pub standalone: bool,
    /// Largest accepted request in bytes (0 = 16 MiB default).
    #[arg(long, value_name = "BYTES", default_value_t = 0, env = "EXTSRV_MAX_RECV_BYTES")]
    pub max_recv_bytes: u32,
    /// JSON file with the configuration objects to serve to hooks.
    #[arg(long, value_name = "FILE", env = "EXTSRV_STORE")]
    pub store: Option<PathBuf>,
    /// How long a new connection may take to say hello (e.g. 5s, 500ms).
    #[arg(long, value_name = "DURATION", default_value = "5s", env = "EXTSRV_HANDSHAKE_TIMEOUT")]
    pub handshake_timeout: String,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,
    /// Connect and call timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,
    /// Service name; empty asks about the server as a whole.
    #[arg(long, default_value = "")]
    pub service: String,
    /// Connect and call timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Connect, retrying while the socket is missing or refusing, up to `timeout`.
pub(crate) fn connect_with_timeout(path: &Path, timeout: Duration) -> CliResult<Client> {
    let config = ClientConfig {
        handshake: HandshakeConfig {
            timeout,
            ..HandshakeConfig::default()
        },
        call_timeout: timeout,
    };

    let start = Instant::now();
    loop {
        match Client::connect_with_config(path, &config) {
            Ok(client) => return Ok(client),
            Err(err) => {
                if !is_retryable_connect_error(&err) {
                    return Err(adapter_error("connect failed", err));
                }
                if start.elapsed() >= timeout {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("connect timed out after {timeout:?}"),
                    ));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

fn is_retryable_connect_error(err: &AdapterError) -> bool {
    match err {
        AdapterError::Transport(TransportError::Connect { source, .. }) => matches!(
            source.kind(),
            std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
        ),
        _ => false,
    }
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_millis() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
        assert_eq!(parse_duration("5m").unwrap_err().code, USAGE);
    }

    #[test]
    fn only_absent_sockets_are_retried() {
        let missing = AdapterError::Transport(TransportError::Connect {
            path: "/tmp/none.sock".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert!(is_retryable_connect_error(&missing));
        let handshake = AdapterError::HandshakeFailed("bad version".to_string());
        assert!(!is_retryable_connect_error(&handshake));
    }
}
