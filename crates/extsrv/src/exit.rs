use std::fmt;
use std::io;

use extsrv_adapter::{AdapterError, Code, Status, StoreError};
use extsrv_frame::FrameError;
use extsrv_transport::TransportError;

// Stable process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
/// A query got an answer, but not SERVING.
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const UNSUPPORTED: i32 = 69;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::PathTooLong { .. } | TransportError::EmptyPath => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn status_error(context: &str, status: Status) -> CliError {
    let code = match status.code() {
        Code::Unimplemented => UNSUPPORTED,
        Code::InvalidArgument | Code::ResourceExhausted => DATA_INVALID,
        Code::Unavailable => HEALTH_CHECK_FAILED,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {status}"))
}

pub fn adapter_error(context: &str, err: AdapterError) -> CliError {
    match err {
        AdapterError::Transport(err) => transport_error(context, err),
        AdapterError::Frame(err) => frame_error(context, err),
        AdapterError::Status(status) => status_error(context, status),
        AdapterError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        AdapterError::Json(_) | AdapterError::Decode(_) | AdapterError::Envelope(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        AdapterError::HandshakeFailed(_) | AdapterError::Protocol(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        AdapterError::Disconnected(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn store_error(context: &str, err: StoreError) -> CliError {
    match err {
        StoreError::Io { source, .. } => io_error(context, source),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}
