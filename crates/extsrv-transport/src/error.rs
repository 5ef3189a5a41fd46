use std::path::PathBuf;

/// Errors raised while binding, accepting or connecting the local endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint could not be bound.
    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Connecting to the endpoint failed.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Accepting a connection failed.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error on an established stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path does not fit into `sockaddr_un`.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The socket path is empty.
    #[error("socket path must not be empty")]
    EmptyPath,
}

pub type Result<T> = std::result::Result<T, TransportError>;
