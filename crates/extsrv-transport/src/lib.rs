//! Local transport for the extension server.
//!
//! The host proxy's control plane reaches the extension server over a Unix
//! domain socket. This crate owns the socket file lifecycle (validation,
//! stale-socket cleanup, permissions, removal on drop) and hands out
//! [`LocalStream`] values that the framing layer reads and writes.

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::PeerCredentials;

#[cfg(unix)]
pub use stream::LocalStream;

#[cfg(unix)]
pub use uds::{validate_socket_path, UdsEndpoint};
