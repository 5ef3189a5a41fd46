//! Envoy Gateway extension server on a local Unix socket.
//!
//! # Crate Structure
//!
//! - [`transport`]: socket endpoint and connected streams
//! - [`frame`]: length-prefixed frames tagged with a kind and a call id
//! - [`adapter`]: health service, hook dispatch, envelopes, server and client
//!
//! The `extsrv` binary (feature `cli`) serves the adapter and queries a running
//! one.

/// Re-export transport types.
pub mod transport {
    pub use extsrv_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use extsrv_frame::*;
}

/// Re-export adapter types.
pub mod adapter {
    pub use extsrv_adapter::*;
}
