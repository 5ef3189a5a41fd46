//! Control-plane adapter for proxy extension hooks.
//!
//! The adapter sits behind a Unix domain socket. The proxy's control plane
//! connects, performs a short handshake and then issues calls:
//!
//! - health queries (`Check`, `Watch`, `List`), answered by the adapter itself
//! - extension hooks, forwarded to a [`HookProcessor`]
//!
//! Every call body and every answer travels as an [`Envelope`]: a type URL
//! plus the protobuf bytes of the message, so either side can handle payloads
//! whose concrete type depends on the call.

pub mod adapter;
#[cfg(unix)]
pub mod client;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod handshake;
pub mod health;
pub mod hook;
pub mod method;
pub mod proto;
#[cfg(unix)]
pub mod server;
pub mod status;
pub mod store;

pub use adapter::Adapter;
#[cfg(unix)]
pub use client::{Client, ClientConfig};
pub use config::{AdapterConfig, DEFAULT_MAX_RECEIVE_BYTES, SERVER_NAME};
pub use context::CallContext;
pub use envelope::{
    to_envelope, to_envelope_within, Envelope, EnvelopeError, SerializeError, Serializable,
    TYPE_URL_PREFIX,
};
pub use error::{AdapterError, Result};
pub use handshake::{
    ControlMessage, HandshakeConfig, Hello, Welcome, PROTOCOL_NAME, PROTOCOL_VERSION,
};
pub use health::{AlwaysServing, HealthService, HealthStatus, Readiness, WatchSink};
pub use hook::{HookContext, HookKind, HookProcessor, UnimplementedHooks};
pub use method::Method;
#[cfg(unix)]
pub use server::Server;
pub use status::{Code, Status};
pub use store::{ConfigStore, MemoryStore, ObjectKey, StoreError, StoredObject};

/// Cancellation handle threaded through servers, connections and calls.
pub use tokio_util::sync::CancellationToken;
