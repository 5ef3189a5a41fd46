use std::time::Duration;

use crate::envelope::EnvelopeError;
use crate::status::Status;

/// Errors from serving or calling the adapter over its socket.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("transport error: {0}")]
    Transport(#[from] extsrv_transport::TransportError),

    #[error("frame error: {0}")]
    Frame(#[from] extsrv_frame::FrameError),

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The other side broke the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("peer disconnected: {0}")]
    Disconnected(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The call completed with a non-OK status.
    #[error("call failed: {0}")]
    Status(#[from] Status),
}

impl AdapterError {
    /// The call status, when the error is a failed call.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
