//! Frame kinds.

use crate::error::FrameError;

/// What a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Connection management: handshake, ping/pong. JSON payload.
    Control = 0,
    /// A call from the host. Protobuf `Call` payload.
    Request = 1,
    /// The terminal answer to a call. Protobuf `Reply` payload.
    Reply = 2,
    /// One item of a streaming answer; always followed by a `Reply`.
    StreamItem = 3,
}

impl FrameKind {
    /// Human-readable name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Request => "request",
            Self::Reply => "reply",
            Self::StreamItem => "stream-item",
        }
    }
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Control),
            1 => Ok(Self::Request),
            2 => Ok(Self::Reply),
            3 => Ok(Self::StreamItem),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
