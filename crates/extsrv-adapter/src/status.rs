//! Call outcomes.
//!
//! Codes reuse the gRPC numbering so that hosts written against gRPC health
//! and extension clients can map them one to one.

use std::fmt;

/// Outcome class of a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Code {
    Ok = 0,
    /// The caller went away or the server is shutting down.
    Cancelled = 1,
    Unknown = 2,
    /// The request could not be decoded into the type the method expects.
    InvalidArgument = 3,
    NotFound = 5,
    /// The message exceeds the receiver's advertised size limit.
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    /// The method exists in the protocol but this server does not offer it.
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
}

impl Code {
    /// Wire value to code; unknown values collapse to [`Code::Unknown`].
    pub fn from_wire(value: i32) -> Self {
        Self::try_from(value).unwrap_or(Self::Unknown)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotFound => "NOT_FOUND",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed call: code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(Code::ResourceExhausted, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether repeating the identical call can never succeed.
    ///
    /// `Unimplemented` is a capability gap and `InvalidArgument` a bad
    /// request; callers must not retry either unchanged.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.code,
            Code::Unimplemented | Code::InvalidArgument | Code::FailedPrecondition | Code::NotFound
        )
    }
}
