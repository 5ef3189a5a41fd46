use std::io::ErrorKind;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header does not start with the protocol magic.
    #[error("invalid frame magic (expected 0x4558 \"EX\")")]
    InvalidMagic,

    /// The header carries a frame kind this version does not know.
    #[error("unknown frame kind {0}")]
    UnknownKind(u8),

    /// The payload exceeds the configured ceiling.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// I/O error on the underlying stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream, possibly in the middle of a frame.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True when a read or write gave up because of a socket timeout.
    ///
    /// No bytes are lost: a [`crate::FrameReader`] keeps any partial frame
    /// buffered and the next `read_frame` call resumes it.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Io(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        )
    }
}

impl From<extsrv_transport::TransportError> for FrameError {
    fn from(err: extsrv_transport::TransportError) -> Self {
        use extsrv_transport::TransportError;

        match err {
            TransportError::Io(io) | TransportError::Accept(io) => Self::Io(io),
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                Self::Io(source)
            }
            other => Self::Io(std::io::Error::other(other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
