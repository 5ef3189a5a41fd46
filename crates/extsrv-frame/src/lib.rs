//! Call framing for the extension server wire protocol.
//!
//! Every message on the socket is a frame:
//! - a 2-byte magic (`"EX"`) for stream synchronization
//! - a 1-byte [`FrameKind`] and a reserved flags byte
//! - a 4-byte big-endian call id that pairs replies with requests
//! - a 4-byte big-endian payload length
//!
//! Readers and writers hide partial I/O; callers always see whole frames.

pub mod codec;
pub mod error;
pub mod kind;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use kind::FrameKind;
pub use reader::FrameReader;
pub use writer::FrameWriter;
