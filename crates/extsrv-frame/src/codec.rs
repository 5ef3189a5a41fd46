use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::FrameKind;

/// magic (2) + kind (1) + flags (1) + call id (4) + length (4).
pub const HEADER_SIZE: usize = 12;

/// `"EX"`.
pub const MAGIC: [u8; 2] = [0x45, 0x58];

/// Default payload ceiling: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// Pairs replies and stream items with the request that caused them.
    /// Control frames use `0`.
    pub call_id: u32,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: FrameKind, call_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            call_id,
            payload: payload.into(),
        }
    }
}

/// Append one frame to `dst`.
///
/// ```text
/// +-------+------+-------+---------+--------+---------+
/// | "EX"  | kind | flags | call id | length | payload |
/// | 2B    | 1B   | 1B    | 4B BE   | 4B BE  |         |
/// +-------+------+-------+---------+--------+---------+
/// ```
pub fn encode_frame(kind: FrameKind, call_id: u32, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u8(kind as u8);
    dst.put_u8(0);
    dst.put_u32(call_id);
    dst.put_u32(len);
    dst.put_slice(payload);
    Ok(())
}

/// Take one complete frame off the front of `src`.
///
/// Returns `Ok(None)` until `src` holds a whole frame; nothing is consumed in
/// that case. The length is checked against `max_payload` as soon as the
/// header is available, before the payload is buffered.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut header = &src[..HEADER_SIZE];
    let mut magic = [0u8; 2];
    header.copy_to_slice(&mut magic);
    if magic != MAGIC {
        return Err(FrameError::InvalidMagic);
    }
    let kind = FrameKind::try_from(header.get_u8())?;
    let _flags = header.get_u8();
    let call_id = header.get_u32();
    let len = header.get_u32() as usize;

    if len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max_payload,
        });
    }
    if src.len() < HEADER_SIZE + len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(len).freeze();
    Ok(Some(Frame {
        kind,
        call_id,
        payload,
    }))
}

/// Limits and timeouts shared by [`crate::FrameReader`] and [`crate::FrameWriter`].
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest accepted payload. Default: [`DEFAULT_MAX_PAYLOAD`].
    pub max_payload_size: usize,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
