use std::io::{ErrorKind, Read};

use bytes::BytesMut;
#[cfg(unix)]
use extsrv_transport::LocalStream;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const READ_CHUNK: usize = 8 * 1024;

/// Reads whole frames from a byte stream.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
            config,
        }
    }

    /// Block until the next complete frame is available.
    ///
    /// End of stream yields [`FrameError::ConnectionClosed`]. A socket timeout
    /// yields an I/O error for which [`FrameError::is_timeout`] is true; the
    /// partial frame stays buffered.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(frame);
            }

            let read = match self.inner.read(&mut chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Change the payload ceiling for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(unix)]
impl FrameReader<LocalStream> {
    /// Wrap a socket stream, applying the configured read timeout to it.
    pub fn for_stream(inner: LocalStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BufMut;

    use super::*;
    use crate::codec::{encode_frame, MAGIC};
    use crate::kind::FrameKind;

    /// Splits inside the header.
    const HEADER_SPLIT: usize = 6;

    /// Hands out one byte per `read` call.
    struct Trickle {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    /// Times out once, then serves the remaining bytes.
    struct TimeoutOnce {
        first: Vec<u8>,
        rest: Vec<u8>,
        timed_out: bool,
    }

    impl Read for TimeoutOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.first.is_empty() {
                let n = self.first.len().min(buf.len());
                buf[..n].copy_from_slice(&self.first[..n]);
                self.first.drain(..n);
                return Ok(n);
            }
            if !self.timed_out {
                self.timed_out = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = self.rest.len().min(buf.len());
            buf[..n].copy_from_slice(&self.rest[..n]);
            self.rest.drain(..n);
            Ok(n)
        }
    }

    fn wire(frames: &[(FrameKind, u32, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (kind, call_id, payload) in frames {
            encode_frame(*kind, *call_id, payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn reads_frames_in_order() {
        let bytes = wire(&[
            (FrameKind::Request, 1, &b"one"[..]),
            (FrameKind::Request, 2, &b"two"[..]),
        ]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let first = reader.read_frame().unwrap();
        let second = reader.read_frame().unwrap();
        assert_eq!((first.call_id, first.payload.as_ref()), (1, &b"one"[..]));
        assert_eq!((second.call_id, second.payload.as_ref()), (2, &b"two"[..]));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn reassembles_byte_by_byte_input() {
        let bytes = wire(&[(FrameKind::Reply, 9, &b"slow reply"[..])]);
        let mut reader = FrameReader::new(Trickle { bytes, pos: 0 });

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.call_id, 9);
        assert_eq!(frame.payload.as_ref(), b"slow reply");
    }

    #[test]
    fn payload_larger_than_one_chunk() {
        let payload = vec![0x5a; 3 * READ_CHUNK + 17];
        let bytes = wire(&[(FrameKind::Request, 4, &payload[..])]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        assert_eq!(reader.read_frame().unwrap().payload.len(), payload.len());
    }

    #[test]
    fn eof_mid_frame_is_connection_closed() {
        let mut partial = BytesMut::new();
        partial.put_slice(&MAGIC);
        partial.put_u8(FrameKind::Request as u8);
        partial.put_u8(0);
        partial.put_u32(1);
        partial.put_u32(32);
        partial.put_slice(b"not enough");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn timeout_keeps_partial_frame() {
        let bytes = wire(&[(FrameKind::Request, 5, &b"resumed"[..])]);
        let (first, rest) = bytes.split_at(HEADER_SPLIT);
        let mut reader = FrameReader::new(TimeoutOnce {
            first: first.to_vec(),
            rest: rest.to_vec(),
            timed_out: false,
        });

        let err = reader.read_frame().unwrap_err();
        assert!(err.is_timeout());

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.call_id, 5);
        assert_eq!(frame.payload.as_ref(), b"resumed");
    }

    #[test]
    fn lowered_limit_applies_to_next_frame() {
        let bytes = wire(&[(FrameKind::Request, 1, &b"0123456789"[..])]);
        let mut reader = FrameReader::new(Cursor::new(bytes));
        reader.set_max_payload_size(4);

        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::PayloadTooLarge { size: 10, max: 4 })
        ));
        assert_eq!(reader.config().max_payload_size, 4);
    }
}
