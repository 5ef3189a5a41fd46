use std::io::{ErrorKind, Write};

use bytes::BytesMut;
#[cfg(unix)]
use extsrv_transport::LocalStream;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::kind::FrameKind;

/// Writes whole frames to a byte stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            config,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.kind, frame.call_id, frame.payload.as_ref())
    }

    /// Encode and write one frame, then flush.
    ///
    /// Payloads above the configured ceiling are refused before anything is
    /// written, so the stream never carries a frame the peer would reject.
    pub fn send(&mut self, kind: FrameKind, call_id: u32, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(kind, call_id, payload, &mut self.buf)?;

        let mut written = 0;
        while written < self.buf.len() {
            match self.inner.write(&self.buf[written..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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
impl FrameWriter<LocalStream> {
    /// Wrap a socket stream, applying the configured write timeout to it.
    pub fn for_stream(inner: LocalStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
