use std::io::{Read, Write};
use std::net::Shutdown;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use crate::error::Result;

/// Credentials of the process on the other end of a [`LocalStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCredentials {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

/// A connected endpoint stream.
///
/// Implements `Read + Write`; the framing layer wraps one clone for reading
/// and another for writing.
#[cfg(unix)]
pub struct LocalStream {
    inner: UnixStream,
}

#[cfg(unix)]
impl LocalStream {
    pub(crate) fn new(inner: UnixStream) -> Self {
        Self { inner }
    }

    /// Set (or clear) the read timeout.
    ///
    /// Connection loops use a short read timeout to notice cancellation while
    /// waiting for the next frame.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Set (or clear) the write timeout.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Duplicate the underlying descriptor.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self::new(self.inner.try_clone()?))
    }

    /// Shut down both halves of the connection.
    ///
    /// Any clone blocked in `read` returns end-of-stream.
    pub fn shutdown(&self) -> Result<()> {
        match self.inner.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Already disconnected by the peer.
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Whether the other end has closed the connection.
    ///
    /// Peeks at the socket without blocking and without consuming data, so it
    /// can run on a clone while another handle owns the read side. Pending
    /// unread data counts as "still connected".
    pub fn peer_hung_up(&self) -> Result<bool> {
        use std::os::fd::AsRawFd;

        let mut byte = 0u8;
        // SAFETY: the buffer is one writable byte and the descriptor is an
        // open socket owned by `self.inner`.
        let rc = unsafe {
            libc::recv(
                self.inner.as_raw_fd(),
                (&mut byte as *mut u8).cast::<libc::c_void>(),
                1,
                libc::MSG_PEEK | libc::MSG_DONTWAIT,
            )
        };
        if rc > 0 {
            return Ok(false);
        }
        if rc == 0 {
            return Ok(true);
        }
        let err = std::io::Error::last_os_error();
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => Ok(false),
            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe => Ok(true),
            _ => Err(err.into()),
        }
    }

    /// Credentials of the connected process, via `SO_PEERCRED`.
    #[cfg(target_os = "linux")]
    pub fn peer_credentials(&self) -> Option<PeerCredentials> {
        use std::os::fd::AsRawFd;

        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

        // SAFETY: `cred` and `len` point to writable memory of the advertised
        // size and the descriptor is an open socket owned by `self.inner`.
        let rc = unsafe {
            libc::getsockopt(
                self.inner.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                (&mut cred as *mut libc::ucred).cast::<libc::c_void>(),
                &mut len,
            )
        };

        if rc != 0 || len as usize != std::mem::size_of::<libc::ucred>() {
            return None;
        }
        Some(PeerCredentials {
            uid: cred.uid,
            gid: cred.gid,
            pid: u32::try_from(cred.pid).ok()?,
        })
    }

    /// Credentials are only exposed on Linux.
    #[cfg(not(target_os = "linux"))]
    pub fn peer_credentials(&self) -> Option<PeerCredentials> {
        None
    }
}

#[cfg(unix)]
impl Read for LocalStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

#[cfg(unix)]
impl Write for LocalStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(unix)]
impl std::fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStream")
            .field("transport", &"unix")
            .finish_non_exhaustive()
    }
}
