use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::stream::LocalStream;

/// `sockaddr_un.sun_path` capacity, including the trailing NUL.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

/// Check that `path` can be used as a socket address.
pub fn validate_socket_path(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len == 0 {
        return Err(TransportError::EmptyPath);
    }
    if len >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max: MAX_PATH_LEN,
        });
    }
    Ok(())
}

/// A bound Unix domain socket endpoint.
///
/// The socket file is created with mode `0600` by default. A stale socket at
/// the same path is replaced; any other kind of file is left alone and the
/// bind fails. On drop the socket file is removed, but only if it is still the
/// inode this endpoint created.
pub struct UdsEndpoint {
    listener: UnixListener,
    path: PathBuf,
    identity: (u64, u64),
}

impl UdsEndpoint {
    /// Permission bits applied to the socket file.
    pub const DEFAULT_MODE: u32 = 0o600;

    /// Bind `path` with [`Self::DEFAULT_MODE`].
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_MODE)
    }

    /// Bind `path` and apply `mode` to the socket file.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        validate_socket_path(&path)?;
        let bind_err = |source: std::io::Error| TransportError::Bind {
            path: path.clone(),
            source,
        };

        match std::fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.file_type().is_socket() => {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(bind_err)?;
            }
            Ok(_) => {
                return Err(bind_err(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(bind_err(err)),
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(bind_err)?;
        let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, mode = %format!("{mode:o}"), "endpoint bound");

        Ok(Self {
            listener,
            path,
            identity: (metadata.dev(), metadata.ino()),
        })
    }

    /// Block until a caller connects.
    pub fn accept(&self) -> Result<LocalStream> {
        let (stream, _) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "accepted connection");
        Ok(LocalStream::new(stream))
    }

    /// Switch the listening socket between blocking and non-blocking accepts.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener.set_nonblocking(nonblocking)?;
        Ok(())
    }

    /// Accept a pending connection without blocking.
    ///
    /// Returns `Ok(None)` when no caller is waiting. The listener must be in
    /// non-blocking mode; the returned stream is always blocking.
    pub fn try_accept(&self) -> Result<Option<LocalStream>> {
        match self.listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                debug!(path = ?self.path, "accepted connection");
                Ok(Some(LocalStream::new(stream)))
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(None),
            Err(err) => Err(TransportError::Accept(err)),
        }
    }

    /// Connect to an endpoint bound at `path`.
    pub fn connect(path: impl AsRef<Path>) -> Result<LocalStream> {
        let path = path.as_ref();
        validate_socket_path(path)?;
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "connected to endpoint");
        Ok(LocalStream::new(stream))
    }

    /// Filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for UdsEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdsEndpoint")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for UdsEndpoint {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        let still_ours = metadata.file_type().is_socket()
            && (metadata.dev(), metadata.ino()) == self.identity;
        if !still_ours {
            debug!(path = ?self.path, "socket path was replaced; leaving it in place");
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = ?self.path, error = %err, "failed to remove socket file");
        }
    }
}
