use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

/// Identity the adapter reports in health listings and handshakes.
pub const SERVER_NAME: &str = "envoy-gateway-extension-server";

/// Receive ceiling used when none is configured: 16 MiB.
pub const DEFAULT_MAX_RECEIVE_BYTES: NonZeroU32 = match NonZeroU32::new(16 * 1024 * 1024) {
    Some(limit) => limit,
    None => panic!("default receive limit must be non-zero"),
};

/// Room a call frame may take beyond its body: method path, type URL and
/// protobuf field headers.
pub const CALL_FRAME_OVERHEAD: u32 = 64 * 1024;

/// Largest call frame that carries a body of at most `max_receive_bytes`.
pub fn call_frame_limit(max_receive_bytes: u32) -> usize {
    usize::try_from(max_receive_bytes.saturating_add(CALL_FRAME_OVERHEAD)).unwrap_or(usize::MAX)
}

/// Immutable adapter settings, fixed at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    endpoint_path: PathBuf,
    standalone: bool,
    max_receive_bytes: NonZeroU32,
}

impl AdapterConfig {
    /// Build the configuration.
    ///
    /// A `max_receive_bytes` of `0` means "unset" and becomes
    /// [`DEFAULT_MAX_RECEIVE_BYTES`].
    pub fn new(
        endpoint_path: impl Into<PathBuf>,
        standalone: bool,
        max_receive_bytes: u32,
    ) -> Self {
        Self {
            endpoint_path: endpoint_path.into(),
            standalone,
            max_receive_bytes: NonZeroU32::new(max_receive_bytes)
                .unwrap_or(DEFAULT_MAX_RECEIVE_BYTES),
        }
    }

    /// Socket path the adapter listens on.
    pub fn endpoint_path(&self) -> &Path {
        &self.endpoint_path
    }

    /// Whether the adapter runs decoupled from its usual host.
    pub fn standalone(&self) -> bool {
        self.standalone
    }

    /// Largest inbound message, in bytes, advertised to callers.
    pub fn max_receive_bytes(&self) -> u32 {
        self.max_receive_bytes.get()
    }

    /// [`Self::max_receive_bytes`] as a buffer length.
    pub fn max_receive_len(&self) -> usize {
        usize::try_from(self.max_receive_bytes.get()).unwrap_or(usize::MAX)
    }

    /// Read limit for request frames on a server connection.
    pub fn max_call_frame_len(&self) -> usize {
        call_frame_limit(self.max_receive_bytes.get())
    }

    /// Largest reply frame the server writes, advertised to callers.
    ///
    /// Never below the default receive limit, and large enough to echo a
    /// maximal request back.
    pub fn max_reply_bytes(&self) -> u32 {
        self.max_receive_bytes
            .get()
            .saturating_add(CALL_FRAME_OVERHEAD)
            .max(DEFAULT_MAX_RECEIVE_BYTES.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_means_default() {
        let config = AdapterConfig::new("/tmp/ext.sock", false, 0);
        assert_eq!(config.max_receive_bytes(), 16 * 1024 * 1024);
        assert_eq!(config.max_receive_len(), 16 * 1024 * 1024);
    }

    #[test]
    fn explicit_limit_is_kept() {
        for limit in [1, 4096, 16 * 1024 * 1024 + 1, u32::MAX] {
            let config = AdapterConfig::new("/tmp/ext.sock", true, limit);
            assert_eq!(config.max_receive_bytes(), limit);
        }
    }

    #[test]
    fn frame_limits_leave_room_around_the_body() {
        let small = AdapterConfig::new("/tmp/ext.sock", false, 64);
        assert_eq!(small.max_call_frame_len(), 64 + 64 * 1024);
        assert_eq!(small.max_reply_bytes(), 16 * 1024 * 1024);

        let large = AdapterConfig::new("/tmp/ext.sock", false, 20 * 1024 * 1024);
        assert_eq!(large.max_reply_bytes(), 20 * 1024 * 1024 + 64 * 1024);

        let huge = AdapterConfig::new("/tmp/ext.sock", false, u32::MAX);
        assert_eq!(huge.max_reply_bytes(), u32::MAX);
        assert_eq!(call_frame_limit(u32::MAX), u32::MAX as usize);
    }

    #[test]
    fn carries_endpoint_and_mode() {
        let config = AdapterConfig::new("/run/ext/ext.sock", true, 1024);
        assert_eq!(config.endpoint_path(), Path::new("/run/ext/ext.sock"));
        assert!(config.standalone());
        assert!(!AdapterConfig::new("/run/ext/ext.sock", false, 0).standalone());
    }
}
