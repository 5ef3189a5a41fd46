//! Connection handshake.
//!
//! Right after connecting, the client sends a [`Hello`] on a control frame and
//! the server answers with a [`Welcome`] (or a rejection). The welcome tells
//! the caller who it is talking to and how large a message the server will
//! accept.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use extsrv_frame::{FrameError, FrameKind, FrameReader, FrameWriter};
use serde::{Deserialize, Serialize};

use crate::config::{AdapterConfig, SERVER_NAME};
use crate::error::{AdapterError, Result};

/// Protocol name both sides must agree on.
pub const PROTOCOL_NAME: &str = "extsrv";

/// Version spoken by this build. Peers must share the major component.
pub const PROTOCOL_VERSION: &str = "1.0";

const MAX_PROTOCOL_LEN: usize = 32;
const MAX_VERSION_LEN: usize = 16;

/// First message from the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hello {
    pub protocol: String,
    pub version: String,
}

impl Default for Hello {
    fn default() -> Self {
        Self {
            protocol: PROTOCOL_NAME.to_string(),
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}

/// Server answer to an accepted [`Hello`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Welcome {
    pub protocol: String,
    pub version: String,
    /// Server identity, e.g. `envoy-gateway-extension-server`.
    pub server: String,
    /// Identifier the server assigned to this connection.
    pub peer_id: String,
    /// Largest request body the server accepts.
    pub max_receive_bytes: u32,
    /// Largest reply frame the server sends.
    pub max_reply_bytes: u32,
    pub standalone: bool,
}

impl Welcome {
    pub fn for_adapter(config: &AdapterConfig, peer_id: &str) -> Self {
        Self {
            protocol: PROTOCOL_NAME.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            server: SERVER_NAME.to_string(),
            peer_id: peer_id.to_string(),
            max_receive_bytes: config.max_receive_bytes(),
            max_reply_bytes: config.max_reply_bytes(),
            standalone: config.standalone(),
        }
    }
}

/// Control-frame messages exchanged after (or instead of) the welcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Ping,
    Pong,
    /// The server refused the connection or a control message.
    Error { message: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ServerAnswer {
    Welcome(Welcome),
    Control(ControlMessage),
}

/// Limits applied while the handshake is in progress.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Upper bound for the whole exchange.
    pub timeout: Duration,
    /// Largest handshake payload either side accepts.
    pub max_handshake_payload: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_handshake_payload: 16 * 1024,
        }
    }
}

/// Client side: send `Hello`, wait for `Welcome`.
pub fn handshake_client<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    config: &HandshakeConfig,
) -> Result<Welcome> {
    let hello = Hello::default();
    send_control(writer, &hello)?;

    let payload = recv_control(reader, config)?;
    let welcome = match serde_json::from_slice(&payload)? {
        ServerAnswer::Welcome(welcome) => welcome,
        ServerAnswer::Control(ControlMessage::Error { message }) => {
            return Err(AdapterError::HandshakeFailed(format!(
                "server rejected connection: {message}"
            )));
        }
        ServerAnswer::Control(other) => {
            return Err(AdapterError::Protocol(format!(
                "expected welcome, got {other:?}"
            )));
        }
    };

    validate_identity(&welcome.protocol, &welcome.version)?;
    if !is_version_compatible(&hello.version, &welcome.version) {
        return Err(AdapterError::HandshakeFailed(format!(
            "incompatible version '{}' (local '{}')",
            welcome.version, hello.version
        )));
    }
    if welcome.max_receive_bytes == 0 || welcome.max_reply_bytes == 0 {
        return Err(AdapterError::HandshakeFailed(
            "server advertised a zero message limit".to_string(),
        ));
    }
    Ok(welcome)
}

/// Server side: wait for `Hello`, answer with `welcome` or a rejection.
pub fn handshake_server<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    welcome: &Welcome,
    config: &HandshakeConfig,
) -> Result<Hello> {
    let payload = recv_control(reader, config)?;
    let hello: Hello = serde_json::from_slice(&payload)?;

    let verdict = validate_identity(&hello.protocol, &hello.version).and_then(|()| {
        if is_version_compatible(&hello.version, &welcome.version) {
            Ok(())
        } else {
            Err(AdapterError::HandshakeFailed(format!(
                "incompatible version '{}' (server '{}')",
                hello.version, welcome.version
            )))
        }
    });

    if let Err(err) = verdict {
        let rejection = ControlMessage::Error {
            message: err.to_string(),
        };
        // Best effort: the caller may already be gone.
        let _ = send_control(writer, &rejection);
        return Err(err);
    }

    send_control(writer, welcome)?;
    Ok(hello)
}

pub(crate) fn send_control<T: Serialize, W: Write>(
    writer: &mut FrameWriter<W>,
    value: &T,
) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    writer.send(FrameKind::Control, 0, &payload)?;
    Ok(())
}

fn recv_control<R: Read>(reader: &mut FrameReader<R>, config: &HandshakeConfig) -> Result<Vec<u8>> {
    let deadline = Instant::now() + config.timeout;
    loop {
        if Instant::now() >= deadline {
            return Err(AdapterError::Timeout(config.timeout));
        }
        match reader.read_frame() {
            Ok(frame) if frame.kind != FrameKind::Control => {
                return Err(AdapterError::Protocol(format!(
                    "expected control frame during handshake, got {}",
                    frame.kind
                )));
            }
            Ok(frame) if frame.payload.len() > config.max_handshake_payload => {
                return Err(AdapterError::HandshakeFailed(format!(
                    "handshake payload too large: {} (max {})",
                    frame.payload.len(),
                    config.max_handshake_payload
                )));
            }
            Ok(frame) => return Ok(frame.payload.to_vec()),
            Err(err) if err.is_timeout() => continue,
            Err(FrameError::ConnectionClosed) => {
                return Err(AdapterError::Disconnected(
                    "connection closed during handshake".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn validate_identity(protocol: &str, version: &str) -> Result<()> {
    if protocol != PROTOCOL_NAME {
        let shown: String = protocol.chars().take(MAX_PROTOCOL_LEN).collect();
        return Err(AdapterError::HandshakeFailed(format!(
            "unknown protocol '{shown}' (expected '{PROTOCOL_NAME}')"
        )));
    }
    if version.is_empty() || version.len() > MAX_VERSION_LEN {
        return Err(AdapterError::HandshakeFailed(format!(
            "invalid version length {}",
            version.len()
        )));
    }
    if major_version(version).is_none() {
        return Err(AdapterError::HandshakeFailed(format!(
            "invalid version '{version}'"
        )));
    }
    Ok(())
}

fn major_version(version: &str) -> Option<u32> {
    version.split('.').next()?.parse().ok()
}

fn is_version_compatible(local: &str, remote: &str) -> bool {
    matches!(
        (major_version(local), major_version(remote)),
        (Some(a), Some(b)) if a == b
    )
}
