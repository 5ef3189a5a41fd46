//! Blocking client for the adapter socket.
//!
//! Used by the CLI queries and by tests; a proxy control plane speaks the same
//! framing from its own code.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use extsrv_frame::{Frame, FrameConfig, FrameError, FrameKind, FrameReader, FrameWriter};
use extsrv_transport::{LocalStream, UdsEndpoint};
use prost::Message;
use tracing::debug;

use crate::config::call_frame_limit;
use crate::envelope::{to_envelope, Envelope, Serializable};
use crate::error::{AdapterError, Result};
use crate::handshake::{handshake_client, send_control, ControlMessage, HandshakeConfig, Welcome};
use crate::health::HealthStatus;
use crate::hook::HookKind;
use crate::method::Method;
use crate::proto::{
    Call, HealthCheckRequest, HealthCheckResponse, HealthListRequest, HealthListResponse, Reply,
};
use crate::status::Status;

/// Client-side limits.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub handshake: HandshakeConfig,
    /// How long to wait for each frame of an answer.
    pub call_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            handshake: HandshakeConfig::default(),
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// One connection to a running adapter. Calls are issued one at a time.
pub struct Client {
    pub(crate) reader: FrameReader<LocalStream>,
    pub(crate) writer: FrameWriter<LocalStream>,
    welcome: Welcome,
    call_timeout: Duration,
    next_call: u32,
}

impl Client {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(path, &ClientConfig::default())
    }

    pub fn connect_with_config(path: impl AsRef<Path>, config: &ClientConfig) -> Result<Self> {
        let stream = UdsEndpoint::connect(path)?;
        let reader_stream = stream.try_clone()?;

        let frame_config = FrameConfig {
            max_payload_size: config.handshake.max_handshake_payload,
            read_timeout: Some(config.handshake.timeout),
            write_timeout: Some(config.handshake.timeout),
        };
        let mut reader = FrameReader::for_stream(reader_stream, frame_config.clone())?;
        let mut writer = FrameWriter::for_stream(stream, frame_config)?;

        let welcome = handshake_client(&mut reader, &mut writer, &config.handshake)?;
        debug!(
            server = %welcome.server,
            peer_id = %welcome.peer_id,
            max_receive_bytes = welcome.max_receive_bytes,
            "connected"
        );

        reader.set_max_payload_size(
            usize::try_from(welcome.max_reply_bytes).unwrap_or(usize::MAX),
        );
        writer.set_max_payload_size(call_frame_limit(welcome.max_receive_bytes));
        reader.get_ref().set_read_timeout(Some(config.call_timeout))?;

        Ok(Self {
            reader,
            writer,
            welcome,
            call_timeout: config.call_timeout,
            next_call: 1,
        })
    }

    /// What the server announced during the handshake.
    pub fn welcome(&self) -> &Welcome {
        &self.welcome
    }

    /// `Check` for `service`. The empty name asks about the server overall.
    pub fn check(&mut self, service: &str) -> Result<HealthStatus> {
        let request = to_envelope(&HealthCheckRequest::for_service(service))?;
        let response: HealthCheckResponse = self.call_expecting(Method::HealthCheck, request)?;
        Ok(response.status())
    }

    /// `List`: status per known service.
    pub fn list(&mut self) -> Result<BTreeMap<String, HealthStatus>> {
        let request = to_envelope(&HealthListRequest::default())?;
        let response: HealthListResponse = self.call_expecting(Method::HealthList, request)?;
        Ok(response
            .statuses
            .into_iter()
            .map(|(service, status)| (service, status.status()))
            .collect())
    }

    /// `Watch`: feed each streamed status to `on_update` until the call ends.
    pub fn watch(
        &mut self,
        service: &str,
        mut on_update: impl FnMut(HealthStatus),
    ) -> Result<()> {
        let request = to_envelope(&HealthCheckRequest::for_service(service))?;
        self.call_streaming(Method::HealthWatch, Some(request), |item| {
            let update: HealthCheckResponse = item.unpack()?;
            on_update(update.status());
            Ok(())
        })?;
        Ok(())
    }

    /// Invoke an extension hook with `request` and return its response envelope.
    pub fn call_hook<M: Serializable + ?Sized>(
        &mut self,
        hook: HookKind,
        request: &M,
    ) -> Result<Envelope> {
        let body = to_envelope(request)?;
        self.call(Method::Hook(hook), Some(body))?.ok_or_else(|| {
            AdapterError::Protocol(format!("{hook} reply carried no response"))
        })
    }

    /// Issue a unary call and return the reply body.
    pub fn call(&mut self, method: Method, body: Option<Envelope>) -> Result<Option<Envelope>> {
        self.call_streaming(method, body, |item| {
            Err(AdapterError::Protocol(format!(
                "unexpected stream item '{}' for unary call",
                item.type_url
            )))
        })
    }

    /// Issue a call, handing each stream item to `on_item` before the reply.
    pub fn call_streaming(
        &mut self,
        method: Method,
        body: Option<Envelope>,
        mut on_item: impl FnMut(Envelope) -> Result<()>,
    ) -> Result<Option<Envelope>> {
        // The advertised ceiling covers the request message, not the call
        // wrapper around it.
        let limit = self.welcome.max_receive_bytes;
        if let Some(body) = &body {
            if u32::try_from(body.value.len()).map_or(true, |len| len > limit) {
                return Err(Status::resource_exhausted(format!(
                    "request of {} bytes exceeds server limit of {limit} bytes",
                    body.value.len()
                ))
                .into());
            }
        }

        let call_id = self.next_call_id();
        let payload = Call {
            method: method.path(),
            body,
        }
        .encode_to_vec();

        self.writer.send(FrameKind::Request, call_id, &payload)?;

        loop {
            let frame = self.read_answer()?;
            if frame.call_id != call_id {
                return Err(AdapterError::Protocol(format!(
                    "answer for call {} while waiting for call {call_id}",
                    frame.call_id
                )));
            }
            match frame.kind {
                FrameKind::StreamItem => on_item(Envelope::decode(frame.payload)?)?,
                FrameKind::Reply => return Ok(Reply::decode(frame.payload)?.into_result()?),
                other => {
                    return Err(AdapterError::Protocol(format!(
                        "unexpected {other} frame in answer to {method}"
                    )));
                }
            }
        }
    }

    /// Round-trip a control ping.
    pub fn ping(&mut self) -> Result<Duration> {
        let started = Instant::now();
        send_control(&mut self.writer, &ControlMessage::Ping)?;
        let frame = self.read_answer()?;
        if frame.kind != FrameKind::Control {
            return Err(AdapterError::Protocol(format!(
                "expected pong, got {} frame",
                frame.kind
            )));
        }
        match serde_json::from_slice(&frame.payload)? {
            ControlMessage::Pong => Ok(started.elapsed()),
            other => Err(AdapterError::Protocol(format!("expected pong, got {other:?}"))),
        }
    }

    fn call_expecting<M>(&mut self, method: Method, request: Envelope) -> Result<M>
    where
        M: Message + prost::Name + Default,
    {
        let body = self
            .call(method, Some(request))?
            .ok_or_else(|| AdapterError::Protocol(format!("{method} reply carried no response")))?;
        Ok(body.unpack()?)
    }

    fn read_answer(&mut self) -> Result<Frame> {
        match self.reader.read_frame() {
            Ok(frame) => Ok(frame),
            Err(err) if err.is_timeout() => Err(AdapterError::Timeout(self.call_timeout)),
            Err(FrameError::ConnectionClosed) => Err(AdapterError::Disconnected(
                "server closed the connection".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn next_call_id(&mut self) -> u32 {
        let id = self.next_call;
        // Zero is reserved for control frames.
        self.next_call = self.next_call.checked_add(1).unwrap_or(1);
        id
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("server", &self.welcome.server)
            .field("peer_id", &self.welcome.peer_id)
            .finish_non_exhaustive()
    }
}
