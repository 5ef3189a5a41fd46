use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use extsrv_frame::{FrameConfig, FrameError, FrameKind, FrameReader, FrameWriter};
use extsrv_transport::{LocalStream, UdsEndpoint};
use prost::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::Adapter;
use crate::context::CallContext;
use crate::envelope::to_envelope;
use crate::error::{AdapterError, Result};
use crate::handshake::{handshake_server, send_control, ControlMessage, HandshakeConfig, Welcome};
use crate::health::WatchSink;
use crate::proto::{Call, HealthCheckResponse, Reply};
use crate::status::Status;

/// How often the accept loop looks at the shutdown token.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Read timeout on idle connections, so workers notice shutdown.
const IDLE_POLL: Duration = Duration::from_millis(200);

/// How often a running call checks whether its caller hung up.
const HANG_UP_POLL: Duration = Duration::from_millis(20);

/// Serves an [`Adapter`] on its configured Unix socket.
///
/// Each accepted connection gets its own thread. Cancelling the token passed
/// to [`Server::serve`] stops accepting, cancels every connection and waits
/// for the workers to finish.
pub struct Server {
    adapter: Arc<Adapter>,
    endpoint: UdsEndpoint,
    handshake: HandshakeConfig,
    next_peer: AtomicU64,
}

impl Server {
    /// Bind the socket named by the adapter's configuration.
    pub fn bind(adapter: Arc<Adapter>) -> Result<Self> {
        let endpoint = UdsEndpoint::bind(adapter.config().endpoint_path())?;
        Ok(Self {
            adapter,
            endpoint,
            handshake: HandshakeConfig::default(),
            next_peer: AtomicU64::new(1),
        })
    }

    /// Override the handshake limits applied to new connections.
    pub fn with_handshake_config(mut self, config: HandshakeConfig) -> Self {
        self.handshake = config;
        self
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.endpoint.path()
    }

    /// The adapter answering calls.
    pub fn adapter(&self) -> &Arc<Adapter> {
        &self.adapter
    }

    /// Accept and serve connections until `shutdown` is cancelled.
    pub fn serve(&self, shutdown: &CancellationToken) -> Result<()> {
        let span = self.adapter.span().clone();
        let _entered = span.enter();

        self.endpoint.set_nonblocking(true)?;
        info!(path = %self.path().display(), "serving");

        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        while !shutdown.is_cancelled() {
            match self.endpoint.try_accept() {
                Ok(Some(stream)) => {
                    if let Some(worker) = self.spawn_worker(stream, shutdown.child_token()) {
                        workers.push(worker);
                    }
                }
                Ok(None) => thread::sleep(ACCEPT_POLL),
                Err(err) => {
                    warn!(%err, "accept failed");
                    thread::sleep(ACCEPT_POLL);
                }
            }
            workers.retain(|worker| !worker.is_finished());
        }

        info!(active = workers.len(), "shutting down");
        for worker in workers {
            if worker.join().is_err() {
                warn!("connection worker panicked");
            }
        }
        Ok(())
    }

    fn spawn_worker(
        &self,
        stream: LocalStream,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let id = self.next_peer.fetch_add(1, Ordering::Relaxed);
        let peer_id = format!("peer-{id}");
        let adapter = Arc::clone(&self.adapter);
        let handshake = self.handshake.clone();
        let span = self.adapter.span().clone();

        let spawned = thread::Builder::new()
            .name(format!("extsrv-{peer_id}"))
            .spawn(move || {
                let _entered = span.enter();
                match serve_connection(&adapter, stream, &peer_id, &handshake, &cancel) {
                    Ok(()) => info!(peer_id, "peer disconnected"),
                    Err(err) => warn!(peer_id, %err, "connection ended with error"),
                }
            });

        match spawned {
            Ok(worker) => Some(worker),
            Err(err) => {
                warn!(%err, "failed to spawn connection worker");
                None
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("endpoint", &self.endpoint)
            .field("handshake", &self.handshake)
            .finish_non_exhaustive()
    }
}

fn serve_connection(
    adapter: &Adapter,
    stream: LocalStream,
    peer_id: &str,
    handshake: &HandshakeConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    match stream.peer_credentials() {
        Some(creds) => info!(
            peer_id,
            uid = creds.uid,
            gid = creds.gid,
            pid = creds.pid,
            "peer connected"
        ),
        None => info!(peer_id, "peer connected"),
    }

    let frame_config = FrameConfig {
        max_payload_size: handshake.max_handshake_payload,
        read_timeout: Some(handshake.timeout),
        write_timeout: Some(handshake.timeout),
    };
    let hang_up = stream.try_clone()?;
    let mut reader = FrameReader::for_stream(stream.try_clone()?, frame_config.clone())?;
    let mut writer = FrameWriter::for_stream(stream, frame_config)?;

    let welcome = Welcome::for_adapter(adapter.config(), peer_id);
    let hello = handshake_server(&mut reader, &mut writer, &welcome, handshake)?;
    debug!(peer_id, version = %hello.version, "handshake complete");

    let reply_limit =
        usize::try_from(adapter.config().max_reply_bytes()).unwrap_or(usize::MAX);
    reader.set_max_payload_size(adapter.config().max_call_frame_len());
    writer.set_max_payload_size(reply_limit);
    reader.get_ref().set_read_timeout(Some(IDLE_POLL))?;

    loop {
        if cancel.is_cancelled() {
            debug!(peer_id, "connection cancelled");
            return Ok(());
        }
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(err) if err.is_timeout() => continue,
            Err(FrameError::ConnectionClosed) => return Ok(()),
            Err(FrameError::PayloadTooLarge { size, max }) => {
                // The oversized payload is still in the stream; the
                // connection cannot be resynchronised.
                let rejection = ControlMessage::Error {
                    message: format!("message of {size} bytes exceeds limit of {max} bytes"),
                };
                if let Err(err) = send_control(&mut writer, &rejection) {
                    debug!(peer_id, %err, "could not report oversized frame");
                }
                return Err(FrameError::PayloadTooLarge { size, max }.into());
            }
            Err(err) => return Err(err.into()),
        };

        match frame.kind {
            FrameKind::Request => {
                let ctx = CallContext::new(peer_id, frame.call_id, cancel.child_token());
                let (reply, hung_up) =
                    dispatch_watched(adapter, &ctx, &frame.payload, &mut writer, &hang_up);
                if hung_up {
                    debug!(peer_id, call_id = frame.call_id, "caller hung up mid-call");
                    return Ok(());
                }
                let payload = encode_reply(&reply, reply_limit);
                writer.send(FrameKind::Reply, frame.call_id, &payload)?;
            }
            FrameKind::Control => handle_control(&mut writer, &frame.payload)?,
            other => {
                return Err(AdapterError::Protocol(format!(
                    "client sent a {other} frame"
                )));
            }
        }
    }
}

/// Run one call while a scoped thread watches `hang_up` for the caller going
/// away. A hang-up cancels the call's token; the flag reports it.
fn dispatch_watched<W: Write>(
    adapter: &Adapter,
    ctx: &CallContext,
    payload: &[u8],
    writer: &mut FrameWriter<W>,
    hang_up: &LocalStream,
) -> (Reply, bool) {
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let call = ctx.cancellation();

    thread::scope(|scope| {
        let watcher = thread::Builder::new()
            .name(format!("extsrv-call-{}", ctx.call_id()))
            .spawn_scoped(scope, move || watch_hang_up(hang_up, call, &done_rx));
        if let Err(err) = &watcher {
            debug!(call_id = ctx.call_id(), %err, "hang-up watcher not started");
        }

        let reply = handle_request(adapter, ctx, payload, writer);
        drop(done_tx);

        let hung_up = match watcher {
            Ok(handle) => handle.join().unwrap_or(false),
            Err(_) => false,
        };
        (reply, hung_up)
    })
}

/// Poll until the call ends (`done` disconnects), is cancelled, or the peer
/// closes its end. Returns whether the peer hung up.
fn watch_hang_up(
    stream: &LocalStream,
    call: &CancellationToken,
    done: &mpsc::Receiver<()>,
) -> bool {
    loop {
        if call.is_cancelled() {
            return false;
        }
        match stream.peer_hung_up() {
            Ok(true) => {
                call.cancel();
                return true;
            }
            Ok(false) => {}
            Err(err) => {
                debug!(%err, "hang-up check failed");
                return false;
            }
        }
        match done.recv_timeout(HANG_UP_POLL) {
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            _ => return false,
        }
    }
}

/// Encode `reply`, replacing it with `ResourceExhausted` if it would not fit
/// in one frame of `limit` bytes.
fn encode_reply(reply: &Reply, limit: usize) -> Vec<u8> {
    let encoded = reply.encode_to_vec();
    if encoded.len() <= limit {
        return encoded;
    }
    warn!(size = encoded.len(), limit, "reply exceeds frame limit");
    Reply::from(Status::resource_exhausted(format!(
        "reply of {} bytes exceeds limit of {limit} bytes",
        encoded.len()
    )))
    .encode_to_vec()
}

fn handle_request<W: Write>(
    adapter: &Adapter,
    ctx: &CallContext,
    payload: &[u8],
    writer: &mut FrameWriter<W>,
) -> Reply {
    match Call::decode(payload) {
        Ok(call) => {
            let mut items = StreamItems {
                writer,
                call_id: ctx.call_id(),
            };
            adapter.dispatch(ctx, call, &mut items)
        }
        Err(err) => {
            debug!(call_id = ctx.call_id(), %err, "malformed call");
            Status::invalid_argument(format!("malformed call: {err}")).into()
        }
    }
}

fn handle_control<W: Write>(writer: &mut FrameWriter<W>, payload: &[u8]) -> Result<()> {
    let answer = match serde_json::from_slice::<ControlMessage>(payload) {
        Ok(ControlMessage::Ping) => ControlMessage::Pong,
        Ok(other) => ControlMessage::Error {
            message: format!("unexpected control message {other:?}"),
        },
        Err(err) => ControlMessage::Error {
            message: format!("malformed control message: {err}"),
        },
    };
    send_control(writer, &answer)
}

/// Writes watch updates as stream items of one call.
struct StreamItems<'a, W: Write> {
    writer: &'a mut FrameWriter<W>,
    call_id: u32,
}

impl<W: Write> WatchSink for StreamItems<'_, W> {
    fn send(&mut self, update: HealthCheckResponse) -> std::result::Result<(), Status> {
        let envelope = to_envelope(&update).map_err(|err| Status::internal(err.to_string()))?;
        self.writer
            .send(FrameKind::StreamItem, self.call_id, &envelope.encode_to_vec())
            .map_err(|err| match err {
                FrameError::PayloadTooLarge { .. } => Status::resource_exhausted(err.to_string()),
                other => Status::unavailable(format!("watch stream closed: {other}")),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::client::Client;
    use crate::config::{AdapterConfig, SERVER_NAME};
    use crate::envelope::Envelope;
    use crate::health::HealthStatus;
    use crate::hook::{HookContext, HookKind, HookProcessor};
    use crate::method::Method;
    use crate::proto::HealthCheckRequest;
    use crate::status::Code;
    use crate::store::MemoryStore;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "extsrv-srv-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("ext.sock")
    }

    /// Returns the request unchanged.
    struct Echo;

    impl HookProcessor for Echo {
        fn process(
            &self,
            _ctx: &HookContext<'_>,
            _hook: HookKind,
            request: Envelope,
        ) -> std::result::Result<Envelope, Status> {
            Ok(request)
        }
    }

    struct Running {
        path: PathBuf,
        shutdown: CancellationToken,
        handle: Option<JoinHandle<()>>,
    }

    /// Fills its reply with `size` bytes, whatever the request.
    struct Inflate {
        size: usize,
    }

    impl HookProcessor for Inflate {
        fn process(
            &self,
            _ctx: &HookContext<'_>,
            _hook: HookKind,
            request: Envelope,
        ) -> std::result::Result<Envelope, Status> {
            Ok(Envelope {
                type_url: request.type_url,
                value: vec![0x2a; self.size],
            })
        }
    }

    /// Waits up to three seconds for the call to be cancelled and reports
    /// whether it was.
    struct AwaitCancel {
        observed: mpsc::Sender<bool>,
    }

    impl HookProcessor for AwaitCancel {
        fn process(
            &self,
            ctx: &HookContext<'_>,
            _hook: HookKind,
            _request: Envelope,
        ) -> std::result::Result<Envelope, Status> {
            let deadline = std::time::Instant::now() + Duration::from_secs(3);
            while std::time::Instant::now() < deadline {
                if ctx.call.is_cancelled() {
                    let _ = self.observed.send(true);
                    return Err(Status::cancelled("caller went away"));
                }
                thread::sleep(Duration::from_millis(10));
            }
            let _ = self.observed.send(false);
            Err(Status::internal("call was never cancelled"))
        }
    }

    impl Running {
        fn start(tag: &str, max_receive_bytes: u32) -> Self {
            Self::start_with(
                tag,
                max_receive_bytes,
                Arc::new(Echo),
                HandshakeConfig::default(),
            )
        }

        fn start_with(
            tag: &str,
            max_receive_bytes: u32,
            hooks: Arc<dyn HookProcessor>,
            handshake: HandshakeConfig,
        ) -> Self {
            let path = make_sock_path(tag);
            let adapter = Adapter::new(
                Arc::new(MemoryStore::empty()),
                AdapterConfig::new(&path, true, max_receive_bytes),
            )
            .with_hooks(hooks);
            let server = Server::bind(Arc::new(adapter))
                .expect("server should bind")
                .with_handshake_config(handshake);
            let shutdown = CancellationToken::new();
            let token = shutdown.clone();
            let handle = thread::spawn(move || {
                server.serve(&token).expect("serve should return cleanly");
            });
            Self {
                path,
                shutdown,
                handle: Some(handle),
            }
        }

        fn client(&self) -> Client {
            Client::connect(&self.path).expect("client should connect")
        }
    }

    impl Drop for Running {
        fn drop(&mut self) {
            self.shutdown.cancel();
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
            if let Some(parent) = self.path.parent() {
                let _ = std::fs::remove_dir_all(parent);
            }
        }
    }

    #[test]
    fn welcome_advertises_configuration() {
        let running = Running::start("welcome", 4096);
        let client = running.client();
        let welcome = client.welcome();
        assert_eq!(welcome.server, SERVER_NAME);
        assert_eq!(welcome.peer_id, "peer-1");
        assert_eq!(welcome.max_receive_bytes, 4096);
        assert!(welcome.standalone);
    }

    #[test]
    fn check_and_list_over_the_socket() {
        let running = Running::start("health", 0);
        let mut client = running.client();

        assert_eq!(client.check("").expect("check"), HealthStatus::Serving);
        assert_eq!(client.check("anything").expect("check"), HealthStatus::Serving);

        let statuses = client.list().expect("list");
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[SERVER_NAME], HealthStatus::Serving);
    }

    #[test]
    fn watch_reports_unimplemented() {
        let running = Running::start("watch", 0);
        let mut client = running.client();

        let mut updates = Vec::new();
        let err = client
            .watch("", |status| updates.push(status))
            .expect_err("watch should fail");
        let status = err.status().expect("error should carry a status");
        assert_eq!(status.code(), Code::Unimplemented);
        assert_eq!(status.message(), "Watch is not implemented");
        assert!(updates.is_empty());

        // The connection stays usable after a failed call.
        assert_eq!(client.check("").expect("check"), HealthStatus::Serving);
    }

    #[test]
    fn hook_round_trip() {
        let running = Running::start("hook", 0);
        let mut client = running.client();

        let request = HealthCheckRequest::for_service("route-a");
        let answer = client
            .call_hook(HookKind::PostRouteModify, &request)
            .expect("hook call");
        let echoed: HealthCheckRequest = answer.unpack().expect("unpack");
        assert_eq!(echoed.service, "route-a");
    }

    #[test]
    fn unknown_method_is_unimplemented() {
        let running = Running::start("unknown", 0);
        let mut client = running.client();

        // Drive the raw framing: the method path is not one of ours.
        let payload = Call {
            method: "/pkg.Svc/Nope".to_string(),
            body: None,
        }
        .encode_to_vec();
        client.writer.send(FrameKind::Request, 7, &payload).expect("send");
        let frame = client.reader.read_frame().expect("reply");
        assert_eq!(frame.kind, FrameKind::Reply);
        assert_eq!(frame.call_id, 7);
        let reply = Reply::decode(frame.payload).expect("decode");
        assert_eq!(reply.code(), Code::Unimplemented);
    }

    #[test]
    fn malformed_call_is_invalid_argument() {
        let running = Running::start("malformed", 0);
        let mut client = running.client();

        client
            .writer
            .send(FrameKind::Request, 3, &[0xff, 0xff, 0xff])
            .expect("send");
        let frame = client.reader.read_frame().expect("reply");
        let reply = Reply::decode(frame.payload).expect("decode");
        assert_eq!(reply.code(), Code::InvalidArgument);
        assert!(reply.message.contains("malformed call"));
    }

    #[test]
    fn small_receive_limit_still_answers_health() {
        let running = Running::start("small-limit", 64);
        let mut client = running.client();

        assert_eq!(client.check("").expect("check"), HealthStatus::Serving);
        assert_eq!(client.list().expect("list")[SERVER_NAME], HealthStatus::Serving);
    }

    #[test]
    fn server_enforces_limit_on_request_body() {
        let running = Running::start("body-limit", 64);
        let mut client = running.client();

        // Bypass the client-side check and send an oversized body directly.
        let body =
            to_envelope(&HealthCheckRequest::for_service("x".repeat(128))).expect("envelope");
        let payload = Call {
            method: Method::Hook(HookKind::PostRouteModify).path(),
            body: Some(body),
        }
        .encode_to_vec();
        client.writer.send(FrameKind::Request, 5, &payload).expect("send");
        let frame = client.reader.read_frame().expect("reply");
        let reply = Reply::decode(frame.payload).expect("decode");
        assert_eq!(reply.code(), Code::ResourceExhausted);
    }

    #[test]
    fn oversized_call_is_refused_before_sending() {
        let running = Running::start("limit", 64);
        let mut client = running.client();

        let request = HealthCheckRequest::for_service("x".repeat(128));
        let err = client
            .call_hook(HookKind::PostTranslateModify, &request)
            .expect_err("call should be refused");
        assert_eq!(
            err.status().map(Status::code),
            Some(Code::ResourceExhausted)
        );
        assert_eq!(client.check("").expect("check"), HealthStatus::Serving);
    }

    #[test]
    fn oversized_frame_gets_control_error_then_close() {
        let running = Running::start("frame-limit", 64);
        let mut client = running.client();

        // Larger than the body limit plus call overhead.
        client.writer.set_max_payload_size(usize::MAX);
        let payload = vec![0u8; 128 * 1024];
        let _ = client.writer.send(FrameKind::Request, 9, &payload);

        let frame = client.reader.read_frame().expect("control error");
        assert_eq!(frame.kind, FrameKind::Control);
        let message: ControlMessage = serde_json::from_slice(&frame.payload).expect("json");
        assert!(matches!(message, ControlMessage::Error { .. }));
        // Closing with unread data may surface as a reset rather than EOF.
        assert!(client.reader.read_frame().is_err());
    }

    #[test]
    fn large_hook_call_within_raised_limit() {
        let running = Running::start("large", 20 * 1024 * 1024);
        let mut client = running.client();

        let request = HealthCheckRequest::for_service("r".repeat(17 * 1024 * 1024));
        let answer = client
            .call_hook(HookKind::PostTranslateModify, &request)
            .expect("17 MiB hook call should round-trip");
        let echoed: HealthCheckRequest = answer.unpack().expect("unpack");
        assert_eq!(echoed.service.len(), 17 * 1024 * 1024);
    }

    #[test]
    fn oversized_reply_becomes_a_status() {
        let running = Running::start_with(
            "big-reply",
            0,
            Arc::new(Inflate {
                size: 17 * 1024 * 1024,
            }),
            HandshakeConfig::default(),
        );
        let mut client = running.client();

        let err = client
            .call_hook(HookKind::PostRouteModify, &HealthCheckRequest::default())
            .expect_err("reply should not fit");
        assert_eq!(
            err.status().map(Status::code),
            Some(Code::ResourceExhausted)
        );

        // The connection survives.
        assert_eq!(client.check("").expect("check"), HealthStatus::Serving);
    }

    #[test]
    fn encode_reply_replaces_oversized_reply() {
        let reply = Reply::ok(Some(Envelope {
            type_url: "type.googleapis.com/x.Y".to_string(),
            value: vec![1; 256],
        }));
        let fits = encode_reply(&reply, 1024);
        assert_eq!(Reply::decode(fits.as_slice()).expect("decode"), reply);

        let replaced = Reply::decode(encode_reply(&reply, 64).as_slice()).expect("decode");
        assert_eq!(replaced.code(), Code::ResourceExhausted);
        assert!(replaced.body.is_none());
    }

    #[test]
    fn caller_hang_up_cancels_running_call() {
        let (tx, rx) = mpsc::channel();
        let running = Running::start_with(
            "hang-up",
            0,
            Arc::new(AwaitCancel { observed: tx }),
            HandshakeConfig::default(),
        );
        let mut client = running.client();

        let body = to_envelope(&HealthCheckRequest::default()).expect("envelope");
        let payload = Call {
            method: Method::Hook(HookKind::PostRouteModify).path(),
            body: Some(body),
        }
        .encode_to_vec();
        client.writer.send(FrameKind::Request, 1, &payload).expect("send");
        thread::sleep(Duration::from_millis(100));
        drop(client);

        let observed = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("hook should finish");
        assert!(observed, "hook should see the call cancelled");
    }

    #[test]
    fn silent_peer_is_dropped_after_handshake_timeout() {
        let running = Running::start_with(
            "silent",
            0,
            Arc::new(Echo),
            HandshakeConfig {
                timeout: Duration::from_millis(200),
                ..HandshakeConfig::default()
            },
        );

        let mut raw = UdsEndpoint::connect(&running.path).expect("connect");
        raw.set_read_timeout(Some(Duration::from_secs(5)))
            .expect("timeout");
        let mut buf = [0u8; 16];
        let read = std::io::Read::read(&mut raw, &mut buf).expect("read should see EOF");
        assert_eq!(read, 0);
    }

    #[test]
    fn ping_gets_pong() {
        let running = Running::start("ping", 0);
        let mut client = running.client();
        client.ping().expect("ping");
    }

    #[test]
    fn concurrent_clients_get_distinct_peer_ids() {
        let running = Running::start("multi", 0);
        let mut first = running.client();
        let mut second = running.client();
        assert_ne!(first.welcome().peer_id, second.welcome().peer_id);
        assert_eq!(first.check("").expect("check"), HealthStatus::Serving);
        assert_eq!(second.check("").expect("check"), HealthStatus::Serving);
    }

    #[test]
    fn shutdown_disconnects_clients() {
        let running = Running::start("shutdown", 0);
        let mut client = running.client();
        assert_eq!(client.check("").expect("check"), HealthStatus::Serving);

        drop(running);

        assert!(client.check("").is_err());
    }

    #[test]
    fn cancelled_call_context_reports_cancelled() {
        let adapter = Adapter::new(
            Arc::new(MemoryStore::empty()),
            AdapterConfig::new("/tmp/unused.sock", false, 0),
        );
        let token = CancellationToken::new();
        let ctx = CallContext::new("peer-x", 1, token.child_token());
        token.cancel();

        let payload = Call {
            method: Method::HealthCheck.path(),
            body: None,
        }
        .encode_to_vec();
        let mut writer = FrameWriter::new(Vec::new());
        let reply = handle_request(&adapter, &ctx, &payload, &mut writer);
        assert_eq!(reply.code(), Code::Cancelled);
    }
}
