use std::sync::Arc;

use tracing::{debug, info_span, warn, Span};

use crate::config::{AdapterConfig, SERVER_NAME};
use crate::context::CallContext;
use crate::envelope::{to_envelope, Envelope};
use crate::health::{AlwaysServing, HealthService, Readiness, WatchSink};
use crate::hook::{HookContext, HookProcessor, UnimplementedHooks};
use crate::method::Method;
use crate::proto::{
    Call, HealthCheckRequest, HealthCheckResponse, HealthListRequest, HealthListResponse, Reply,
};
use crate::status::{Code, Status};
use crate::store::ConfigStore;

/// The extension server: health answers plus hook forwarding.
///
/// Holds only immutable state, so one instance behind an `Arc` serves every
/// connection concurrently.
pub struct Adapter {
    config: AdapterConfig,
    store: Arc<dyn ConfigStore>,
    hooks: Arc<dyn HookProcessor>,
    readiness: Arc<dyn Readiness>,
    span: Span,
}

impl Adapter {
    /// Create an adapter over `store`.
    ///
    /// Hooks default to [`UnimplementedHooks`] and readiness to
    /// [`AlwaysServing`]. All logging happens inside a span named after
    /// [`SERVER_NAME`], parented to the span current at construction time.
    pub fn new(store: Arc<dyn ConfigStore>, config: AdapterConfig) -> Self {
        let span = info_span!(
            "extension_server",
            server = SERVER_NAME,
            endpoint = %config.endpoint_path().display(),
            standalone = config.standalone(),
        );
        Self {
            config,
            store,
            hooks: Arc::new(UnimplementedHooks),
            readiness: Arc::new(AlwaysServing),
            span,
        }
    }

    /// Forward hook calls to `hooks`.
    pub fn with_hooks(mut self, hooks: Arc<dyn HookProcessor>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Derive reported health from `readiness`.
    pub fn with_readiness(mut self, readiness: Arc<dyn Readiness>) -> Self {
        self.readiness = readiness;
        self
    }

    /// Configuration this adapter was built with.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Object store handed to hooks.
    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    /// Span every call on this adapter runs under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Route one call and produce its terminal reply.
    ///
    /// Stream items of a streaming method go to `updates` before the reply is
    /// returned. Never panics on bad input; every failure becomes a reply with
    /// a non-OK code.
    pub fn dispatch(&self, ctx: &CallContext, call: Call, updates: &mut dyn WatchSink) -> Reply {
        let _entered = self.span.enter();
        let result = self.route(ctx, call.method.as_str(), call.body, updates);
        match &result {
            Ok(_) => debug!(method = %call.method, call_id = ctx.call_id(), "call completed"),
            Err(status) if status.code() == Code::Unimplemented => {
                debug!(
                    method = %call.method,
                    call_id = ctx.call_id(),
                    %status,
                    "call unimplemented"
                );
            }
            Err(status) => {
                warn!(method = %call.method, call_id = ctx.call_id(), %status, "call failed");
            }
        }
        result.into()
    }

    fn route(
        &self,
        ctx: &CallContext,
        path: &str,
        body: Option<Envelope>,
        updates: &mut dyn WatchSink,
    ) -> Result<Option<Envelope>, Status> {
        if let Some(body) = &body {
            let limit = self.config.max_receive_len();
            if body.value.len() > limit {
                return Err(Status::resource_exhausted(format!(
                    "request of {} bytes exceeds limit of {limit} bytes",
                    body.value.len()
                )));
            }
        }

        let method: Method = path
            .parse()
            .map_err(|err: crate::method::UnknownMethod| Status::unimplemented(err.to_string()))?;

        match method {
            Method::HealthCheck => {
                let request: HealthCheckRequest = unpack_body(method, body)?;
                let response = self.check(ctx, &request)?;
                envelope_response(&response).map(Some)
            }
            Method::HealthWatch => {
                let request: HealthCheckRequest = unpack_body(method, body)?;
                self.watch(ctx, &request, updates)?;
                Ok(None)
            }
            Method::HealthList => {
                let request: HealthListRequest = unpack_body(method, body)?;
                let response = self.list(ctx, &request)?;
                envelope_response(&response).map(Some)
            }
            Method::Hook(hook) => {
                ctx.ensure_active()?;
                let request = body.ok_or_else(|| {
                    Status::invalid_argument(format!("{method} requires a request body"))
                })?;
                let hook_ctx = HookContext {
                    call: ctx,
                    config: &self.config,
                    store: self.store.as_ref(),
                };
                self.hooks.process(&hook_ctx, hook, request).map(Some)
            }
        }
    }
}

impl HealthService for Adapter {
    fn check(
        &self,
        ctx: &CallContext,
        request: &HealthCheckRequest,
    ) -> Result<HealthCheckResponse, Status> {
        ctx.ensure_active()?;
        Ok(HealthCheckResponse::new(
            self.readiness.status(&request.service),
        ))
    }

    fn watch(
        &self,
        _ctx: &CallContext,
        _request: &HealthCheckRequest,
        _updates: &mut dyn WatchSink,
    ) -> Result<(), Status> {
        Err(Status::unimplemented("Watch is not implemented"))
    }

    fn list(
        &self,
        ctx: &CallContext,
        _request: &HealthListRequest,
    ) -> Result<HealthListResponse, Status> {
        ctx.ensure_active()?;
        let mut response = HealthListResponse::default();
        response.statuses.insert(
            SERVER_NAME.to_string(),
            HealthCheckResponse::new(self.readiness.status(SERVER_NAME)),
        );
        Ok(response)
    }
}

/// Decode the request of `method`; an absent body is the empty message.
fn unpack_body<M>(method: Method, body: Option<Envelope>) -> Result<M, Status>
where
    M: prost::Message + prost::Name + Default,
{
    match body {
        None => Ok(M::default()),
        Some(envelope) => envelope
            .unpack()
            .map_err(|err| Status::invalid_argument(format!("{method}: {err}"))),
    }
}

fn envelope_response<M>(response: &M) -> Result<Envelope, Status>
where
    M: prost::Message + prost::Name,
{
    to_envelope(response).map_err(|err| Status::internal(err.to_string()))
}
