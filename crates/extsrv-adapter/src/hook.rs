//! Boundary to the extension-hook logic.

use std::fmt;

use crate::config::AdapterConfig;
use crate::context::CallContext;
use crate::envelope::Envelope;
use crate::status::Status;
use crate::store::ConfigStore;

/// Extension points the host calls while translating its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    PostRouteModify,
    PostVirtualHostModify,
    PostHttpListenerModify,
    PostTranslateModify,
}

impl HookKind {
    pub const ALL: [Self; 4] = [
        Self::PostRouteModify,
        Self::PostVirtualHostModify,
        Self::PostHttpListenerModify,
        Self::PostTranslateModify,
    ];

    /// Method name within the extension service.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::PostRouteModify => "PostRouteModify",
            Self::PostVirtualHostModify => "PostVirtualHostModify",
            Self::PostHttpListenerModify => "PostHTTPListenerModify",
            Self::PostTranslateModify => "PostTranslateModify",
        }
    }

    pub fn from_method_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|hook| hook.method_name() == name)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// What a hook processor can see while handling one call.
pub struct HookContext<'a> {
    pub call: &'a CallContext,
    /// Endpoint path, standalone flag and receive limit of this adapter.
    pub config: &'a AdapterConfig,
    pub store: &'a dyn ConfigStore,
}

/// Performs the extension-specific rewrite for a hook call.
///
/// `request` is the host's request envelope; the returned envelope is sent
/// back unchanged. Build it with [`crate::to_envelope`].
pub trait HookProcessor: Send + Sync {
    fn process(
        &self,
        ctx: &HookContext<'_>,
        hook: HookKind,
        request: Envelope,
    ) -> Result<Envelope, Status>;
}

/// Answers every hook with `Unimplemented`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedHooks;

impl HookProcessor for UnimplementedHooks {
    fn process(
        &self,
        _ctx: &HookContext<'_>,
        hook: HookKind,
        _request: Envelope,
    ) -> Result<Envelope, Status> {
        Err(Status::unimplemented(format!("{hook} is not implemented")))
    }
}
