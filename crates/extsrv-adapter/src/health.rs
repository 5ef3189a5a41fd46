//! Health sub-protocol.

use std::fmt;

use crate::context::CallContext;
use crate::proto::{HealthCheckRequest, HealthCheckResponse, HealthListRequest, HealthListResponse};
use crate::status::Status;

/// Serving state of a service. Wire values match `grpc.health.v1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum HealthStatus {
    Unknown = 0,
    Serving = 1,
    NotServing = 2,
}

impl HealthStatus {
    /// Upper-case name as used by `grpc.health.v1`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Serving => "SERVING",
            Self::NotServing => "NOT_SERVING",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives the updates of a streaming `Watch`.
pub trait WatchSink {
    fn send(&mut self, update: HealthCheckResponse) -> Result<(), Status>;
}

/// The three-operation health contract.
pub trait HealthService {
    /// Current status of `request.service`.
    fn check(
        &self,
        ctx: &CallContext,
        request: &HealthCheckRequest,
    ) -> Result<HealthCheckResponse, Status>;

    /// Stream status changes of `request.service` into `updates`.
    fn watch(
        &self,
        ctx: &CallContext,
        request: &HealthCheckRequest,
        updates: &mut dyn WatchSink,
    ) -> Result<(), Status>;

    /// Status of every service this server knows about.
    fn list(
        &self,
        ctx: &CallContext,
        request: &HealthListRequest,
    ) -> Result<HealthListResponse, Status>;
}

/// Source of the status reported for a service name.
///
/// This is where real readiness signals (store reachability, hook processor
/// warm-up) plug in. The adapter consults it for every `Check` and `List`.
pub trait Readiness: Send + Sync {
    fn status(&self, service: &str) -> HealthStatus;
}

/// Reports [`HealthStatus::Serving`] for every service name.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysServing;

impl Readiness for AlwaysServing {
    fn status(&self, _service: &str) -> HealthStatus {
        HealthStatus::Serving
    }
}

impl<F> Readiness for F
where
    F: Fn(&str) -> HealthStatus + Send + Sync,
{
    fn status(&self, service: &str) -> HealthStatus {
        self(service)
    }
}
