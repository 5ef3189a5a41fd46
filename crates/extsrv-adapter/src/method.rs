//! Method paths.

use std::fmt;
use std::str::FromStr;

use crate::hook::HookKind;

/// Service name of the health protocol.
pub const HEALTH_SERVICE: &str = "grpc.health.v1.Health";

/// Service name of the extension hooks.
pub const EXTENSION_SERVICE: &str = "envoygateway.extension.EnvoyGatewayExtension";

/// Every method the adapter routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    HealthCheck,
    HealthWatch,
    HealthList,
    Hook(HookKind),
}

impl Method {
    fn service_and_name(self) -> (&'static str, &'static str) {
        match self {
            Self::HealthCheck => (HEALTH_SERVICE, "Check"),
            Self::HealthWatch => (HEALTH_SERVICE, "Watch"),
            Self::HealthList => (HEALTH_SERVICE, "List"),
            Self::Hook(hook) => (EXTENSION_SERVICE, hook.method_name()),
        }
    }

    /// `/<service>/<method>`.
    pub fn path(self) -> String {
        let (service, name) = self.service_and_name();
        format!("/{service}/{name}")
    }

    /// Whether the method answers with stream items before its reply.
    pub fn is_streaming(self) -> bool {
        matches!(self, Self::HealthWatch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (service, name) = self.service_and_name();
        write!(f, "/{service}/{name}")
    }
}

/// The path did not name a known method.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown method {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownMethod(path.to_string());
        let (service, name) = path
            .strip_prefix('/')
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(unknown)?;

        match (service, name) {
            (HEALTH_SERVICE, "Check") => Ok(Self::HealthCheck),
            (HEALTH_SERVICE, "Watch") => Ok(Self::HealthWatch),
            (HEALTH_SERVICE, "List") => Ok(Self::HealthList),
            (EXTENSION_SERVICE, name) => HookKind::from_method_name(name)
                .map(Self::Hook)
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_parse_back() {
        let mut methods = vec![Method::HealthCheck, Method::HealthWatch, Method::HealthList];
        methods.extend(HookKind::ALL.map(Method::Hook));
        for method in methods {
            assert_eq!(method.path().parse::<Method>(), Ok(method));
        }
    }

    #[test]
    fn well_known_paths() {
        assert_eq!(Method::HealthCheck.path(), "/grpc.health.v1.Health/Check");
        assert_eq!(
            Method::Hook(HookKind::PostRouteModify).to_string(),
            "/envoygateway.extension.EnvoyGatewayExtension/PostRouteModify"
        );
    }

    #[test]
    fn rejects_unknown_paths() {
        for path in [
            "",
            "Check",
            "/grpc.health.v1.Health/Inspect",
            "/other.Service/Check",
            "/envoygateway.extension.EnvoyGatewayExtension/PostClusterModify",
        ] {
            assert_eq!(path.parse::<Method>(), Err(UnknownMethod(path.to_string())));
        }
    }

    #[test]
    fn only_watch_streams() {
        assert!(Method::HealthWatch.is_streaming());
        assert!(!Method::HealthCheck.is_streaming());
        assert!(!Method::Hook(HookKind::PostTranslateModify).is_streaming());
    }
}
