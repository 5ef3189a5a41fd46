//! Protobuf messages carried on the wire.
//!
//! Health messages are field-compatible with `grpc.health.v1`. `Call` and
//! `Reply` frame every request and answer; `Reply` mirrors the shape of
//! `google.rpc.Status` with a single optional detail.

use std::collections::BTreeMap;

use prost::Name;

use crate::envelope::Envelope;
use crate::health::HealthStatus;
use crate::status::{Code, Status};

const HEALTH_PACKAGE: &str = "grpc.health.v1";
const WIRE_PACKAGE: &str = "extsrv.wire.v1";

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthCheckRequest {
    #[prost(string, tag = "1")]
    pub service: String,
}

impl HealthCheckRequest {
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Name for HealthCheckRequest {
    const NAME: &'static str = "HealthCheckRequest";
    const PACKAGE: &'static str = HEALTH_PACKAGE;
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthCheckResponse {
    #[prost(enumeration = "HealthStatus", tag = "1")]
    pub status: i32,
}

impl HealthCheckResponse {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status: status as i32,
        }
    }
}

impl Name for HealthCheckResponse {
    const NAME: &'static str = "HealthCheckResponse";
    const PACKAGE: &'static str = HEALTH_PACKAGE;
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthListRequest {}

impl Name for HealthListRequest {
    const NAME: &'static str = "HealthListRequest";
    const PACKAGE: &'static str = HEALTH_PACKAGE;
}

/// Ordered map so the encoding is deterministic.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthListResponse {
    #[prost(btree_map = "string, message", tag = "1")]
    pub statuses: BTreeMap<String, HealthCheckResponse>,
}

impl Name for HealthListResponse {
    const NAME: &'static str = "HealthListResponse";
    const PACKAGE: &'static str = HEALTH_PACKAGE;
}

/// One call: the method path and its request envelope.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Call {
    #[prost(string, tag = "1")]
    pub method: String,
    #[prost(message, optional, tag = "2")]
    pub body: Option<Envelope>,
}

impl Name for Call {
    const NAME: &'static str = "Call";
    const PACKAGE: &'static str = WIRE_PACKAGE;
}

/// Terminal answer to a call.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Reply {
    #[prost(enumeration = "Code", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, optional, tag = "3")]
    pub body: Option<Envelope>,
}

impl Name for Reply {
    const NAME: &'static str = "Reply";
    const PACKAGE: &'static str = WIRE_PACKAGE;
}

impl Reply {
    /// Successful answer, optionally carrying a response envelope.
    pub fn ok(body: Option<Envelope>) -> Self {
        Self {
            code: Code::Ok as i32,
            message: String::new(),
            body,
        }
    }

    /// Split into the response envelope or the failure status.
    pub fn into_result(self) -> Result<Option<Envelope>, Status> {
        match Code::from_wire(self.code) {
            Code::Ok => Ok(self.body),
            code => Err(Status::new(code, self.message)),
        }
    }
}

impl From<Status> for Reply {
    fn from(status: Status) -> Self {
        Self {
            code: status.code() as i32,
            message: status.message().to_string(),
            body: None,
        }
    }
}

impl From<Result<Option<Envelope>, Status>> for Reply {
    fn from(result: Result<Option<Envelope>, Status>) -> Self {
        match result {
            Ok(body) => Self::ok(body),
            Err(status) => status.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn full_names_follow_grpc_health() {
        assert_eq!(HealthCheckRequest::full_name(), "grpc.health.v1.HealthCheckRequest");
        assert_eq!(HealthListResponse::full_name(), "grpc.health.v1.HealthListResponse");
        assert_eq!(Reply::full_name(), "extsrv.wire.v1.Reply");
    }

    #[test]
    fn serving_response_encodes_like_grpc() {
        // field 1, varint, SERVING = 1
        assert_eq!(
            HealthCheckResponse::new(HealthStatus::Serving).encode_to_vec(),
            vec![0x08, 0x01]
        );
    }

    #[test]
    fn status_accessor_decodes_enum() {
        let response = HealthCheckResponse::new(HealthStatus::NotServing);
        assert_eq!(response.status(), HealthStatus::NotServing);
    }

    #[test]
    fn reply_round_trips_status() {
        let reply = Reply::from(Status::unimplemented("Watch is not implemented"));
        assert_eq!(reply.code(), Code::Unimplemented);

        let status = reply.into_result().unwrap_err();
        assert_eq!(status.code(), Code::Unimplemented);
        assert_eq!(status.message(), "Watch is not implemented");
    }

    #[test]
    fn ok_reply_yields_body() {
        let body = Envelope {
            type_url: "type.googleapis.com/x.Y".to_string(),
            value: vec![1, 2, 3],
        };
        let reply = Reply::ok(Some(body.clone()));
        assert_eq!(reply.into_result().unwrap(), Some(body));
    }
}
