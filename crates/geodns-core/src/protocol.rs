//! Wire protocol: inbound decoding and the outbound envelope.
//!
//! Inbound frames are JSON objects discriminated by a `type` string. Only
//! `SIMULATE_TRAFFIC` carries meaning; every other type is reported as
//! [`Inbound::Unrecognized`] so callers can ignore it explicitly.
//!
//! Decoding is two-stage:
//! 1. [`decode_inbound`] checks structure and yields a typed payload or a
//!    [`DecodeError`].
//! 2. [`TrafficPayload::into_request`] enforces the required fields and
//!    yields a [`RoutingRequest`] or an [`IgnoreReason`]. Missing fields are
//!    not errors: the protocol silently skips such messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::node::{Node, User};
use crate::routing::RoutingDecision;

/// `type` value of a routing request.
pub const SIMULATE_TRAFFIC: &str = "SIMULATE_TRAFFIC";

/// `type` value of a routing decision.
pub const ROUTING_DECISION: &str = "ROUTING_DECISION";

/// A frame that could not be decoded at all.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
    /// Valid JSON, but not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    /// A `SIMULATE_TRAFFIC` payload with wrongly shaped fields
    /// (e.g. a node without `lat`).
    #[error("malformed SIMULATE_TRAFFIC payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

/// Why a structurally valid frame produced no decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// `type` absent or not a known request type.
    UnrecognizedType,
    /// `nodes` absent or `null`.
    MissingNodes,
    /// `nodes` present but empty.
    EmptyNodes,
    /// `user` absent or `null`.
    MissingUser,
}

impl IgnoreReason {
    /// Short label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnrecognizedType => "unrecognized_type",
            Self::MissingNodes => "missing_nodes",
            Self::EmptyNodes => "empty_nodes",
            Self::MissingUser => "missing_user",
        }
    }
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded inbound frame.
#[derive(Debug)]
pub enum Inbound {
    /// A `SIMULATE_TRAFFIC` request; fields not yet checked for presence.
    SimulateTraffic(TrafficPayload),
    /// Any other `type` (or none). Carries the type string when present.
    Unrecognized(Option<String>),
}

/// Body of a `SIMULATE_TRAFFIC` frame before required-field checks.
#[derive(Debug, Default, Deserialize)]
pub struct TrafficPayload {
    /// Candidate nodes.
    #[serde(default)]
    pub nodes: Option<Vec<Node>>,
    /// The user to route.
    #[serde(default)]
    pub user: Option<User>,
}

/// A validated request: at least one node and a user.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutingRequest {
    /// Candidate nodes, in client order. Never empty.
    pub nodes: Vec<Node>,
    /// The user to route.
    pub user: User,
}

impl TrafficPayload {
    /// Enforce the required fields.
    pub fn into_request(self) -> Result<RoutingRequest, IgnoreReason> {
        let nodes = self.nodes.ok_or(IgnoreReason::MissingNodes)?;
        if nodes.is_empty() {
            return Err(IgnoreReason::EmptyNodes);
        }
        let user = self.user.ok_or(IgnoreReason::MissingUser)?;
        Ok(RoutingRequest { nodes, user })
    }
}

/// Decode one inbound text frame.
pub fn decode_inbound(text: &str) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Json)?;
    let object = match value {
        Value::Object(object) => object,
        other => return Err(DecodeError::NotAnObject(json_kind(&other))),
    };

    let kind = object.get("type").and_then(Value::as_str).map(str::to_owned);
    match kind.as_deref() {
        Some(SIMULATE_TRAFFIC) => {
            let payload = serde_json::from_value(Value::Object(object))
                .map_err(DecodeError::InvalidPayload)?;
            Ok(Inbound::SimulateTraffic(payload))
        }
        _ => Ok(Inbound::Unrecognized(kind)),
    }
}

/// Messages the server pushes to clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// A node was selected for a user.
    #[serde(rename = "ROUTING_DECISION")]
    RoutingDecision(RoutingDecision),
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
