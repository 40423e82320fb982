//! WebSocket message dispatch: decodes an inbound frame and, for a valid
//! `SIMULATE_TRAFFIC` request, computes the routing decision.

use geodns_core::{DecodeError, IgnoreReason, Inbound, RoutingDecision, decode_inbound, route};
use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::metrics::{
    MESSAGES_IGNORED_TOTAL, MESSAGES_REJECTED_TOTAL, ROUTING_DECISIONS_TOTAL, ROUTING_DISTANCE_KM,
};

/// What one inbound frame produced.
#[derive(Debug)]
pub enum MessageOutcome {
    /// A decision to broadcast.
    Routed(RoutingDecision),
    /// Well-formed, but nothing to route.
    Ignored(IgnoreReason),
    /// Could not be decoded; the session skips it.
    Rejected(DecodeError),
}

/// Handle an incoming text frame.
///
/// Never fails: every frame maps to exactly one [`MessageOutcome`].
pub fn handle_message(text: &str) -> MessageOutcome {
    let payload = match decode_inbound(text) {
        Ok(Inbound::SimulateTraffic(payload)) => payload,
        Ok(Inbound::Unrecognized(kind)) => {
            debug!(kind = kind.as_deref().unwrap_or("<none>"), "ignoring unrecognized message type");
            return ignored(IgnoreReason::UnrecognizedType);
        }
        Err(error) => {
            warn!(%error, len = text.len(), "skipping malformed message");
            counter!(MESSAGES_REJECTED_TOTAL).increment(1);
            return MessageOutcome::Rejected(error);
        }
    };

    let request = match payload.into_request() {
        Ok(request) => request,
        Err(reason) => {
            debug!(%reason, "ignoring incomplete SIMULATE_TRAFFIC");
            return ignored(reason);
        }
    };

    let candidates = request.nodes.len();
    let Some(decision) = route(request) else {
        return ignored(IgnoreReason::EmptyNodes);
    };

    debug!(
        node_id = decision.node.id().unwrap_or("<none>"),
        distance_km = decision.distance_km,
        candidates,
        "routed user to nearest node"
    );
    counter!(ROUTING_DECISIONS_TOTAL).increment(1);
    histogram!(ROUTING_DISTANCE_KM).record(decision.distance_km);
    MessageOutcome::Routed(decision)
}

fn ignored(reason: IgnoreReason) -> MessageOutcome {
    counter!(MESSAGES_IGNORED_TOTAL, "reason" => reason.as_str()).increment(1);
    MessageOutcome::Ignored(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn routes_valid_request() {
        let text = r#"{"type":"SIMULATE_TRAFFIC","user":{"id":"u1","lat":40.7,"lng":-74.0},"nodes":[{"id":"A","lat":40.7,"lng":-74.1},{"id":"B","lat":51.5,"lng":-0.12}]}"#;
        assert_matches!(handle_message(text), MessageOutcome::Routed(decision) => {
            assert_eq!(decision.node.id(), Some("A"));
            assert_eq!(decision.user.id(), Some("u1"));
            assert_eq!(decision.distance_km, 8.43);
        });
    }

    #[test]
    fn rejects_invalid_json() {
        assert_matches!(
            handle_message("{not json"),
            MessageOutcome::Rejected(DecodeError::Json(_))
        );
    }

    #[test]
    fn rejects_non_object() {
        assert_matches!(
            handle_message(r#""SIMULATE_TRAFFIC""#),
            MessageOutcome::Rejected(DecodeError::NotAnObject("string"))
        );
    }

    #[test]
    fn rejects_node_without_coordinates() {
        let text = r#"{"type":"SIMULATE_TRAFFIC","user":{"lat":0,"lng":0},"nodes":[{"id":"A","lat":1}]}"#;
        assert_matches!(
            handle_message(text),
            MessageOutcome::Rejected(DecodeError::InvalidPayload(_))
        );
    }

    #[test]
    fn ignores_unknown_type() {
        assert_matches!(
            handle_message(r#"{"type":"HELLO"}"#),
            MessageOutcome::Ignored(IgnoreReason::UnrecognizedType)
        );
    }

    #[test]
    fn ignores_empty_nodes() {
        let text = r#"{"type":"SIMULATE_TRAFFIC","user":{"lat":0,"lng":0},"nodes":[]}"#;
        assert_matches!(
            handle_message(text),
            MessageOutcome::Ignored(IgnoreReason::EmptyNodes)
        );
    }

    #[test]
    fn ignores_missing_user() {
        let text = r#"{"type":"SIMULATE_TRAFFIC","nodes":[{"lat":0,"lng":0}]}"#;
        assert_matches!(
            handle_message(text),
            MessageOutcome::Ignored(IgnoreReason::MissingUser)
        );
    }

    #[test]
    fn ignores_missing_nodes() {
        let text = r#"{"type":"SIMULATE_TRAFFIC","user":{"lat":0,"lng":0}}"#;
        assert_matches!(
            handle_message(text),
            MessageOutcome::Ignored(IgnoreReason::MissingNodes)
        );
    }
}
