//! Nearest-node selection.

use serde::Serialize;

use crate::geo::{GeoPoint, distance_km, round_km};
use crate::node::{Node, User};
use crate::protocol::RoutingRequest;

/// The node chosen for a user, ready to be broadcast.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoutingDecision {
    /// The user object as submitted.
    pub user: User,
    /// The selected node as submitted.
    pub node: Node,
    /// Great-circle distance, rounded to two decimals.
    pub distance_km: f64,
}

/// Find the node closest to `user`.
///
/// Scans in input order with a strict `<`, so the first of several
/// equidistant nodes wins. Returns `None` only for an empty slice.
pub fn nearest(user: GeoPoint, nodes: &[Node]) -> Option<(&Node, f64)> {
    let mut best: Option<(&Node, f64)> = None;
    let mut min_distance = f64::INFINITY;
    for node in nodes {
        let d = distance_km(user, node.point());
        if d < min_distance {
            min_distance = d;
            best = Some((node, d));
        }
    }
    best
}

/// Resolve a validated request into a decision.
pub fn route(request: RoutingRequest) -> Option<RoutingDecision> {
    let (node, distance) = nearest(request.user.point(), &request.nodes)?;
    let node = node.clone();
    Some(RoutingDecision {
        user: request.user,
        node,
        distance_km: round_km(distance),
    })
}
