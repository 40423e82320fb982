//! # geodns-core
//!
//! Foundation types and pure logic for the Geo-DNS router.
//!
//! - **Geometry**: [`GeoPoint`] and the haversine [`distance_km`]
//! - **Located payloads**: [`Located`] keeps client JSON verbatim next to its coordinates
//! - **Routing**: [`nearest`] node selection and [`route`] to build a [`RoutingDecision`]
//! - **Protocol**: typed decoding of inbound frames into [`Inbound`] and the
//!   outbound [`OutboundMessage`] envelope
//!
//! Nothing in this crate performs I/O.

#![deny(unsafe_code)]

pub mod geo;
pub mod node;
pub mod protocol;
pub mod routing;

pub use geo::{EARTH_RADIUS_KM, GeoPoint, distance_km, round_km};
pub use node::{Located, LocatedError, Node, User};
pub use protocol::{
    DecodeError, IgnoreReason, Inbound, OutboundMessage, RoutingRequest, TrafficPayload,
    decode_inbound,
};
pub use routing::{RoutingDecision, nearest, route};
