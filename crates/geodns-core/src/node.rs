//! Client-supplied located objects (nodes and users).
//!
//! Clients attach arbitrary fields (`id`, `name`, `type`, ...) to every node
//! and user they send. The router only reads `lat`/`lng` and must echo the
//! object back untouched, so [`Located`] keeps the original JSON object next
//! to the decoded coordinates.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geo::GeoPoint;

/// Why a JSON object could not be read as a [`Located`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LocatedError {
    /// A coordinate field is absent.
    #[error("missing coordinate field `{0}`")]
    MissingField(&'static str),
    /// A coordinate field is present but not a number.
    #[error("coordinate field `{0}` is not a number")]
    NotANumber(&'static str),
}

/// A JSON object that carries at least numeric `lat` and `lng`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Located {
    point: GeoPoint,
    fields: Map<String, Value>,
}

/// A candidate server node.
pub type Node = Located;

/// The user whose traffic is being routed.
pub type User = Located;

impl Located {
    /// Decoded coordinates.
    pub fn point(&self) -> GeoPoint {
        self.point
    }

    /// The full object as the client sent it, coordinates included.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Convenience accessor for a string `id` field, if any.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }
}

impl TryFrom<Map<String, Value>> for Located {
    type Error = LocatedError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let lat = coordinate(&fields, "lat")?;
        let lng = coordinate(&fields, "lng")?;
        Ok(Self {
            point: GeoPoint::new(lat, lng),
            fields,
        })
    }
}

impl From<GeoPoint> for Located {
    fn from(point: GeoPoint) -> Self {
        let mut fields = Map::new();
        let _ = fields.insert("lat".into(), Value::from(point.lat));
        let _ = fields.insert("lng".into(), Value::from(point.lng));
        Self { point, fields }
    }
}

impl Serialize for Located {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

fn coordinate(fields: &Map<String, Value>, key: &'static str) -> Result<f64, LocatedError> {
    fields
        .get(key)
        .ok_or(LocatedError::MissingField(key))?
        .as_f64()
        .ok_or(LocatedError::NotANumber(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_coordinates_and_keeps_extras() {
        let node: Node = serde_json::from_value(json!({
            "id": "edge-ashburn",
            "name": "Ashburn, VA",
            "lat": 39.0438,
            "lng": -77.4874,
            "type": "edge"
        }))
        .unwrap();
        assert_eq!(node.point(), GeoPoint::new(39.0438, -77.4874));
        assert_eq!(node.id(), Some("edge-ashburn"));
        assert_eq!(node.fields()["type"], "edge");
    }

    #[test]
    fn serializes_back_verbatim() {
        let original = json!({
            "id": "A",
            "lat": 40,
            "lng": -74.1,
            "meta": {"tier": 2, "tags": ["x", "y"]}
        });
        let node: Node = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&node).unwrap(), original);
    }

    #[test]
    fn integer_coordinates_accepted() {
        let user: User = serde_json::from_value(json!({"lat": 0, "lng": 90})).unwrap();
        assert_eq!(user.point(), GeoPoint::new(0.0, 90.0));
    }

    #[test]
    fn missing_lat_rejected() {
        let err = serde_json::from_value::<Node>(json!({"lng": 1.0})).unwrap_err();
        assert!(err.to_string().contains("missing coordinate field `lat`"), "{err}");
    }

    #[test]
    fn non_numeric_lng_rejected() {
        let err = serde_json::from_value::<Node>(json!({"lat": 1.0, "lng": "west"})).unwrap_err();
        assert!(err.to_string().contains("`lng` is not a number"), "{err}");
    }

    #[test]
    fn non_object_rejected() {
        assert!(serde_json::from_value::<Node>(json!([1.0, 2.0])).is_err());
        assert!(serde_json::from_value::<Node>(json!(null)).is_err());
    }

    #[test]
    fn from_geo_point() {
        let located = Located::from(GeoPoint::new(1.5, -2.5));
        assert_eq!(
            serde_json::to_value(&located).unwrap(),
            json!({"lat": 1.5, "lng": -2.5})
        );
        assert!(located.id().is_none());
    }

    #[test]
    fn located_error_display() {
        assert_eq!(
            LocatedError::MissingField("lat").to_string(),
            "missing coordinate field `lat`"
        );
        assert_eq!(
            LocatedError::NotANumber("lng").to_string(),
            "coordinate field `lng` is not a number"
        );
    }
}
