//! Wire types for the remote feature-service query protocol.
//!
//! The service speaks the ArcGIS REST dialect: GET `{base}{layer}/query`
//! with a JSON envelope geometry and one of three result shapes (count,
//! object ids, or full features with geometry).

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Spatial relationship applied to every query.
pub const SPATIAL_REL: &str = "esriSpatialRelIntersects";
/// Geometry type of the viewport filter.
pub const GEOMETRY_TYPE: &str = "esriGeometryEnvelope";
/// Spatial reference the viewport envelope is expressed in (Web Mercator
/// auxiliary sphere).
pub const IN_SR: u32 = 102100;
/// Spatial reference requested for returned geometry.
pub const OUT_SR: u32 = 3857;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

/// Viewport bounding box in the host's projected spatial reference.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub spatial_reference: SpatialReference,
}

impl Envelope {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            spatial_reference: SpatialReference { wkid: IN_SR },
        }
    }
}

/// Body of a `returnIdsOnly=true` response.
///
/// Some servers answer an empty extent with `"objectIds": null` rather than
/// an empty array; both deserialize to an empty id list.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectIdsResponse {
    #[serde(default)]
    pub object_id_field_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub object_ids: Vec<i64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let ids: Option<Vec<i64>> = Option::deserialize(deserializer)?;
    Ok(ids.unwrap_or_default())
}

/// Body of a full paged query response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FeaturesResponse {
    #[serde(default)]
    pub features: Vec<RawFeature>,
}

/// One raw feature record: attribute bag plus polyline geometry.
#[derive(Clone, Debug, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub geometry: Option<RawGeometry>,
}

/// Polyline geometry: one or more paths of `[x, y]` vertices.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawGeometry {
    #[serde(default)]
    pub paths: Vec<Vec<[f64; 2]>>,
}

/// The service reports failures inside a 200 body; the presence of this
/// object makes the response a parse-level failure.
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
