//! Feature-to-geometry transformer: raw feature records become styled
//! [`RoadVector`]s.

use roadlens_protocol::RawFeature;
use roadlens_protocol::RoadVector;
use tracing::debug;

use crate::planner::FetchContext;

/// Maps one raw feature to zero or more renderable vectors. A feature with
/// N geometry paths yields N vectors sharing one attribute set; features
/// whose road type cannot be classified are skipped.
pub fn to_vectors(raw: &RawFeature, ctx: &FetchContext<'_>) -> Vec<RoadVector> {
    let field = ctx.layer.road_type_field;
    let Some(code) = raw.attributes.get(field).and_then(|value| value.as_i64()) else {
        debug!(partition = ctx.partition.code, field, "feature missing road-type code");
        return Vec::new();
    };
    let Some(road_type) = ctx.partition.classification.classify(code) else {
        debug!(
            partition = ctx.partition.code,
            code, "unclassifiable road-type code"
        );
        return Vec::new();
    };

    // Local streets are dropped when the partition excludes them or the
    // user turned street highlighting off.
    if road_type.is_lowest_priority() && (ctx.partition.hide_streets || !ctx.highlight_streets) {
        return Vec::new();
    }

    let Some(geometry) = raw.geometry.as_ref() else {
        return Vec::new();
    };

    let color = ctx.partition.color_for(road_type).to_string();
    let z_index = road_type.z_index();
    geometry
        .paths
        .iter()
        .filter(|path| path.len() >= 2)
        .map(|path| RoadVector {
            partition: ctx.partition.code.to_string(),
            layer_id: ctx.layer.id,
            road_type,
            path: path.clone(),
            attributes: raw.attributes.clone(),
            color: color.clone(),
            z_index,
        })
        .collect()
}
