//! Canonical road-type taxonomy and the rendered vector unit.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Road classification used for styling. Variants are ordered by display
/// priority; stacking order is derived from [`GLOBAL_ROAD_TYPE_ORDER`], not
/// from the enum discriminant.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum RoadType {
    Street,
    UnpavedStreet,
    Offroad,
    PrimaryStreet,
    MinorHighway,
    MajorHighway,
    Freeway,
    Ramp,
}

/// Global stacking order: earlier entries render underneath later ones.
pub const GLOBAL_ROAD_TYPE_ORDER: [RoadType; 8] = [
    RoadType::Street,
    RoadType::UnpavedStreet,
    RoadType::Offroad,
    RoadType::PrimaryStreet,
    RoadType::MinorHighway,
    RoadType::MajorHighway,
    RoadType::Ramp,
    RoadType::Freeway,
];

impl RoadType {
    /// Short code used in partition config tables and display.
    pub fn code(self) -> &'static str {
        match self {
            RoadType::Street => "St",
            RoadType::UnpavedStreet => "StUp",
            RoadType::Offroad => "OR",
            RoadType::PrimaryStreet => "PS",
            RoadType::MinorHighway => "mH",
            RoadType::MajorHighway => "MH",
            RoadType::Freeway => "Fw",
            RoadType::Ramp => "Rmp",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        GLOBAL_ROAD_TYPE_ORDER
            .into_iter()
            .find(|road_type| road_type.code() == code)
    }

    /// Z-stacking value: position in the global order times 100, leaving
    /// room for per-layer nudges in between.
    pub fn z_index(self) -> i32 {
        let position = GLOBAL_ROAD_TYPE_ORDER
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or_default();
        (position as i32) * 100
    }

    /// The lowest-priority type, hidden when the user disables local
    /// street highlighting.
    pub fn is_lowest_priority(self) -> bool {
        self == RoadType::Street
    }
}

/// Stroke width in pixels at a given zoom level. Recomputed from the live
/// zoom on every redraw; never cached per vector.
pub fn segment_width(zoom: u32) -> f64 {
    12.0 * 1.15_f64.powi(zoom as i32 - 13)
}

/// One renderable line string with resolved styling. A raw feature with N
/// geometry paths produces N vectors sharing one attribute set.
#[derive(Clone, Debug)]
pub struct RoadVector {
    pub partition: String,
    pub layer_id: u32,
    pub road_type: RoadType,
    pub path: Vec<[f64; 2]>,
    pub attributes: Map<String, Value>,
    pub color: String,
    pub z_index: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_at_reference_zoom_is_twelve() {
        assert_eq!(segment_width(13), 12.0);
    }

    #[test]
    fn width_grows_fifteen_percent_per_zoom() {
        assert_eq!(segment_width(14), 12.0 * 1.15);
        assert!((segment_width(16) - 12.0 * 1.15_f64.powi(3)).abs() < 1e-12);
    }

    #[test]
    fn z_index_follows_global_order() {
        assert_eq!(RoadType::Street.z_index(), 0);
        assert_eq!(RoadType::Offroad.z_index(), 200);
        assert_eq!(RoadType::Freeway.z_index(), 700);
    }

    #[test]
    fn codes_round_trip() {
        for road_type in GLOBAL_ROAD_TYPE_ORDER {
            assert_eq!(RoadType::from_code(road_type.code()), Some(road_type));
        }
        assert_eq!(RoadType::from_code("??"), None);
    }
}
