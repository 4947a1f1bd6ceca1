//! Static partition registry: one entry per supported state, loaded once at
//! startup and read-only thereafter.

use std::collections::HashMap;

use roadlens_protocol::RoadType;

/// Zoom level the simplification table starts at; `max_allowable_offset`
/// indexes the table with `zoom - OFFSET_TABLE_BASE_ZOOM`.
pub const OFFSET_TABLE_BASE_ZOOM: u32 = 12;

/// One queryable feature collection within a partition's remote service.
#[derive(Clone, Debug)]
pub struct Layer {
    pub id: u32,
    /// Attribute field holding the raw road-type code.
    pub road_type_field: &'static str,
    /// Attribute field holding the stable feature identifier.
    pub object_id_field: &'static str,
    /// Fields requested on paged queries.
    pub out_fields: &'static [&'static str],
    /// Server-side cap on records per request.
    pub max_page_size: usize,
    /// When false the layer is fetched as a single unpaged query.
    pub supports_pagination: bool,
}

/// How a partition maps its raw road-type attribute to the canonical
/// taxonomy.
#[derive(Clone, Debug)]
pub enum ClassificationRule {
    /// Raw code maps directly to a road type.
    DirectLookup(HashMap<i64, RoadType>),
    /// Raw code is first collapsed into a small canonical code set by
    /// inclusive upper-bound buckets, then mapped through `mapping`. Values
    /// above every bucket take `fallback`.
    ThresholdBucket {
        /// `(upper_bound_inclusive, canonical_code)`, ascending by bound.
        buckets: Vec<(i64, i64)>,
        fallback: i64,
        mapping: HashMap<i64, RoadType>,
    },
}

impl ClassificationRule {
    pub fn classify(&self, raw: i64) -> Option<RoadType> {
        match self {
            ClassificationRule::DirectLookup(mapping) => mapping.get(&raw).copied(),
            ClassificationRule::ThresholdBucket {
                buckets,
                fallback,
                mapping,
            } => {
                let code = buckets
                    .iter()
                    .find(|(bound, _)| raw <= *bound)
                    .map(|(_, code)| *code)
                    .unwrap_or(*fallback);
                mapping.get(&code).copied()
            }
        }
    }
}

/// Partition-level `where` clause, combined (AND) with the planner's
/// id-range clause.
#[derive(Clone, Debug)]
pub enum FilterRule {
    None,
    /// Applied at every zoom.
    Static(&'static str),
    /// Applied only while zoomed out past `below_zoom`, e.g. to drop minor
    /// classifications that would flood the viewport.
    HideMinorBelowZoom {
        below_zoom: u32,
        clause: &'static str,
    },
}

impl FilterRule {
    pub fn clause(&self, zoom: u32) -> Option<&'static str> {
        match self {
            FilterRule::None => None,
            FilterRule::Static(clause) => Some(clause),
            FilterRule::HideMinorBelowZoom { below_zoom, clause } => {
                (zoom < *below_zoom).then_some(*clause)
            }
        }
    }
}

/// Who may see a partition's overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Everyone,
    MinRank(u32),
}

impl Permission {
    pub fn allows(self, rank: u32) -> bool {
        match self {
            Permission::Everyone => true,
            Permission::MinRank(min) => rank >= min,
        }
    }
}

/// One geographic partition: endpoint, layers, classification and styling.
#[derive(Clone, Debug)]
pub struct Partition {
    /// State abbreviation, the partition's identity.
    pub code: &'static str,
    pub base_url: String,
    pub layers: Vec<Layer>,
    pub classification: ClassificationRule,
    pub colors: HashMap<RoadType, &'static str>,
    /// Geometry simplification per zoom, indexed from
    /// [`OFFSET_TABLE_BASE_ZOOM`]; zoom outside the table omits the
    /// parameter.
    pub max_allowable_offsets: &'static [f64],
    pub filter: FilterRule,
    pub permission: Permission,
    /// Drop local streets from this partition entirely.
    pub hide_streets: bool,
}

impl Partition {
    pub fn max_allowable_offset(&self, zoom: u32) -> Option<f64> {
        let index = zoom.checked_sub(OFFSET_TABLE_BASE_ZOOM)? as usize;
        self.max_allowable_offsets.get(index).copied()
    }

    pub fn color_for(&self, road_type: RoadType) -> &'static str {
        self.colors.get(&road_type).copied().unwrap_or("#ffffff")
    }
}

/// Matches-everything value for the single-partition settings filter.
pub const FILTER_ALL: &str = "ALL";

pub struct PartitionRegistry {
    partitions: Vec<Partition>,
}

impl PartitionRegistry {
    /// The fixed partition set. Defined at startup, read-only thereafter.
    pub fn builtin() -> Self {
        Self {
            partitions: vec![kentucky(), ohio(), indiana()],
        }
    }

    /// Registry over an explicit partition set; used by embedders that
    /// point the engine at their own services.
    pub fn with_partitions(partitions: Vec<Partition>) -> Self {
        Self { partitions }
    }

    pub fn partition(&self, code: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.code == code)
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// A partition is visible iff it exists, its permission predicate
    /// passes, and it matches the optional single-partition filter
    /// (`None` or `"ALL"` match everything).
    pub fn is_visible(&self, code: &str, filter: Option<&str>, rank: u32) -> bool {
        let Some(partition) = self.partition(code) else {
            return false;
        };
        partition.permission.allows(rank) && filter_matches(filter, code)
    }

    pub fn visible_partitions(&self, filter: Option<&str>, rank: u32) -> Vec<&Partition> {
        self.partitions
            .iter()
            .filter(|p| p.permission.allows(rank) && filter_matches(filter, p.code))
            .collect()
    }
}

fn filter_matches(filter: Option<&str>, code: &str) -> bool {
    match filter {
        None => true,
        Some(value) => value == FILTER_ALL || value == code,
    }
}

fn kentucky() -> Partition {
    // KYTC publishes surface type rather than functional class; the raw
    // code is bucketed into offroad / unpaved / paved street.
    Partition {
        code: "KY",
        base_url: "https://maps.kytc.ky.gov/arcgis/rest/services/BaseMap/RoadCenterlines/MapServer/".to_string(),
        layers: vec![Layer {
            id: 0,
            road_type_field: "SURFACE_TYPE_CD",
            object_id_field: "OBJECTID",
            out_fields: &["OBJECTID", "SURFACE_TYPE_CD", "RD_NAME"],
            max_page_size: 1000,
            supports_pagination: true,
        }],
        classification: ClassificationRule::ThresholdBucket {
            buckets: vec![(1, 1), (5, 3)],
            fallback: 6,
            mapping: HashMap::from([
                (1, RoadType::Offroad),
                (3, RoadType::UnpavedStreet),
                (6, RoadType::Street),
            ]),
        },
        colors: HashMap::from([
            (RoadType::Offroad, "#00ffb3"),
            (RoadType::UnpavedStreet, "#c57f2c"),
            (RoadType::Street, "#eeeeee"),
        ]),
        max_allowable_offsets: &[19.2, 9.6, 4.8, 2.4, 1.2, 0.6, 0.3, 0.15, 0.0],
        filter: FilterRule::HideMinorBelowZoom {
            below_zoom: 16,
            clause: "SURFACE_TYPE_CD < 6",
        },
        permission: Permission::Everyone,
        hide_streets: false,
    }
}

fn ohio() -> Partition {
    Partition {
        code: "OH",
        base_url: "https://gis.dot.state.oh.us/arcgis/rest/services/TIMS/Roadway_Information/MapServer/".to_string(),
        layers: vec![
            Layer {
                id: 8,
                road_type_field: "FUNCTION_CLASS",
                object_id_field: "OBJECTID",
                out_fields: &["OBJECTID", "FUNCTION_CLASS", "STREET_NAME"],
                max_page_size: 2000,
                supports_pagination: true,
            },
            Layer {
                id: 12,
                road_type_field: "RAMP_TYPE",
                object_id_field: "OBJECTID",
                out_fields: &["OBJECTID", "RAMP_TYPE"],
                max_page_size: 500,
                supports_pagination: false,
            },
        ],
        classification: ClassificationRule::DirectLookup(HashMap::from([
            (1, RoadType::Freeway),
            (2, RoadType::MajorHighway),
            (3, RoadType::MinorHighway),
            (4, RoadType::PrimaryStreet),
            (5, RoadType::Street),
            (7, RoadType::Ramp),
        ])),
        colors: HashMap::from([
            (RoadType::Freeway, "#c577d2"),
            (RoadType::MajorHighway, "#45b8d1"),
            (RoadType::MinorHighway, "#d1b945"),
            (RoadType::PrimaryStreet, "#cbd145"),
            (RoadType::Street, "#eeeeee"),
            (RoadType::Ramp, "#b3bfb3"),
        ]),
        max_allowable_offsets: &[9.6, 4.8, 2.4, 1.2, 0.6, 0.3, 0.15, 0.0],
        filter: FilterRule::None,
        permission: Permission::Everyone,
        hide_streets: true,
    }
}

fn indiana() -> Partition {
    Partition {
        code: "IN",
        base_url: "https://gis.indot.in.gov/ro/rest/services/DOT/Road_Inventory/MapServer/".to_string(),
        layers: vec![Layer {
            id: 2,
            road_type_field: "NHS_CLASS",
            object_id_field: "OBJECTID",
            out_fields: &["OBJECTID", "NHS_CLASS"],
            max_page_size: 800,
            supports_pagination: true,
        }],
        classification: ClassificationRule::DirectLookup(HashMap::from([
            (1, RoadType::Freeway),
            (2, RoadType::MajorHighway),
            (3, RoadType::MinorHighway),
            (4, RoadType::PrimaryStreet),
        ])),
        colors: HashMap::from([
            (RoadType::Freeway, "#c577d2"),
            (RoadType::MajorHighway, "#45b8d1"),
            (RoadType::MinorHighway, "#d1b945"),
            (RoadType::PrimaryStreet, "#cbd145"),
        ]),
        max_allowable_offsets: &[19.2, 9.6, 4.8, 2.4, 1.2, 0.6, 0.3, 0.15, 0.0],
        filter: FilterRule::Static("TO_DATE IS NULL"),
        permission: Permission::MinRank(2),
        hide_streets: false,
    }
}
