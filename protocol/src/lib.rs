//! Shared types for the road-type overlay engine: the feature-service wire
//! format, the canonical road-type taxonomy, rendered vector output, and the
//! persisted user settings record.

mod roads;
mod settings;
mod wire;

pub use roads::GLOBAL_ROAD_TYPE_ORDER;
pub use roads::RoadType;
pub use roads::RoadVector;
pub use roads::segment_width;
pub use settings::SETTINGS_FILENAME;
pub use settings::Settings;
pub use wire::Envelope;
pub use wire::ErrorBody;
pub use wire::FeaturesResponse;
pub use wire::GEOMETRY_TYPE;
pub use wire::IN_SR;
pub use wire::OUT_SR;
pub use wire::ObjectIdsResponse;
pub use wire::RawFeature;
pub use wire::RawGeometry;
pub use wire::SPATIAL_REL;
pub use wire::SpatialReference;
