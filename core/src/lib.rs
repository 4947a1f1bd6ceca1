//! Incremental synchronization engine for a road-type map overlay.
//!
//! The engine keeps a rendered vector overlay consistent with the newest
//! viewport: it decides which geographic partitions are visible, fans out
//! paged spatial queries per partition and layer, transforms raw features
//! into styled line geometry, and commits the collected vectors atomically
//! once per synchronization round. Superseded rounds are cancelled
//! cooperatively and their results discarded at well-defined checkpoints.
//!
//! The host map editor (viewport, rendering surface, event bus) sits behind
//! the [`host::MapHost`] trait; everything else is owned here.

pub mod error;
pub mod host;
pub mod overlay;
pub mod planner;
pub mod query;
pub mod registry;
pub mod settings;
pub mod sync;
pub mod transform;
pub mod zoom_badge;

pub use error::SyncError;
pub use host::MapHost;
pub use overlay::HostEvent;
pub use overlay::Overlay;
pub use overlay::OverlayController;
pub use overlay::StatusIndicator;
pub use registry::Partition;
pub use registry::PartitionRegistry;
pub use sync::MIN_ZOOM_LEVEL;
pub use sync::Orchestrator;

/// Version stamp written into the persisted settings record.
pub const SCRIPT_VERSION: &str = env!("CARGO_PKG_VERSION");
