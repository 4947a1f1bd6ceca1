//! Persisted user preferences.

use serde::Deserialize;
use serde::Serialize;

/// File name of the persisted settings blob.
pub const SETTINGS_FILENAME: &str = "roadlens_settings.json";

/// User preferences, stored as one JSON object. Every field carries a serde
/// default so records written by older versions merge cleanly on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Last script version that ran; used to detect upgrades.
    #[serde(default)]
    pub last_version: String,
    /// Whether the road-type overlay layer is shown at all.
    #[serde(default = "default_true")]
    pub layer_visible: bool,
    /// Whether road-type highlighting (including local streets) is enabled.
    #[serde(default = "default_true")]
    pub road_type_enabled: bool,
    /// Restrict sync to a single state abbreviation; `None` or `"ALL"`
    /// matches every partition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_state_abbr: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_version: String::new(),
            layer_visible: true,
            road_type_enabled: true,
            active_state_abbr: None,
        }
    }
}
