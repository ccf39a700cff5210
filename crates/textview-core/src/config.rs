//! Host-provided workspace settings.

use serde::{Deserialize, Serialize};

/// Settings a [`Workspace`](crate::Workspace) is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Width (in cells) given to new views.
    pub viewport_width: usize,
    /// Height (in lines) given to new views, if the host knows it.
    pub viewport_height: Option<usize>,
    /// Export collections flagged `PERSISTENT` from
    /// [`Workspace::persistent_regions`](crate::Workspace::persistent_regions).
    pub persist_regions: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            viewport_width: 80,
            viewport_height: None,
            persist_regions: true,
        }
    }
}

impl WorkspaceConfig {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
