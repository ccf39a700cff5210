//! Serialized form of persistent region collections.
//!
//! Collections flagged [`RegionFlags::PERSISTENT`](crate::RegionFlags::PERSISTENT) are exported
//! keyed by the buffer's file identity and the collection key, as plain `(a, b)` offset pairs.

use crate::region::{Point, Region};
use crate::view::RegionStyle;
use serde::{Deserialize, Serialize};

/// One persisted region collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRegions {
    /// File identity of the buffer (its name).
    pub file: String,
    /// Collection key.
    pub key: String,
    /// Regions as `(a, b)` pairs.
    pub regions: Vec<(Point, Point)>,
    /// Presentation attributes.
    #[serde(default)]
    pub style: RegionStyle,
}

impl PersistedRegions {
    pub(crate) fn new(file: &str, key: &str, regions: &[Region], style: RegionStyle) -> Self {
        Self {
            file: file.to_string(),
            key: key.to_string(),
            regions: regions.iter().map(Region::to_tuple).collect(),
            style,
        }
    }

    /// Stored regions.
    pub fn to_regions(&self) -> Vec<Region> {
        self.regions.iter().copied().map(Region::from).collect()
    }

    /// Encode a batch as JSON.
    pub fn to_json(items: &[PersistedRegions]) -> Result<String, serde_json::Error> {
        serde_json::to_string(items)
    }

    /// Decode a batch written by [`PersistedRegions::to_json`].
    pub fn from_json(json: &str) -> Result<Vec<PersistedRegions>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::RegionFlags;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_shape() {
        let item = PersistedRegions::new(
            "/tmp/a.rs",
            "bookmarks",
            &[Region::new(3, 1), Region::caret(7)],
            RegionStyle::new("mark", RegionFlags::PERSISTENT),
        );
        let json = PersistedRegions::to_json(std::slice::from_ref(&item)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["regions"], serde_json::json!([[3, 1], [7, 7]]));
        assert_eq!(value[0]["style"]["flags"], serde_json::json!(16));

        let back = PersistedRegions::from_json(&json).unwrap();
        assert_eq!(back[0].to_regions(), vec![Region::new(3, 1), Region::caret(7)]);
    }
}
