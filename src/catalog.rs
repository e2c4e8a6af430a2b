//! Location catalog.
//!
//! The catalog is a JSON array of regions, each listing the spots it
//! contains:
//!
//! ```json
//! [
//!   {
//!     "name": "Horseshoe Bay",
//!     "regionUrl": "https://example.org/regions/hsb",
//!     "spots": [
//!       { "id": 14, "name": "Horseshoe Bay - Terminal" },
//!       { "id": 15, "name": "Horseshoe Bay - Highway 99" }
//!     ]
//!   }
//! ]
//! ```
//!
//! Regions without `spots` (missing or `null`) are treated as empty.

use crate::command::SpotId;
use crate::spot::Spot;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotEntry {
    pub id: SpotId,
    pub name: String,
}

/// A named group of spots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "regionUrl")]
    pub region_url: Option<String>,
    #[serde(default)]
    pub spots: Option<Vec<SpotEntry>>,
}

impl Region {
    pub fn entries(&self) -> &[SpotEntry] {
        self.spots.as_deref().unwrap_or_default()
    }
}

/// All regions in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub regions: Vec<Region>,
}

/// Error from loading or parsing a catalog file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a catalog from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&contents)?;
        debug!(
            "catalog {}: {} region(s), {} spot(s)",
            path.display(),
            catalog.regions.len(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// Number of spots across all regions.
    pub fn len(&self) -> usize {
        self.regions.iter().map(|r| r.entries().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten every region into spots served from `base_url`, in file order.
    ///
    /// An id listed in more than one region keeps its first occurrence.
    pub fn spots(&self, base_url: &str) -> Vec<Rc<Spot>> {
        let mut out: Vec<Rc<Spot>> = Vec::new();
        for entry in self.regions.iter().flat_map(|r| r.entries()) {
            if out.iter().any(|s| s.id() == entry.id) {
                debug!("spot {} listed twice, keeping the first", entry.id);
                continue;
            }
            out.push(Rc::new(Spot::new(entry.id, entry.name.clone(), base_url)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "name": "Horseshoe Bay",
            "regionUrl": "https://example.org/hsb",
            "spots": [
                { "id": 14, "name": "Terminal" },
                { "id": 15, "name": "Highway 99" }
            ]
        },
        { "name": "Closed route", "spots": null },
        { "name": "Tsawwassen", "spots": [ { "id": 30, "name": "Causeway" } ] }
    ]"#;

    #[test]
    fn parses_regions() {
        let cat = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(cat.regions.len(), 3);
        assert_eq!(cat.regions[0].name.as_deref(), Some("Horseshoe Bay"));
        assert_eq!(cat.regions[0].region_url.as_deref(), Some("https://example.org/hsb"));
        assert!(cat.regions[1].entries().is_empty());
        assert_eq!(cat.len(), 3);
    }

    #[test]
    fn flattens_in_order() {
        let cat = Catalog::from_json(SAMPLE).unwrap();
        let spots = cat.spots("https://feed.example/webcams/");
        let ids: Vec<SpotId> = spots.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![14, 15, 30]);
        assert_eq!(spots[2].name(), "Causeway");
        assert_eq!(spots[0].root_url(), "https://feed.example/webcams/14");
    }

    #[test]
    fn missing_optional_fields() {
        let cat = Catalog::from_json(r#"[{}]"#).unwrap();
        assert_eq!(cat.regions[0], Region::default());
        assert!(cat.is_empty());
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let json = r#"[
            { "spots": [ { "id": 1, "name": "first" } ] },
            { "spots": [ { "id": 1, "name": "second" } ] }
        ]"#;
        let spots = Catalog::from_json(json).unwrap().spots("https://x");
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0].name(), "first");
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(
            Catalog::from_json(r#"{"not":"an array"}"#),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = Catalog::load(Path::new("/nonexistent/spotcast/catalog.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/spotcast/catalog.json"));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("spotcast-catalog-{}.json", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();
        let cat = Catalog::load(&path).unwrap();
        assert_eq!(cat.len(), 3);
        let _ = std::fs::remove_file(&path);
    }
}
