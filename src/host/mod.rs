//! [`ProjectionHost`](crate::traits::ProjectionHost) implementations.
//!
//! [`stdout::StdoutHost`] writes window and content events as JSON lines for
//! a separate rendering process to draw.  Displays come from a
//! [`DisplaySource`]: either a fixed list from the config file or a JSON
//! file that an external tool rewrites when the display layout changes.

pub mod stdout;

use crate::command::DisplayInfo;
use std::path::PathBuf;

/// Error from a projection host.
#[derive(Debug, thiserror::Error)]
#[error("host error: {0}")]
pub struct HostError(pub String);

/// Where the host learns about attached displays.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplaySource {
    Static(Vec<DisplayInfo>),
    /// JSON array of [`DisplayInfo`], re-read on every enumeration.
    File(PathBuf),
}

impl DisplaySource {
    pub fn load(&self) -> Result<Vec<DisplayInfo>, HostError> {
        match self {
            DisplaySource::Static(displays) => Ok(displays.clone()),
            DisplaySource::File(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| HostError(format!("failed to read {}: {}", path.display(), e)))?;
                serde_json::from_str(&json)
                    .map_err(|e| HostError(format!("failed to parse {}: {}", path.display(), e)))
            }
        }
    }
}
