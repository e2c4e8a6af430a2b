//! Image feed metadata.
//!
//! The feed's metadata endpoint (`GET {base}/{id}`) returns a JSON document
//! whose `imageStats.lastModified.time` field says when the camera last
//! produced an image.  [`MetadataWorker`](worker::MetadataWorker) fetches it
//! off the UI thread through a [`FeedSource`](crate::traits::FeedSource) and
//! hands [`MetadataUpdate`]s back to the loop.

#[cfg(feature = "http-feed")]
pub mod client;
pub mod worker;

use crate::command::SpotId;
use serde_json::Value;

/// Default feed base URL.
pub const DEFAULT_BASE_URL: &str = "https://images.drivebc.ca/webcam/api/v1/webcams";

/// A metadata result travelling from the worker to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub spot: SpotId,
    pub last_modified: Option<String>,
}

/// Errors from fetching or decoding feed metadata.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[cfg(feature = "http-feed")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned {status} for spot {spot}")]
    Status { spot: SpotId, status: u16 },
    #[error("invalid metadata payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Extract `imageStats.lastModified.time` from a metadata document.
pub fn last_modified_from(doc: &Value) -> Option<String> {
    doc.pointer("/imageStats/lastModified/time")
        .and_then(Value::as_str)
        .map(str::to_string)
}
