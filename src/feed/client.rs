//! Blocking HTTP [`FeedSource`] backed by `reqwest`.

use super::{last_modified_from, FeedError};
use crate::command::SpotId;
use crate::traits::FeedSource;
use log::debug;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches spot metadata from `{base_url}/{id}`.
pub struct HttpFeed {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpFeed {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("spotcast/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn metadata_url(&self, spot: SpotId) -> String {
        format!("{}/{}", self.base_url, spot)
    }
}

impl FeedSource for HttpFeed {
    type Error = FeedError;

    fn last_modified(&self, spot: SpotId) -> Result<Option<String>, FeedError> {
        let url = self.metadata_url(spot);
        debug!("GET {}", url);
        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(FeedError::Status {
                spot,
                status: response.status().as_u16(),
            });
        }
        let doc = response.json::<Value>()?;
        Ok(last_modified_from(&doc))
    }
}
