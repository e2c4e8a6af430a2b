//! Background metadata fetcher.
//!
//! The UI thread sends spot ids; the worker fetches each one through its
//! [`FeedSource`] and sends back a [`MetadataUpdate`].  Requests that pile
//! up while a fetch is in flight are coalesced, so a refresh tick that asks
//! for the same spot from several windows costs one request.

use super::MetadataUpdate;
use crate::command::SpotId;
use crate::traits::FeedSource;
use log::{debug, info, warn};
use std::sync::mpsc;
use std::thread::JoinHandle;

pub struct MetadataWorker<F: FeedSource> {
    feed: F,
}

impl<F: FeedSource> MetadataWorker<F> {
    pub fn new(feed: F) -> Self {
        Self { feed }
    }

    /// Process requests until either channel closes.  Blocks.
    pub fn run(&self, requests: mpsc::Receiver<SpotId>, results: mpsc::Sender<MetadataUpdate>) {
        while let Ok(first) = requests.recv() {
            let mut batch = vec![first];
            for spot in requests.try_iter() {
                if !batch.contains(&spot) {
                    batch.push(spot);
                }
            }
            debug!("fetching metadata for {} spot(s)", batch.len());

            for spot in batch {
                match self.feed.last_modified(spot) {
                    Ok(Some(last_modified)) => {
                        let update = MetadataUpdate {
                            spot,
                            last_modified: Some(last_modified),
                        };
                        if results.send(update).is_err() {
                            info!("metadata consumer gone, worker exiting");
                            return;
                        }
                    }
                    Ok(None) => debug!("spot {}: no lastModified in metadata", spot),
                    Err(e) => warn!("spot {}: metadata fetch failed: {}", spot, e),
                }
            }
        }
        info!("metadata request channel closed, worker exiting");
    }

    /// Run on a dedicated thread.
    pub fn spawn(
        self,
        requests: mpsc::Receiver<SpotId>,
        results: mpsc::Sender<MetadataUpdate>,
    ) -> JoinHandle<()> {
        std::thread::spawn(move || self.run(requests, results))
    }
}
