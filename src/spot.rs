//! Image source model.
//!
//! A [`Spot`] is one webcam feed location.  Its URLs are derived from the
//! feed base and the spot id; the only mutable parts are the cache token
//! appended to the image URL and the `lastModified` timestamp reported by
//! the feed's metadata endpoint.
//!
//! Consumers learn about changes through [`Spot::subscribe`].  Every write
//! notifies all current subscribers synchronously before the write returns.
//! Spots live on the UI thread and are shared as `Rc<Spot>`.

use crate::command::SpotId;
use chrono::DateTime;
use log::debug;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// A change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpotChange {
    /// The cache token changed; `url` is the new effective image URL.
    EffectiveUrl { spot: SpotId, url: String },
    /// `lastModified` changed; `text` is the new freshness string.
    Freshness { spot: SpotId, text: Option<String> },
}

type Observer = Rc<dyn Fn(&SpotChange)>;

/// One webcam feed location.
pub struct Spot {
    id: SpotId,
    name: String,
    base_url: String,
    cache_token: Cell<i64>,
    last_modified: RefCell<Option<String>>,
    observers: RefCell<Vec<(u64, Observer)>>,
    next_observer: Cell<u64>,
}

impl std::fmt::Debug for Spot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spot")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cache_token", &self.cache_token.get())
            .field("last_modified", &self.last_modified.borrow())
            .finish()
    }
}

impl Spot {
    /// Create a spot whose cache token starts at the current Unix time.
    pub fn new(id: SpotId, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_token(id, name, base_url, chrono::Utc::now().timestamp())
    }

    /// Create a spot with an explicit initial cache token.
    pub fn with_token(
        id: SpotId,
        name: impl Into<String>,
        base_url: impl Into<String>,
        cache_token: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_token: Cell::new(cache_token),
            last_modified: RefCell::new(None),
            observers: RefCell::new(Vec::new()),
            next_observer: Cell::new(0),
        }
    }

    //  Accessors

    pub fn id(&self) -> SpotId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache_token(&self) -> i64 {
        self.cache_token.get()
    }

    pub fn last_modified(&self) -> Option<String> {
        self.last_modified.borrow().clone()
    }

    /// `{base}/{id}`, also the metadata endpoint.
    pub fn root_url(&self) -> String {
        format!("{}/{}", self.base_url, self.id)
    }

    /// Decorated image with the feed's own caption baked in.
    pub fn display_url(&self) -> String {
        format!("{}/imageDisplay", self.root_url())
    }

    /// Raw camera image.
    pub fn source_url(&self) -> String {
        format!("{}/imageSource", self.root_url())
    }

    /// The URL views bind to.  Changes iff the cache token changes.
    pub fn effective_url(&self) -> String {
        format!("{}?timestamp={}", self.source_url(), self.cache_token.get())
    }

    /// Human-readable freshness derived from `lastModified`.
    pub fn freshness(&self) -> Option<String> {
        self.last_modified.borrow().as_deref().and_then(freshness_text)
    }

    //  Mutation

    /// Bump the cache token to the current Unix time.
    pub fn refresh(&self) {
        self.refresh_at(chrono::Utc::now().timestamp());
    }

    /// Set the cache token to `token`.
    ///
    /// Always notifies, even if `token` equals the previous value: two
    /// refreshes within the same second yield the same URL, and subscribers
    /// treat the notification itself as the refresh signal.
    pub fn refresh_at(&self, token: i64) {
        self.cache_token.set(token);
        debug!("spot {} refreshed (token {})", self.id, token);
        self.notify(&SpotChange::EffectiveUrl {
            spot: self.id,
            url: self.effective_url(),
        });
    }

    /// Record the feed's `lastModified` value.  Notifies only on change.
    pub fn set_last_modified(&self, value: Option<String>) {
        if *self.last_modified.borrow() == value {
            return;
        }
        *self.last_modified.borrow_mut() = value;
        self.notify(&SpotChange::Freshness {
            spot: self.id,
            text: self.freshness(),
        });
    }

    //  Subscriptions

    /// Register `callback` for change notifications.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped.
    pub fn subscribe(self: &Rc<Self>, callback: impl Fn(&SpotChange) + 'static) -> Subscription {
        let id = self.next_observer.get();
        self.next_observer.set(id + 1);
        self.observers.borrow_mut().push((id, Rc::new(callback)));
        Subscription {
            spot: Rc::downgrade(self),
            id,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.observers.borrow().len()
    }

    fn notify(&self, change: &SpotChange) {
        // Snapshot so callbacks may subscribe or drop subscriptions.
        let observers: Vec<Observer> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, o)| Rc::clone(o))
            .collect();
        for observer in observers {
            observer(change);
        }
    }
}

/// Keeps a [`Spot::subscribe`] callback registered; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    spot: Weak<Spot>,
    id: u64,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(spot) = self.spot.upgrade() {
            spot.observers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Format a feed timestamp for on-screen display.
///
/// RFC 3339 values become `Updated YYYY-MM-DD HH:MM` in their own offset;
/// anything else non-empty is shown verbatim.
pub fn freshness_text(last_modified: &str) -> Option<String> {
    let raw = last_modified.trim();
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(format!("Updated {}", ts.format("%Y-%m-%d %H:%M"))),
        Err(_) => Some(raw.to_string()),
    }
}
