//! The projection orchestrator.
//!
//! [`Projector`] owns every open projection window ("session"), each
//! session's display mode and rotation index, and the two interval timers.
//! It reacts to timer ticks, operator requests and window events by
//! rendering content through [`render`](crate::render::render) and handing
//! it to the [`ProjectionHost`].
//!
//! # Timers
//!
//! * **Refresh**: runs while any session is live.  A tick bumps the cache
//!   token of every projected spot and asks the metadata worker for fresh
//!   `lastModified` values.  Grid sessions are subscribed to their spots
//!   and re-render from the resulting notifications; rotating sessions are
//!   not, so a rotating window never swaps its image off-cycle.
//! * **Rotation**: runs while any session is in
//!   [`Rotating`](ProjectionMode::Rotating) mode.  A tick advances every
//!   rotating session by one image and refreshes the image it lands on.
//!
//! Everything here runs on the single UI thread.  Subscription callbacks
//! only queue the window for re-render; the queue is flushed after each
//! tick or request, skipping windows that have been torn down meanwhile.

use crate::command::{DisplayInfo, ProjectionMode, SpotId, WindowId};
use crate::geometry::{resolve_window_geometry_with, Rect};
use crate::render::{render, RenderMode};
use crate::spot::{Spot, Subscription};
use crate::timer::Timer;
use crate::traits::{Clock, ProjectionHost, SystemClock};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Possible errors from the projector.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// The projection host returned an error.
    #[error("projection host error: {0}")]
    Host(String),
    #[error("no projection open in {0}")]
    UnknownWindow(WindowId),
    #[error("nothing selected to project")]
    EmptySelection,
}

/// Timer intervals and placement options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectorSettings {
    pub rotation_interval: Duration,
    pub refresh_interval: Duration,
    /// Divide window origins by the display scale factor as well as sizes.
    pub scale_origin: bool,
}

impl Default for ProjectorSettings {
    fn default() -> Self {
        Self {
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            scale_origin: false,
        }
    }
}

/// One open projection window.
struct Session {
    window: WindowId,
    display: DisplayInfo,
    geometry: Rect,
    /// Rotation and grid fill order.
    spots: Vec<Rc<Spot>>,
    mode: ProjectionMode,
    /// Always `< spots.len()` (sessions are never empty).
    index: usize,
    /// Grid mode only: one subscription per spot.
    bindings: Vec<Subscription>,
}

impl Session {
    fn render_mode(&self) -> RenderMode {
        match self.mode {
            ProjectionMode::Rotating => RenderMode::Rotating { index: self.index },
            ProjectionMode::Grid => RenderMode::Grid,
        }
    }
}

/// Read-only snapshot of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub window: WindowId,
    pub display: String,
    pub mode: ProjectionMode,
    pub index: usize,
    pub spots: Vec<SpotId>,
    pub geometry: Rect,
}

/// Orchestrates projection windows, timers and rendering.
///
/// Generic over the [`ProjectionHost`] and the [`Clock`], so tests can
/// drive it with a recording host and a manual clock.
///
/// # Typical usage
///
/// ```ignore
/// let mut projector = Projector::new(host, ProjectorSettings::default());
/// let window = projector.start(spots, &display, ProjectionMode::Grid)?;
/// loop {
///     projector.poll();
///     // wait until projector.next_deadline() or the next command
/// }
/// ```
pub struct Projector<H: ProjectionHost, C: Clock = SystemClock> {
    host: H,
    clock: C,
    scale_origin: bool,
    sessions: Vec<Session>,
    refresh_timer: Timer,
    rotation_timer: Timer,
    invalidated: Rc<RefCell<Vec<WindowId>>>,
    metadata_tx: Option<mpsc::Sender<SpotId>>,
}

impl<H: ProjectionHost> Projector<H, SystemClock> {
    /// Create a projector on the system clock.  No windows are open and
    /// both timers are stopped.
    pub fn new(host: H, settings: ProjectorSettings) -> Self {
        Self::with_clock(host, SystemClock, settings)
    }
}

impl<H: ProjectionHost, C: Clock> Projector<H, C> {
    pub fn with_clock(host: H, clock: C, settings: ProjectorSettings) -> Self {
        Self {
            host,
            clock,
            scale_origin: settings.scale_origin,
            sessions: Vec::new(),
            refresh_timer: Timer::new("refresh", settings.refresh_interval),
            rotation_timer: Timer::new("rotation", settings.rotation_interval),
            invalidated: Rc::new(RefCell::new(Vec::new())),
            metadata_tx: None,
        }
    }

    /// Attach the channel feeding the metadata worker.
    ///
    /// Spot ids are sent when a session starts and on every refresh tick.
    /// Results come back through
    /// [`apply_metadata`](Projector::apply_metadata).
    pub fn set_metadata_requests(&mut self, tx: mpsc::Sender<SpotId>) {
        self.metadata_tx = Some(tx);
    }

    //  Accessors

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn refresh_timer(&self) -> &Timer {
        &self.refresh_timer
    }

    pub fn rotation_timer(&self) -> &Timer {
        &self.rotation_timer
    }

    /// Whether any projection window is open.
    pub fn is_active(&self) -> bool {
        !self.sessions.is_empty()
    }

    /// Snapshot of all sessions, oldest first.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions.iter().map(Self::info).collect()
    }

    pub fn session(&self, window: WindowId) -> Option<SessionInfo> {
        self.position(window).map(|pos| Self::info(&self.sessions[pos]))
    }

    /// Earliest instant at which [`poll`](Projector::poll) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.refresh_timer.next_due(), self.rotation_timer.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    //  Session lifecycle

    /// Open a projection window on `display` showing `spots` in `mode`.
    ///
    /// The first session starts the refresh timer; a rotating session
    /// starts the rotation timer.  Content is rendered before returning.
    pub fn start(
        &mut self,
        spots: Vec<Rc<Spot>>,
        display: &DisplayInfo,
        mode: ProjectionMode,
    ) -> Result<WindowId, ProjectionError> {
        if spots.is_empty() {
            return Err(ProjectionError::EmptySelection);
        }
        let geometry = resolve_window_geometry_with(display, self.scale_origin);
        let window = self
            .host
            .open_window(display, geometry)
            .map_err(|e| ProjectionError::Host(e.to_string()))?;
        info!(
            "{}: {} projection of {} spot(s) on {} at ({}, {}) {}x{}",
            window,
            mode,
            spots.len(),
            display.name,
            geometry.x,
            geometry.y,
            geometry.width,
            geometry.height
        );

        self.sessions.push(Session {
            window,
            display: display.clone(),
            geometry,
            spots,
            mode,
            index: 0,
            bindings: Vec::new(),
        });
        let pos = self.sessions.len() - 1;

        self.refresh_timer.start(self.clock.now());
        self.enter_mode(pos);
        let ids: Vec<SpotId> = self.sessions[pos].spots.iter().map(|s| s.id()).collect();
        for id in ids {
            self.request_metadata(id);
        }
        self.flush_invalidations();
        Ok(window)
    }

    /// Switch a live session to `mode` without closing its window.
    pub fn set_mode(&mut self, window: WindowId, mode: ProjectionMode) -> Result<(), ProjectionError> {
        let pos = self
            .position(window)
            .ok_or(ProjectionError::UnknownWindow(window))?;
        if self.sessions[pos].mode == mode {
            debug!("{} already in {} mode", window, mode);
            return Ok(());
        }
        info!("{}: switching to {} mode", window, mode);
        self.sessions[pos].mode = mode;
        self.enter_mode(pos);
        self.flush_invalidations();
        Ok(())
    }

    /// Close one projection window.
    pub fn stop(&mut self, window: WindowId) -> Result<(), ProjectionError> {
        let pos = self
            .position(window)
            .ok_or(ProjectionError::UnknownWindow(window))?;
        self.remove_session(pos, true);
        Ok(())
    }

    /// Close every projection window and stop both timers.
    pub fn stop_all(&mut self) {
        info!("stopping {} projection(s)", self.sessions.len());
        while !self.sessions.is_empty() {
            self.remove_session(self.sessions.len() - 1, true);
        }
    }

    /// The host reports that `window` was closed behind our back.
    ///
    /// Takes the same removal path as [`stop`](Projector::stop) minus the
    /// close call.  Unknown windows are ignored.
    pub fn window_closed(&mut self, window: WindowId) {
        match self.position(window) {
            Some(pos) => self.remove_session(pos, false),
            None => debug!("{} closed but not projecting, ignoring", window),
        }
    }

    /// Re-enumerate displays after a configuration change.
    ///
    /// Sessions whose display disappeared are torn down; sessions whose
    /// display moved or changed DPI are repositioned and re-rendered.
    pub fn displays_changed(&mut self) -> Result<(), ProjectionError> {
        let displays = self
            .host
            .displays()
            .map_err(|e| ProjectionError::Host(e.to_string()))?;
        info!("display configuration changed ({} display(s))", displays.len());

        let mut gone = Vec::new();
        for pos in 0..self.sessions.len() {
            let session = &self.sessions[pos];
            let window = session.window;
            match displays.iter().find(|d| d.name == session.display.name) {
                None => gone.push(window),
                Some(display) if *display != session.display => {
                    let geometry = resolve_window_geometry_with(display, self.scale_origin);
                    info!("{}: display {} changed, moving window", window, display.name);
                    if let Err(e) = self.host.move_window(window, geometry) {
                        warn!("{}: move failed: {}", window, e);
                    }
                    let session = &mut self.sessions[pos];
                    session.display = display.clone();
                    session.geometry = geometry;
                    self.render_session(pos);
                }
                Some(_) => {}
            }
        }

        for window in gone {
            warn!("{}: display disappeared, closing projection", window);
            if let Some(pos) = self.position(window) {
                self.remove_session(pos, true);
            }
        }
        Ok(())
    }

    //  Settings

    /// Change the rotation interval; a running timer is rescheduled now.
    pub fn set_rotation_interval(&mut self, interval: Duration) {
        info!("{} interval set to {:?}", self.rotation_timer.name(), interval);
        self.rotation_timer.set_interval(interval, self.clock.now());
    }

    /// Change the refresh interval; a running timer is rescheduled now.
    pub fn set_refresh_interval(&mut self, interval: Duration) {
        info!("{} interval set to {:?}", self.refresh_timer.name(), interval);
        self.refresh_timer.set_interval(interval, self.clock.now());
    }

    //  Ticks

    /// Fire whichever timers are due.  Call this from the UI loop.
    pub fn poll(&mut self) {
        let now = self.clock.now();
        if self.refresh_timer.poll(now) {
            debug!("{} timer fired", self.refresh_timer.name());
            self.on_refresh_tick();
        }
        if self.rotation_timer.poll(now) {
            debug!("{} timer fired", self.rotation_timer.name());
            self.on_rotation_tick();
        }
        self.flush_invalidations();
    }

    /// Refresh every projected spot once, then re-render grid sessions.
    pub fn on_refresh_tick(&mut self) {
        let mut unique: Vec<Rc<Spot>> = Vec::new();
        for spot in self.sessions.iter().flat_map(|s| s.spots.iter()) {
            if !unique.iter().any(|u| Rc::ptr_eq(u, spot)) {
                unique.push(Rc::clone(spot));
            }
        }
        debug!("{} tick: {} spot(s)", self.refresh_timer.name(), unique.len());

        let token = self.clock.unix_timestamp();
        for spot in &unique {
            spot.refresh_at(token);
            self.request_metadata(spot.id());
        }
        self.flush_invalidations();
    }

    /// Advance every rotating session by one image.
    pub fn on_rotation_tick(&mut self) {
        for pos in 0..self.sessions.len() {
            let session = &mut self.sessions[pos];
            if session.mode != ProjectionMode::Rotating || session.spots.is_empty() {
                continue;
            }
            session.index = (session.index + 1) % session.spots.len();
            debug!("{}: rotating to index {}", session.window, session.index);
            self.show_current(pos);
        }
        self.flush_invalidations();
    }

    /// Apply a metadata result on the UI thread.
    pub fn apply_metadata(&mut self, spot: SpotId, last_modified: Option<String>) {
        for s in self.sessions.iter().flat_map(|s| s.spots.iter()) {
            if s.id() == spot {
                s.set_last_modified(last_modified.clone());
            }
        }
        self.flush_invalidations();
    }

    //  Internal

    fn info(session: &Session) -> SessionInfo {
        SessionInfo {
            window: session.window,
            display: session.display.name.clone(),
            mode: session.mode,
            index: session.index,
            spots: session.spots.iter().map(|s| s.id()).collect(),
            geometry: session.geometry,
        }
    }

    fn position(&self, window: WindowId) -> Option<usize> {
        self.sessions.iter().position(|s| s.window == window)
    }

    /// Bind or unbind the session for its mode, render it immediately and
    /// bring the rotation timer in line.
    fn enter_mode(&mut self, pos: usize) {
        match self.sessions[pos].mode {
            ProjectionMode::Rotating => {
                self.sessions[pos].bindings.clear();
                self.show_current(pos);
            }
            ProjectionMode::Grid => {
                self.bind(pos);
                self.render_session(pos);
            }
        }
        self.sync_rotation_timer();
    }

    /// Subscribe a grid session to all of its spots.
    fn bind(&mut self, pos: usize) {
        let window = self.sessions[pos].window;
        let bindings = self.sessions[pos]
            .spots
            .iter()
            .map(|spot| {
                let queue = Rc::clone(&self.invalidated);
                spot.subscribe(move |_| queue.borrow_mut().push(window))
            })
            .collect();
        self.sessions[pos].bindings = bindings;
    }

    /// Refresh the spot at the session's index and render it.
    fn show_current(&mut self, pos: usize) {
        let token = self.clock.unix_timestamp();
        let session = &self.sessions[pos];
        if let Some(spot) = session.spots.get(session.index) {
            spot.refresh_at(token);
        }
        self.render_session(pos);
    }

    fn render_session(&self, pos: usize) {
        let session = &self.sessions[pos];
        let tree = render(session.render_mode(), &session.spots, session.geometry);
        debug!("{}: rendering {:?}", session.window, tree.spot_ids());
        if let Err(e) = self.host.set_content(session.window, &tree) {
            warn!("{}: content update failed: {}", session.window, e);
        }
    }

    /// Re-render windows queued by spot notifications.
    fn flush_invalidations(&mut self) {
        let mut pending = std::mem::take(&mut *self.invalidated.borrow_mut());
        if pending.is_empty() {
            return;
        }
        pending.sort();
        pending.dedup();
        for window in pending {
            match self.position(window) {
                Some(pos) if self.sessions[pos].mode == ProjectionMode::Grid => self.render_session(pos),
                Some(_) => {}
                None => debug!("{} is gone, dropping re-render", window),
            }
        }
    }

    fn sync_rotation_timer(&mut self) {
        let rotating = self
            .sessions
            .iter()
            .any(|s| s.mode == ProjectionMode::Rotating);
        if rotating {
            self.rotation_timer.start(self.clock.now());
        } else if self.rotation_timer.is_running() {
            debug!("no rotating projections, stopping {} timer", self.rotation_timer.name());
            self.rotation_timer.stop();
        }
    }

    fn remove_session(&mut self, pos: usize, close: bool) {
        let session = self.sessions.remove(pos);
        if close {
            if let Err(e) = self.host.close_window(session.window) {
                warn!("{}: close failed: {}", session.window, e);
            }
        }
        info!("{}: projection stopped", session.window);
        // Dropping the session drops its subscriptions.
        drop(session);

        if self.sessions.is_empty() {
            info!("no projections left, stopping timers");
            self.refresh_timer.stop();
            self.rotation_timer.stop();
        } else {
            self.sync_rotation_timer();
        }
    }

    fn request_metadata(&mut self, spot: SpotId) {
        if let Some(tx) = &self.metadata_tx {
            if tx.send(spot).is_err() {
                warn!("metadata worker has gone away, no more freshness updates");
                self.metadata_tx = None;
            }
        }
    }
}

//  Tests
