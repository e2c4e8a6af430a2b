//! Command dispatch and operator-input validation.
//!
//! The [`Controller`] sits between command sources and the
//! [`Projector`].  It owns the location catalog, turns spot ids from a
//! [`Command::Project`] into shared [`Spot`]s, resolves display selectors
//! against the host's current enumeration and rejects incomplete requests
//! with a message meant for the operator.

use crate::catalog::{Catalog, CatalogError};
use crate::command::{Command, Interval, SpotId};
use crate::config::{Config, ProjectionConfig};
use crate::feed::MetadataUpdate;
use crate::projector::{ProjectionError, Projector};
use crate::spot::Spot;
use crate::traits::{Clock, ProjectionHost, SystemClock};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Possible errors from [`Controller::handle`].
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The request was incomplete or referred to something that does not
    /// exist.  The message is meant for the operator.
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("projection host error: {0}")]
    Host(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn invalid(message: impl Into<String>) -> ControllerError {
    ControllerError::InvalidInput(message.into())
}

pub struct Controller<H: ProjectionHost, C: Clock = SystemClock> {
    projector: Projector<H, C>,
    catalog: Vec<Rc<Spot>>,
    catalog_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    base_url: String,
}

impl<H: ProjectionHost, C: Clock> Controller<H, C> {
    pub fn new(projector: Projector<H, C>, catalog: &Catalog, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            projector,
            catalog: catalog.spots(&base_url),
            catalog_path: None,
            config_path: None,
            base_url,
        }
    }

    /// Remember where the catalog came from so
    /// [`Command::ReloadCatalog`] can re-read it.
    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Persist interval changes to the config file at `path`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn projector(&self) -> &Projector<H, C> {
        &self.projector
    }

    pub fn projector_mut(&mut self) -> &mut Projector<H, C> {
        &mut self.projector
    }

    pub fn catalog(&self) -> &[Rc<Spot>] {
        &self.catalog
    }

    pub fn spot(&self, id: SpotId) -> Option<&Rc<Spot>> {
        self.catalog.iter().find(|s| s.id() == id)
    }

    /// See [`Projector::next_deadline`].
    pub fn next_deadline(&self) -> Option<Instant> {
        self.projector.next_deadline()
    }

    /// Fire due timers.
    pub fn poll(&mut self) {
        self.projector.poll();
    }

    /// Process a single [`Command`].
    ///
    /// Validation failures leave all state untouched.
    pub fn handle(&mut self, cmd: Command) -> Result<(), ControllerError> {
        match cmd {
            Command::Project { spots, display, mode } => {
                if spots.is_empty() {
                    return Err(invalid("Please select one or more images."));
                }
                let selected = spots
                    .iter()
                    .map(|id| {
                        self.spot(*id)
                            .cloned()
                            .ok_or_else(|| invalid(format!("Unknown image id {}.", id)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let selector = display.ok_or_else(|| invalid("Please select a display."))?;
                let displays = self
                    .projector
                    .host()
                    .displays()
                    .map_err(|e| ControllerError::Host(e.to_string()))?;
                let target = selector
                    .resolve(&displays)
                    .ok_or_else(|| invalid("Invalid display selection."))?
                    .clone();

                let mode = mode.ok_or_else(|| invalid("Please select a display mode."))?;

                let window = self.projector.start(selected, &target, mode)?;
                info!("projecting {} image(s) in {} on {}", spots.len(), window, target.name);
                Ok(())
            }

            Command::StopWindow(window) => Ok(self.projector.stop(window)?),

            Command::StopAll => {
                self.projector.stop_all();
                Ok(())
            }

            Command::SetMode { window, mode } => Ok(self.projector.set_mode(window, mode)?),

            Command::SetRotationInterval(interval) => {
                let interval = positive(interval)?;
                self.projector.set_rotation_interval(interval);
                self.persist(|p| p.rotation_interval_ms = millis(interval));
                Ok(())
            }

            Command::SetRefreshInterval(interval) => {
                let interval = positive(interval)?;
                self.projector.set_refresh_interval(interval);
                self.persist(|p| p.refresh_interval_ms = millis(interval));
                Ok(())
            }

            Command::DisplaysChanged => Ok(self.projector.displays_changed()?),

            Command::WindowClosed(window) => {
                self.projector.window_closed(window);
                Ok(())
            }

            Command::ReloadCatalog => {
                let Some(path) = self.catalog_path.clone() else {
                    warn!("no catalog path configured, nothing to reload");
                    return Ok(());
                };
                let catalog = Catalog::load(&path)?;
                self.replace_catalog(&catalog);
                info!("reloaded catalog from {}", path.display());
                Ok(())
            }
        }
    }

    /// Swap in a new catalog.
    ///
    /// Spots whose id and name survive keep their existing instance, so
    /// open projections and freshness data stay shared.
    pub fn replace_catalog(&mut self, catalog: &Catalog) {
        let fresh = catalog.spots(&self.base_url);
        self.catalog = fresh
            .into_iter()
            .map(|spot| {
                match self
                    .catalog
                    .iter()
                    .find(|old| old.id() == spot.id() && old.name() == spot.name())
                {
                    Some(old) => Rc::clone(old),
                    None => spot,
                }
            })
            .collect();
        info!("catalog holds {} spot(s)", self.catalog.len());
    }

    /// Write a settings change back to the config file.  The live change
    /// stands even if saving fails.
    fn persist(&self, edit: impl FnOnce(&mut ProjectionConfig)) {
        let Some(path) = &self.config_path else {
            return;
        };
        match Config::update(path, |cfg| edit(&mut cfg.projection)) {
            Ok(()) => debug!("saved settings to {}", path.display()),
            Err(e) => warn!("failed to save settings: {}", e),
        }
    }

    /// Apply a result from the metadata worker.
    pub fn apply_metadata(&mut self, update: MetadataUpdate) {
        if let Some(spot) = self.spot(update.spot) {
            spot.set_last_modified(update.last_modified.clone());
        }
        self.projector.apply_metadata(update.spot, update.last_modified);
    }
}

fn millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

fn positive(interval: Interval) -> Result<Duration, ControllerError> {
    if interval.0.is_zero() {
        Err(invalid("Please enter valid numbers for the settings."))
    } else {
        Ok(interval.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{DisplayInfo, DisplaySelector, ProjectionMode, WindowId};
    use crate::geometry::Rect;
    use crate::projector::ProjectorSettings;
    use crate::render::RenderTree;
    use std::cell::{Cell, RefCell};

    /// Record-keeping mock host.
    #[derive(Debug, Default)]
    struct MockHost {
        displays: RefCell<Vec<DisplayInfo>>,
        next_id: Cell<u64>,
        opened: RefCell<Vec<String>>,
        closed: RefCell<Vec<WindowId>>,
        contents: RefCell<Vec<(WindowId, RenderTree)>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("mock host error")]
    struct MockErr;

    impl ProjectionHost for MockHost {
        type Error = MockErr;

        fn displays(&self) -> Result<Vec<DisplayInfo>, MockErr> {
            Ok(self.displays.borrow().clone())
        }

        fn open_window(&self, display: &DisplayInfo, _: Rect) -> Result<WindowId, MockErr> {
            self.next_id.set(self.next_id.get() + 1);
            self.opened.borrow_mut().push(display.name.clone());
            Ok(WindowId(self.next_id.get()))
        }

        fn move_window(&self, _: WindowId, _: Rect) -> Result<(), MockErr> {
            Ok(())
        }

        fn set_content(&self, window: WindowId, content: &RenderTree) -> Result<(), MockErr> {
            self.contents.borrow_mut().push((window, content.clone()));
            Ok(())
        }

        fn close_window(&self, window: WindowId) -> Result<(), MockErr> {
            self.closed.borrow_mut().push(window);
            Ok(())
        }
    }

    const CATALOG: &str = r#"[
        { "name": "Horseshoe Bay", "spots": [ { "id": 14, "name": "Terminal" }, { "id": 15, "name": "Hwy 99" } ] },
        { "name": "Tsawwassen", "spots": [ { "id": 30, "name": "Causeway" } ] }
    ]"#;

    fn display(name: &str) -> DisplayInfo {
        DisplayInfo {
            name: name.into(),
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
            dpi: None,
        }
    }

    fn controller() -> Controller<MockHost> {
        let host = MockHost::default();
        *host.displays.borrow_mut() = vec![display("DP-1"), display("HDMI-A-1")];
        let projector = Projector::new(host, ProjectorSettings::default());
        Controller::new(projector, &Catalog::from_json(CATALOG).unwrap(), "https://feed.example")
    }

    fn project(spots: Vec<SpotId>, display: Option<DisplaySelector>, mode: Option<ProjectionMode>) -> Command {
        Command::Project { spots, display, mode }
    }

    fn message(err: ControllerError) -> String {
        match err {
            ControllerError::InvalidInput(m) => m,
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn project_by_name() {
        let mut c = controller();
        c.handle(project(
            vec![30, 14],
            Some(DisplaySelector::Name("HDMI-A-1".into())),
            Some(ProjectionMode::Grid),
        ))
        .unwrap();

        let sessions = c.projector().sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].spots, vec![30, 14]);
        assert_eq!(sessions[0].display, "HDMI-A-1");
        assert_eq!(sessions[0].mode, ProjectionMode::Grid);
    }

    #[test]
    fn project_by_index_shares_catalog_spots() {
        let mut c = controller();
        c.handle(project(vec![14], Some(DisplaySelector::Index(0)), Some(ProjectionMode::Rotating)))
            .unwrap();
        assert_eq!(*c.projector().host().opened.borrow(), vec!["DP-1".to_string()]);
        // Catalog + session.
        assert_eq!(Rc::strong_count(c.spot(14).unwrap()), 2);
    }

    #[test]
    fn validation_messages() {
        let mut c = controller();
        let dp = || Some(DisplaySelector::Index(0));
        let grid = Some(ProjectionMode::Grid);

        let cases = vec![
            (project(vec![], dp(), grid), "Please select one or more images."),
            (project(vec![14, 99], dp(), grid), "Unknown image id 99."),
            (project(vec![14], None, grid), "Please select a display."),
            (project(vec![14], Some(DisplaySelector::Index(5)), grid), "Invalid display selection."),
            (
                project(vec![14], Some(DisplaySelector::Name("VGA-9".into())), grid),
                "Invalid display selection.",
            ),
            (project(vec![14], dp(), None), "Please select a display mode."),
        ];
        for (cmd, expected) in cases {
            assert_eq!(message(c.handle(cmd).unwrap_err()), expected);
        }
        assert!(c.projector().host().opened.borrow().is_empty());
        assert!(!c.projector().is_active());
    }

    #[test]
    fn zero_intervals_rejected() {
        let mut c = controller();
        let err = c
            .handle(Command::SetRotationInterval(Interval(Duration::ZERO)))
            .unwrap_err();
        assert_eq!(message(err), "Please enter valid numbers for the settings.");
        let err = c
            .handle(Command::SetRefreshInterval(Interval(Duration::ZERO)))
            .unwrap_err();
        assert_eq!(message(err), "Please enter valid numbers for the settings.");
    }

    #[test]
    fn intervals_reach_projector() {
        let mut c = controller();
        c.handle(Command::SetRotationInterval(Interval(Duration::from_secs(7))))
            .unwrap();
        c.handle(Command::SetRefreshInterval(Interval(Duration::from_secs(60))))
            .unwrap();
        assert_eq!(c.projector().rotation_timer().interval(), Duration::from_secs(7));
        assert_eq!(c.projector().refresh_timer().interval(), Duration::from_secs(60));
    }

    #[test]
    fn stop_and_mode_dispatch() {
        let mut c = controller();
        let dp = Some(DisplaySelector::Index(0));
        c.handle(project(vec![14, 15], dp.clone(), Some(ProjectionMode::Rotating)))
            .unwrap();
        c.handle(project(vec![30], dp, Some(ProjectionMode::Grid))).unwrap();

        c.handle(Command::SetMode {
            window: WindowId(1),
            mode: ProjectionMode::Grid,
        })
        .unwrap();
        assert_eq!(c.projector().session(WindowId(1)).unwrap().mode, ProjectionMode::Grid);

        c.handle(Command::StopWindow(WindowId(1))).unwrap();
        assert_eq!(*c.projector().host().closed.borrow(), vec![WindowId(1)]);

        c.handle(Command::WindowClosed(WindowId(2))).unwrap();
        assert!(!c.projector().is_active());
        assert_eq!(c.projector().host().closed.borrow().len(), 1);
    }

    #[test]
    fn unknown_window_is_a_projection_error() {
        let mut c = controller();
        let err = c.handle(Command::StopWindow(WindowId(42))).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Projection(ProjectionError::UnknownWindow(WindowId(42)))
        ));
    }

    #[test]
    fn stop_all_and_display_change() {
        let mut c = controller();
        c.handle(project(
            vec![14],
            Some(DisplaySelector::Name("HDMI-A-1".into())),
            Some(ProjectionMode::Grid),
        ))
        .unwrap();
        *c.projector().host().displays.borrow_mut() = vec![display("DP-1")];
        c.handle(Command::DisplaysChanged).unwrap();
        assert!(!c.projector().is_active());

        c.handle(project(vec![14], Some(DisplaySelector::Index(0)), Some(ProjectionMode::Grid)))
            .unwrap();
        c.handle(Command::StopAll).unwrap();
        assert!(!c.projector().is_active());
    }

    #[test]
    fn metadata_updates_catalog_and_sessions() {
        let mut c = controller();
        c.handle(project(vec![14], Some(DisplaySelector::Index(0)), Some(ProjectionMode::Grid)))
            .unwrap();
        c.apply_metadata(MetadataUpdate {
            spot: 14,
            last_modified: Some("2024-06-01T10:00:00Z".into()),
        });
        assert_eq!(c.spot(14).unwrap().freshness().as_deref(), Some("Updated 2024-06-01 10:00"));

        let host = c.projector().host();
        let last = host.contents.borrow().last().cloned().unwrap();
        match last.1 {
            RenderTree::Grid { cells, .. } => assert_eq!(
                cells[0].as_ref().unwrap().caption.freshness.as_deref(),
                Some("Updated 2024-06-01 10:00")
            ),
            other => panic!("expected grid, got {:?}", other),
        }
    }

    #[test]
    fn replace_catalog_keeps_surviving_instances() {
        let mut c = controller();
        let before = Rc::clone(c.spot(14).unwrap());
        let next = Catalog::from_json(
            r#"[{ "spots": [ { "id": 14, "name": "Terminal" }, { "id": 77, "name": "New" } ] }]"#,
        )
        .unwrap();
        c.replace_catalog(&next);

        assert!(Rc::ptr_eq(&before, c.spot(14).unwrap()));
        assert!(c.spot(77).is_some());
        assert!(c.spot(30).is_none());
    }

    #[test]
    fn failed_reload_keeps_catalog() {
        let mut c = controller().with_catalog_path("/nonexistent/spotcast/catalog.json");
        let err = c.handle(Command::ReloadCatalog).unwrap_err();
        assert!(matches!(err, ControllerError::Catalog(_)));
        assert_eq!(c.catalog().len(), 3);
    }

    #[test]
    fn reload_without_path_is_noop() {
        let mut c = controller();
        c.handle(Command::ReloadCatalog).unwrap();
        assert_eq!(c.catalog().len(), 3);
    }

    fn tmp_config_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("spotcast-settings-{}-{}.json", std::process::id(), tag))
    }

    #[test]
    fn interval_changes_survive_restart() {
        let path = tmp_config_path("persist");
        std::fs::write(&path, r#"{ "feed": { "base_url": "https://feed.example" } }"#).unwrap();

        let mut c = controller().with_config_path(&path);
        c.handle(Command::SetRotationInterval(Interval(Duration::from_secs(8))))
            .unwrap();
        c.handle(Command::SetRefreshInterval(Interval(Duration::from_secs(90))))
            .unwrap();

        let saved = Config::load(&path).unwrap();
        assert_eq!(saved.projection.rotation_interval_ms, 8_000);
        assert_eq!(saved.projection.refresh_interval_ms, 90_000);
        assert_eq!(saved.feed.base_url, "https://feed.example");
        assert_eq!(saved.projector_settings().rotation_interval, Duration::from_secs(8));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn failed_save_keeps_live_change() {
        // A regular file as parent directory makes the save fail.
        let blocker = tmp_config_path("blocker");
        std::fs::write(&blocker, "").unwrap();

        let mut c = controller().with_config_path(blocker.join("config.json"));
        c.handle(Command::SetRotationInterval(Interval(Duration::from_secs(9))))
            .unwrap();
        assert_eq!(c.projector().rotation_timer().interval(), Duration::from_secs(9));
        let _ = std::fs::remove_file(&blocker);
    }

    #[test]
    fn rejected_interval_is_not_saved() {
        let path = tmp_config_path("rejected");
        let _ = std::fs::remove_file(&path);
        let mut c = controller().with_config_path(&path);
        assert!(c.handle(Command::SetRefreshInterval(Interval(Duration::ZERO))).is_err());
        assert!(!path.exists());
    }
}
