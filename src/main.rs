//! Entry point for the **spotcast** daemon.
//!
//! Spawns the Unix-socket command listener and the metadata worker on
//! background threads and runs the projection loop on the main thread.
//! Window and content events go to standard output as JSON lines; logs go
//! to standard error.

use spotcast::catalog::Catalog;
use spotcast::command::Command;
use spotcast::config::Config;
use spotcast::controller::{Controller, ControllerError};
use spotcast::feed::MetadataUpdate;
use spotcast::host::stdout::StdoutHost;
use spotcast::ipc::listener::UnixSocketListener;
use spotcast::projector::Projector;
use spotcast::traits::{CommandSource, ProjectionHost};
use log::{error, info, warn};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Upper bound on how long the loop blocks, so metadata results are
/// applied promptly even when no timer is due.
const MAX_WAIT: Duration = Duration::from_millis(500);

/// Default socket path for the command listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/spotcast.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/spotcast`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("spotcast")
}

fn main() {
    env_logger::init();

    let config_path = config_dir().join("config.json");
    let config = Config::load_or_default(&config_path);

    let catalog_path = config.catalog_path(&config_dir());
    let catalog = match Catalog::load(&catalog_path) {
        Ok(catalog) => {
            info!("loaded {} spot(s) from {}", catalog.len(), catalog_path.display());
            catalog
        }
        Err(e) => {
            error!("{}; starting with an empty catalog", e);
            Catalog::default()
        }
    };

    let host = StdoutHost::new(config.display_source());
    match host.displays() {
        Ok(d) => info!("found {} display(s)", d.len()),
        Err(e) => warn!("failed to enumerate displays: {}", e),
    }

    let mut projector = Projector::new(host, config.projector_settings());
    let (meta_tx, meta_rx) = mpsc::channel::<MetadataUpdate>();
    if let Some(requests) = spawn_metadata_worker(&config, meta_tx) {
        projector.set_metadata_requests(requests);
    }

    let controller = Controller::new(projector, &catalog, config.feed.base_url.clone())
        .with_catalog_path(catalog_path)
        .with_config_path(config_path);

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx);

    run_loop(controller, cmd_rx, meta_rx);
}

//  Event loop

fn run_loop(
    mut controller: Controller<StdoutHost>,
    cmd_rx: mpsc::Receiver<Command>,
    meta_rx: mpsc::Receiver<MetadataUpdate>,
) {
    info!("spotcast running");
    loop {
        let wait = controller
            .next_deadline()
            .map(|due| due.saturating_duration_since(Instant::now()))
            .unwrap_or(MAX_WAIT)
            .min(MAX_WAIT);

        match cmd_rx.recv_timeout(wait) {
            Ok(cmd) => match controller.handle(cmd) {
                Ok(()) => {}
                Err(ControllerError::InvalidInput(message)) => warn!("{}", message),
                Err(e) => error!("command error: {}", e),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        for update in meta_rx.try_iter() {
            controller.apply_metadata(update);
        }
        controller.poll();
    }
    info!("all command sources closed, exiting");
}

//  Helpers

fn spawn_command_sources(tx: mpsc::Sender<Command>) {
    let path = default_socket_path();
    std::thread::spawn(move || {
        let mut source = UnixSocketListener::new(&path);
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });
}

#[cfg(feature = "http-feed")]
fn spawn_metadata_worker(
    config: &Config,
    results: mpsc::Sender<MetadataUpdate>,
) -> Option<mpsc::Sender<spotcast::command::SpotId>> {
    use spotcast::feed::client::HttpFeed;
    use spotcast::feed::worker::MetadataWorker;

    let feed = match HttpFeed::new(config.feed.base_url.clone()) {
        Ok(feed) => feed,
        Err(e) => {
            warn!("metadata fetching disabled: {}", e);
            return None;
        }
    };
    let (tx, rx) = mpsc::channel();
    MetadataWorker::new(feed).spawn(rx, results);
    Some(tx)
}

#[cfg(not(feature = "http-feed"))]
fn spawn_metadata_worker(
    _config: &Config,
    _results: mpsc::Sender<MetadataUpdate>,
) -> Option<mpsc::Sender<spotcast::command::SpotId>> {
    info!("built without `http-feed`, freshness captions disabled");
    None
}
