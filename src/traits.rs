//! Core traits that decouple spotcast from any specific UI toolkit, clock,
//! image feed or transport mechanism.
//!
//! Every concrete backend (the JSON-lines host, the HTTP feed, a Unix-socket
//! listener, a test harness, …) implements one of these traits.  The
//! [`Projector`](crate::projector::Projector) only depends on these
//! abstractions.

use crate::command::{Command, DisplayInfo, SpotId, WindowId};
use crate::geometry::Rect;
use crate::render::RenderTree;
use std::sync::mpsc;
use std::time::Instant;

/// Abstraction over the windowing side of the application: display
/// enumeration and the projection windows themselves.
///
/// An implementation might drive a real toolkit, forward events to another
/// process, or record calls in tests.  All methods are called on the UI
/// thread.
pub trait ProjectionHost {
    /// The error type produced by this host.
    type Error: std::error::Error + Send + 'static;

    /// Return the displays currently attached.
    fn displays(&self) -> Result<Vec<DisplayInfo>, Self::Error>;

    /// Open a borderless, non-resizable window on `display` covering
    /// `geometry` (logical units) and return its handle.
    fn open_window(&self, display: &DisplayInfo, geometry: Rect) -> Result<WindowId, Self::Error>;

    /// Reposition an open window.
    fn move_window(&self, window: WindowId, geometry: Rect) -> Result<(), Self::Error>;

    /// Replace the window's content.
    ///
    /// Image views are bound to URLs; the host fetches them and must keep
    /// showing the previous frame when a fetch fails.
    fn set_content(&self, window: WindowId, content: &RenderTree) -> Result<(), Self::Error>;

    /// Close a window.  Closing an unknown window is not an error.
    fn close_window(&self, window: WindowId) -> Result<(), Self::Error>;
}

/// Time source for timers and cache tokens.
pub trait Clock {
    /// Monotonic time for timer deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock seconds since the Unix epoch, used as cache token.
    fn unix_timestamp(&self) -> i64;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Blocking access to the image feed's metadata endpoint.
///
/// Implementations run on a worker thread, never on the UI thread.
pub trait FeedSource: Send + Sync + 'static {
    /// The error type produced by this feed.
    type Error: std::error::Error + Send + 'static;

    /// Fetch the feed's `lastModified` time string for `spot`, or `None`
    /// if the feed does not report one.
    fn last_modified(&self, spot: SpotId) -> Result<Option<String>, Self::Error>;
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a Unix socket, an in-memory
/// channel) and forward parsed commands into the provided
/// [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ProjectionMode;
    use std::sync::mpsc;

    /// A test double that emits a fixed sequence of commands.
    struct MockSource {
        commands: Vec<Command>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    impl CommandSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), MockError> {
            for cmd in self.commands.drain(..) {
                let _ = sink.send(cmd);
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_commands() {
        let mut src = MockSource {
            commands: vec![
                Command::SetMode {
                    window: WindowId(1),
                    mode: ProjectionMode::Grid,
                },
                Command::StopAll,
            ],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[1], Command::StopAll);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let c = SystemClock;
        let a = c.now();
        let b = c.now();
        assert!(b >= a);
        assert!(c.unix_timestamp() > 1_600_000_000);
    }
}
