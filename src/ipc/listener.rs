//! Unix-socket [`CommandSource`] implementation.
//!
//! Binds a Unix stream socket and serves each connection on its own thread.
//! Each line received is parsed as a JSON-encoded [`Command`].
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"Project":{"spots":[14,15,30],"display":"HDMI-A-1","mode":"grid"}}
//! {"Project":{"spots":[14],"display":1,"mode":"slideshow"}}
//! {"SetMode":{"window":1,"mode":"rotating"}}
//! {"SetRotationInterval":"5s"}
//! {"StopWindow":1}
//! "StopAll"
//! "DisplaysChanged"
//! ```

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader, Read};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// A [`CommandSource`] that listens on a Unix stream socket for
/// JSON-encoded commands.
///
/// Each accepted connection can send multiple newline-delimited JSON
/// commands.  Connections are served concurrently; commands from different
/// clients interleave in arrival order.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse one line of input.  Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Command>, UnixSocketError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](CommandSource::run) is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Forward every command read from `stream` into `sink`.
///
/// Returns `false` once the sink is closed.
fn forward_commands(stream: impl Read, sink: &mpsc::Sender<Command>) -> bool {
    for line in BufReader::new(stream).lines() {
        let text = match line {
            Ok(text) => text,
            Err(e) => {
                warn!("read error: {}", e);
                break;
            }
        };
        match parse_line(&text) {
            Ok(None) => {}
            Ok(Some(cmd)) => {
                debug!("received {:?}", cmd);
                if sink.send(cmd).is_err() {
                    return false;
                }
            }
            Err(e) => warn!("ignoring bad command {:?}: {}", text, e),
        }
    }
    true
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// Every connection is served on its own thread, so a long-lived
    /// client such as the renderer never holds up operator commands.
    ///
    /// This method **blocks** until the sink closes.  Run it on a dedicated
    /// thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        // A stale socket from a previous run would make bind fail.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        let sink_closed = Arc::new(AtomicBool::new(false));
        for stream in listener.incoming() {
            if sink_closed.load(Ordering::SeqCst) {
                info!("command sink closed, shutting down listener");
                let _ = std::fs::remove_file(&self.path);
                return Ok(());
            }
            match stream {
                Ok(stream) => {
                    let sink = sink.clone();
                    let closed = Arc::clone(&sink_closed);
                    let spawned = std::thread::Builder::new()
                        .name("spotcast-client".into())
                        .spawn(move || {
                            debug!("client connected");
                            if !forward_commands(stream, &sink) {
                                closed.store(true, Ordering::SeqCst);
                            }
                            debug!("client disconnected");
                        });
                    if let Err(e) = spawned {
                        error!("failed to spawn client thread: {}", e);
                    }
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
        Ok(())
    }
}

//  Tests
