//! JSON-lines projection host.
//!
//! Every window operation becomes one line on the output stream:
//!
//! ```json
//! {"event":"open","window":1,"display":"DP-1","geometry":{"x":0.0,"y":0.0,"width":2560.0,"height":1440.0}}
//! {"event":"content","window":1,"content":{"Single":{"spot":14,"url":"...","bounds":{...},"caption":{...}}}}
//! {"event":"move","window":1,"geometry":{...}}
//! {"event":"close","window":1}
//! ```
//!
//! A renderer process reads the stream and owns the real windows.  When
//! the operator closes one, it reports back with a `WindowClosed` command
//! on the control socket.

use super::{DisplaySource, HostError};
use crate::command::{DisplayInfo, WindowId};
use crate::geometry::Rect;
use crate::render::RenderTree;
use crate::traits::ProjectionHost;
use log::debug;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::io::Write;

/// One line of host output.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent<'a> {
    Open {
        window: WindowId,
        display: &'a str,
        geometry: Rect,
    },
    Move {
        window: WindowId,
        geometry: Rect,
    },
    Content {
        window: WindowId,
        content: &'a RenderTree,
    },
    Close {
        window: WindowId,
    },
}

pub struct StdoutHost {
    displays: DisplaySource,
    out: RefCell<Box<dyn Write>>,
    next_window: Cell<u64>,
    open: RefCell<Vec<WindowId>>,
}

impl StdoutHost {
    /// Write events to standard output.
    pub fn new(displays: DisplaySource) -> Self {
        Self::with_writer(displays, Box::new(std::io::stdout()))
    }

    pub fn with_writer(displays: DisplaySource, out: Box<dyn Write>) -> Self {
        Self {
            displays,
            out: RefCell::new(out),
            next_window: Cell::new(0),
            open: RefCell::new(Vec::new()),
        }
    }

    pub fn open_windows(&self) -> Vec<WindowId> {
        self.open.borrow().clone()
    }

    fn emit(&self, event: &HostEvent<'_>) -> Result<(), HostError> {
        let line = serde_json::to_string(event).map_err(|e| HostError(format!("encode: {}", e)))?;
        let mut out = self.out.borrow_mut();
        writeln!(out, "{}", line)
            .and_then(|_| out.flush())
            .map_err(|e| HostError(format!("write: {}", e)))
    }

    fn ensure_open(&self, window: WindowId) -> Result<(), HostError> {
        if self.open.borrow().contains(&window) {
            Ok(())
        } else {
            Err(HostError(format!("{} is not open", window)))
        }
    }
}

impl ProjectionHost for StdoutHost {
    type Error = HostError;

    fn displays(&self) -> Result<Vec<DisplayInfo>, HostError> {
        self.displays.load()
    }

    fn open_window(&self, display: &DisplayInfo, geometry: Rect) -> Result<WindowId, HostError> {
        let window = WindowId(self.next_window.get() + 1);
        self.emit(&HostEvent::Open {
            window,
            display: &display.name,
            geometry,
        })?;
        self.next_window.set(window.0);
        self.open.borrow_mut().push(window);
        debug!("opened {} on {}", window, display.name);
        Ok(window)
    }

    fn move_window(&self, window: WindowId, geometry: Rect) -> Result<(), HostError> {
        self.ensure_open(window)?;
        self.emit(&HostEvent::Move { window, geometry })
    }

    fn set_content(&self, window: WindowId, content: &RenderTree) -> Result<(), HostError> {
        self.ensure_open(window)?;
        self.emit(&HostEvent::Content { window, content })
    }

    fn close_window(&self, window: WindowId) -> Result<(), HostError> {
        let was_open = {
            let mut open = self.open.borrow_mut();
            let before = open.len();
            open.retain(|w| *w != window);
            open.len() != before
        };
        if !was_open {
            debug!("close of unknown {}, ignoring", window);
            return Ok(());
        }
        self.emit(&HostEvent::Close { window })
    }
}
