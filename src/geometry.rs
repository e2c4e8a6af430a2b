//! DPI-aware window geometry.
//!
//! Hosts report displays in physical pixels; projection windows are placed
//! in logical units where one unit is one pixel at [`REFERENCE_DPI`].  The
//! size of a window is divided by the display's scale factor, but its
//! origin stays in the global virtual-desktop space.  Dividing the origin
//! too would pull windows on non-primary displays towards `(0, 0)` whenever
//! the displays use different scale factors.

use crate::command::DisplayInfo;
use serde::{Deserialize, Serialize};

/// DPI that corresponds to a scale factor of `1.0`.
pub const REFERENCE_DPI: f64 = 96.0;

/// An axis-aligned rectangle in logical units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The same size, anchored at `(0, 0)`.
    pub fn local(&self) -> Self {
        Self::new(0.0, 0.0, self.width, self.height)
    }
}

/// Scale factor for a reported DPI.  Unknown or nonsensical values fall
/// back to `1.0`.
pub fn scale_factor(dpi: Option<f64>) -> f64 {
    match dpi {
        Some(dpi) if dpi.is_finite() && dpi > 0.0 => dpi / REFERENCE_DPI,
        _ => 1.0,
    }
}

/// Resolve the logical window geometry that covers `display`.
///
/// Size is scaled, origin is not.
pub fn resolve_window_geometry(display: &DisplayInfo) -> Rect {
    resolve_window_geometry_with(display, false)
}

/// Like [`resolve_window_geometry`], optionally dividing the origin by the
/// scale factor as well.  Some hosts position windows in per-display
/// logical space; `scale_origin` exists for those.
pub fn resolve_window_geometry_with(display: &DisplayInfo, scale_origin: bool) -> Rect {
    let scale = scale_factor(display.dpi);
    let (x, y) = if scale_origin {
        (display.x as f64 / scale, display.y as f64 / scale)
    } else {
        (display.x as f64, display.y as f64)
    };
    Rect {
        x,
        y,
        width: display.width as f64 / scale,
        height: display.height as f64 / scale,
    }
}
