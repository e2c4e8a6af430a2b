//! Display renderer.
//!
//! Pure functions from `(mode, ordered spots, window bounds)` to a
//! [`RenderTree`] the host can draw.  Nothing here schedules timers or
//! touches windows; the [`Projector`](crate::projector::Projector) decides
//! *when* to render and hands the tree to the host.
//!
//! Grid layout fills a `side × side` grid row-major in selection order,
//! where `side = ceil(sqrt(n))`.  Trailing cells stay empty when `n` is not
//! a perfect square.

use crate::command::SpotId;
use crate::geometry::Rect;
use crate::spot::Spot;
use serde::Serialize;
use std::rc::Rc;

/// `sqrt(cell area) / OVERLAY_FONT_DIVISOR` gives the caption font size.
pub const OVERLAY_FONT_DIVISOR: f64 = 25.0;
/// Captions never shrink below this size.
pub const MIN_OVERLAY_FONT: f64 = 12.0;

/// Which layout to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Show only the spot at `index` (taken modulo the selection length).
    Rotating { index: usize },
    Grid,
}

/// Name and freshness text drawn over an image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Caption {
    pub name: String,
    pub freshness: Option<String>,
    pub font_size: f64,
}

/// One image bound to a spot's effective URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub spot: SpotId,
    pub url: String,
    /// Window-local bounds.
    pub bounds: Rect,
    pub caption: Caption,
}

/// Content for one projection window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderTree {
    /// Nothing to show (empty selection).
    Empty,
    Single(ImageView),
    Grid {
        side: usize,
        /// `side * side` cells, row-major; `None` for unused trailing cells.
        cells: Vec<Option<ImageView>>,
    },
}

impl RenderTree {
    /// Spot ids currently on screen, in layout order.
    pub fn spot_ids(&self) -> Vec<SpotId> {
        match self {
            RenderTree::Empty => Vec::new(),
            RenderTree::Single(view) => vec![view.spot],
            RenderTree::Grid { cells, .. } => cells.iter().flatten().map(|v| v.spot).collect(),
        }
    }
}

/// Rows (and columns) of the square grid holding `count` images.
pub fn grid_side(count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let mut side = (count as f64).sqrt().ceil() as usize;
    // Guard against float rounding at perfect squares.
    while side * side < count {
        side += 1;
    }
    while side > 1 && (side - 1) * (side - 1) >= count {
        side -= 1;
    }
    side
}

/// Caption font size for an image of `width × height`.
pub fn overlay_font_size(width: f64, height: f64) -> f64 {
    ((width * height).max(0.0).sqrt() / OVERLAY_FONT_DIVISOR).max(MIN_OVERLAY_FONT)
}

/// Render `spots` into a window of size `bounds` (origin is ignored; all
/// view bounds are window-local).
pub fn render(mode: RenderMode, spots: &[Rc<Spot>], bounds: Rect) -> RenderTree {
    if spots.is_empty() {
        return RenderTree::Empty;
    }
    let area = bounds.local();
    match mode {
        RenderMode::Rotating { index } => {
            RenderTree::Single(image_view(&spots[index % spots.len()], area))
        }
        RenderMode::Grid => {
            let side = grid_side(spots.len());
            let cell_w = area.width / side as f64;
            let cell_h = area.height / side as f64;
            let cells = (0..side * side)
                .map(|i| {
                    spots.get(i).map(|spot| {
                        let (row, col) = (i / side, i % side);
                        let cell = Rect::new(col as f64 * cell_w, row as f64 * cell_h, cell_w, cell_h);
                        image_view(spot, cell)
                    })
                })
                .collect();
            RenderTree::Grid { side, cells }
        }
    }
}

fn image_view(spot: &Spot, bounds: Rect) -> ImageView {
    ImageView {
        spot: spot.id(),
        url: spot.effective_url(),
        bounds,
        caption: Caption {
            name: spot.name().to_string(),
            freshness: spot.freshness(),
            font_size: overlay_font_size(bounds.width, bounds.height),
        },
    }
}
