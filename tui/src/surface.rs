//! Terminal Surface
//!
//! Maps the overlay's pixel geometry onto terminal cells. One cell is treated
//! as 8 px wide and 16 px tall, so a 120x40 overlay area behaves like a
//! 960x640 video frame to the render loop.

use danmu_core::OverlaySurface;
use ratatui::layout::Rect;
use unicode_width::UnicodeWidthStr;

/// Width of one terminal cell, px
pub const CELL_WIDTH_PX: f64 = 8.0;

/// Height of one terminal cell, px
pub const CELL_HEIGHT_PX: f64 = 16.0;

/// The overlay area of the terminal, in cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TerminalSurface {
    area: Rect,
}

impl TerminalSurface {
    pub fn new(area: Rect) -> Self {
        Self { area }
    }

    /// Cell rectangle captions are painted into
    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn resize(&mut self, area: Rect) {
        self.area = area;
    }

    /// Cell offset (column, row) inside the area for a pixel position
    ///
    /// Columns may be negative or past the right edge while an element is
    /// entering or leaving; callers clip.
    pub fn to_cell(&self, x_px: f64, y_px: f64) -> (i32, i32) {
        let col = (x_px / CELL_WIDTH_PX).floor();
        let row = (y_px / CELL_HEIGHT_PX).floor();
        (saturate(col), saturate(row))
    }
}

impl OverlaySurface for TerminalSurface {
    fn width(&self) -> f64 {
        f64::from(self.area.width) * CELL_WIDTH_PX
    }

    fn height(&self) -> f64 {
        f64::from(self.area.height) * CELL_HEIGHT_PX
    }

    // Font size has no effect on a terminal; wide glyphs take two cells.
    fn measure_text(&self, text: &str, _font_size: f64) -> f64 {
        text.width() as f64 * CELL_WIDTH_PX
    }
}

#[allow(clippy::cast_possible_truncation)]
fn saturate(value: f64) -> i32 {
    value.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}
