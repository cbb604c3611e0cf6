//! Overlay surface geometry
//!
//! The render loop needs three things from whatever paints captions: the
//! container size and the rendered width of a piece of text. Terminal, GPU and
//! headless surfaces each answer these in their own way.

use unicode_width::UnicodeWidthStr;

/// Geometry of the surface captions are painted on
pub trait OverlaySurface {
    /// Container width, px
    fn width(&self) -> f64;

    /// Container height, px
    fn height(&self) -> f64;

    /// Rendered width of `text` at `font_size`, px
    fn measure_text(&self, text: &str, font_size: f64) -> f64;
}

/// Fixed-size surface with a per-cell width estimate
///
/// Each terminal-style display cell is half an em, so wide (CJK, emoji)
/// characters take a full em and zero-width marks take nothing. Useful
/// for headless runs and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedSurface {
    /// Width, px
    pub width: f64,
    /// Height, px
    pub height: f64,
}

impl FixedSurface {
    /// Create a surface
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl OverlaySurface for FixedSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn measure_text(&self, text: &str, font_size: f64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let cells = text.width() as f64;
        cells * font_size / 2.0
    }
}
