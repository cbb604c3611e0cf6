//! Moving overlay elements
//!
//! An element is the spawned form of a caption: its lane, its travel, and the
//! moment it started moving. Painting is left to the surface; the element only
//! answers where it is at a given time.

use serde::{Deserialize, Serialize};

use crate::caption::CaptionMode;

/// Opaque identifier of a spawned element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "el-{}", self.0)
    }
}

/// A caption moving across the overlay
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayElement {
    /// Identifier
    pub handle: ElementHandle,
    /// Caption text
    pub text: String,
    /// Text color
    pub color: String,
    /// Movement mode of the source caption
    pub mode: CaptionMode,
    /// Font size, px
    pub font_size: f64,
    /// Opacity in `[0.2, 1]`
    pub opacity: f64,
    /// Lane index
    pub lane: usize,
    /// Vertical offset, px
    pub top: f64,
    /// Measured width, px
    pub width: f64,
    /// Left edge at the start of the animation, px
    pub start_x: f64,
    /// Horizontal travel, px
    pub distance: f64,
    /// Time to cross, ms
    pub duration_ms: f64,
    /// Animation start, ms
    pub started_at_ms: u64,
}

/// Where an element is at a given instant
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementPosition {
    /// Left edge, px (negative once partly off the left side)
    pub x: f64,
    /// Top edge, px
    pub y: f64,
    /// Animation progress in `[0, 1]`
    pub progress: f64,
}

impl OverlayElement {
    /// Fraction of the animation completed at `now_ms`
    #[must_use]
    pub fn progress(&self, now_ms: u64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let elapsed = now_ms.saturating_sub(self.started_at_ms) as f64;
        (elapsed / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Position at `now_ms`, linearly interpolated along the travel
    #[must_use]
    pub fn position(&self, now_ms: u64) -> ElementPosition {
        let progress = self.progress(now_ms);
        ElementPosition {
            x: self.start_x - progress * self.distance,
            y: self.top,
            progress,
        }
    }

    /// Whether the element has fully crossed the overlay
    #[must_use]
    pub fn is_finished(&self, now_ms: u64) -> bool {
        self.progress(now_ms) >= 1.0
    }
}
