//! Caption Model
//!
//! A caption ("danmu") is a short viewer comment anchored to an offset from the
//! start of playback. This module owns the caption types and the pure
//! transformations every caption set goes through on its way to a viewer:
//!
//! - [`filter_banned`]: drops promotional, spoiler and commentary markers
//! - [`fallback_captions`]: deterministic set used when no upstream data exists
//! - [`CaptionWindow::apply`]: per-request time range and count limit

use serde::{Deserialize, Serialize};

/// Substrings that disqualify a caption (commentary, trailers, mashups, promotion)
pub const BANNED_SUBSTRINGS: &[&str] = &[
    "解说",
    "预告",
    "混剪",
    "吐槽",
    "推广",
    "广告",
    "预热",
    "前瞻",
    "片段合集",
];

/// Generic lines appended after the title-derived ones in the fallback set
pub const FALLBACK_LINES: &[&str] = &[
    "欢迎观看～",
    "高能预警！",
    "精彩片段来了",
    "这段节奏很棒",
    "剧情反转真妙",
];

/// Color of generated and viewer-submitted captions
pub const ACCENT_COLOR: &str = "#22c55e";

/// Offset of the first fallback caption, in seconds
const FALLBACK_START_SECS: f64 = 2.0;

/// Spacing between fallback captions, in seconds
const FALLBACK_SPACING_SECS: f64 = 5.0;

/// Default number of captions returned per request
pub const DEFAULT_LIMIT: usize = 300;

/// How a caption moves across the overlay
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionMode {
    /// Scrolls right to left (the only mode the render loop animates)
    #[default]
    Scroll,
    /// Pinned to the top edge
    Top,
    /// Pinned to the bottom edge
    Bottom,
}

impl CaptionMode {
    /// Parse a mode name, falling back to [`CaptionMode::Scroll`]
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            _ => Self::Scroll,
        }
    }
}

/// A single time-anchored caption
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptionItem {
    /// Seconds from playback start (never negative)
    pub time: f64,
    /// Caption text (never empty)
    pub text: String,
    /// CSS-style color, if the source provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Movement mode
    #[serde(default)]
    pub mode: CaptionMode,
}

impl CaptionItem {
    /// Create a scrolling caption without a color
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
            color: None,
            mode: CaptionMode::Scroll,
        }
    }

    /// Set the color
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set the mode
    #[must_use]
    pub fn with_mode(mut self, mode: CaptionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether the caption can be shown at all
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        !self.text.is_empty() && self.time.is_finite() && self.time >= 0.0
    }

    /// Whether the text contains any banned substring
    #[must_use]
    pub fn is_banned(&self) -> bool {
        BANNED_SUBSTRINGS.iter().any(|w| self.text.contains(w))
    }
}

/// Remove every caption whose text contains a banned substring
#[must_use]
pub fn filter_banned(items: Vec<CaptionItem>) -> Vec<CaptionItem> {
    items.into_iter().filter(|item| !item.is_banned()).collect()
}

/// Deterministic captions used when the upstream has nothing
///
/// Up to two title-derived lines come first, then the generic lines, spaced
/// five seconds apart from the two second mark.
#[must_use]
pub fn fallback_captions(title: &str) -> Vec<CaptionItem> {
    let title = title.trim();
    let titled = if title.is_empty() {
        Vec::new()
    } else {
        vec![format!("{title} 开场"), format!("{title} 名场面")]
    };

    titled
        .into_iter()
        .chain(FALLBACK_LINES.iter().map(|line| (*line).to_string()))
        .enumerate()
        .map(|(i, text)| {
            #[allow(clippy::cast_precision_loss)]
            let time = FALLBACK_START_SECS + i as f64 * FALLBACK_SPACING_SECS;
            CaptionItem::new(time, text).with_color(ACCENT_COLOR)
        })
        .collect()
}

/// Per-request view over a cached caption set
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptionWindow {
    /// Lower bound in seconds (only used when `to > 0`)
    pub from: f64,
    /// Upper bound in seconds; `0` disables range filtering
    pub to: f64,
    /// Maximum number of captions returned
    pub limit: usize,
}

impl Default for CaptionWindow {
    fn default() -> Self {
        Self {
            from: 0.0,
            to: 0.0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl CaptionWindow {
    /// Apply the range filter, then truncate to the limit
    #[must_use]
    pub fn apply(&self, items: &[CaptionItem]) -> Vec<CaptionItem> {
        let ranged = self.to > 0.0;
        items
            .iter()
            .filter(|item| !ranged || (item.time >= self.from && item.time <= self.to))
            .take(self.limit)
            .cloned()
            .collect()
    }
}
