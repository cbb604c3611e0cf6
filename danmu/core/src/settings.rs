//! Display settings and their persistence
//!
//! Settings are stored as camelCase JSON under the `danmu_settings` key, the
//! same shape web surfaces use, and are kept until the viewer changes them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::LocalStore;

/// Local store key for display settings
pub const SETTINGS_KEY: &str = "danmu_settings";

/// Smallest font size in px
pub const MIN_FONT_SIZE: f64 = 12.0;
/// Slowest speed multiplier
pub const MIN_SPEED: f64 = 0.5;
/// Most transparent opacity allowed
pub const MIN_OPACITY: f64 = 0.2;

/// Viewer display preferences
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    /// Font size in px (≥ 12)
    pub font_size: f64,
    /// Speed multiplier applied to the 120 px/s base (≥ 0.5)
    pub speed: f64,
    /// Caption opacity in `[0.2, 1]`
    pub opacity: f64,
    /// Fraction of the overlay height given to lanes, `[0, 1]`
    pub area: f64,
    /// Reserve lanes for the full crossing time instead of half of it
    pub anti_overlap: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            font_size: 18.0,
            speed: 1.0,
            opacity: 0.9,
            area: 0.8,
            anti_overlap: true,
        }
    }
}

/// Unset (zero) or non-finite input falls back to the default
fn or_default(value: f64, default: f64) -> f64 {
    if value.is_finite() && value != 0.0 {
        value
    } else {
        default
    }
}

impl DisplaySettings {
    /// Set the font size, clamped to at least 12 px
    #[must_use]
    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = or_default(font_size, Self::default().font_size).max(MIN_FONT_SIZE);
        self
    }

    /// Set the speed multiplier, clamped to at least 0.5
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = or_default(speed, Self::default().speed).max(MIN_SPEED);
        self
    }

    /// Set the opacity, clamped to `[0.2, 1]`
    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = or_default(opacity, Self::default().opacity).clamp(MIN_OPACITY, 1.0);
        self
    }

    /// Set the lane area, clamped to `[0, 1]`
    #[must_use]
    pub fn with_area(mut self, area: f64) -> Self {
        self.area = if area.is_finite() {
            area.clamp(0.0, 1.0)
        } else {
            Self::default().area
        };
        self
    }

    /// Set anti-overlap
    #[must_use]
    pub fn with_anti_overlap(mut self, anti_overlap: bool) -> Self {
        self.anti_overlap = anti_overlap;
        self
    }

    /// Re-apply every bound (used on values read from storage)
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self::default()
            .with_font_size(self.font_size)
            .with_speed(self.speed)
            .with_opacity(self.opacity)
            .with_area(self.area)
            .with_anti_overlap(self.anti_overlap)
    }
}

/// Persists [`DisplaySettings`] in a [`LocalStore`]
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn LocalStore>,
}

impl SettingsStore {
    /// Create a settings store
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Load settings, falling back to defaults on any failure
    pub async fn load(&self) -> DisplaySettings {
        match self.store.get(SETTINGS_KEY).await {
            Ok(Some(raw)) => serde_json::from_str::<DisplaySettings>(&raw)
                .map(DisplaySettings::sanitized)
                .unwrap_or_else(|e| {
                    debug!(error = %e, "Ignoring unreadable display settings");
                    DisplaySettings::default()
                }),
            Ok(None) => DisplaySettings::default(),
            Err(e) => {
                debug!(error = %e, "Display settings read failed");
                DisplaySettings::default()
            }
        }
    }

    /// Persist settings (best effort)
    pub async fn save(&self, settings: &DisplaySettings) {
        let raw = match serde_json::to_string(settings) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "Failed to encode display settings");
                return;
            }
        };
        if let Err(e) = self.store.set(SETTINGS_KEY, &raw).await {
            debug!(error = %e, "Display settings write failed");
        }
    }
}
