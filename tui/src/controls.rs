//! Keyboard Controls
//!
//! | Key | Action |
//! |-----|--------|
//! | `i` | Open the caption input (Enter sends, Esc cancels) |
//! | `+` / `-` | Font size up / down |
//! | `]` / `[` | Speed up / down |
//! | `.` / `,` | Opacity up / down |
//! | `}` / `{` | Lane area up / down |
//! | `a` | Toggle anti-overlap |
//! | `q` / Esc / Ctrl+C | Quit |

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use danmu_core::DisplaySettings;

/// Font size step, px
pub const FONT_STEP: f64 = 2.0;

/// Speed multiplier step
pub const SPEED_STEP: f64 = 0.25;

/// Opacity step
pub const OPACITY_STEP: f64 = 0.1;

/// Lane area step
pub const AREA_STEP: f64 = 0.1;

/// An action bound to a key outside the caption input
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Control {
    Quit,
    OpenInput,
    FontSize(f64),
    Speed(f64),
    Opacity(f64),
    Area(f64),
    ToggleAntiOverlap,
}

impl Control {
    /// Control bound to `key`, if any
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        let control = match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Self::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Self::Quit,
            KeyCode::Char('i') => Self::OpenInput,
            KeyCode::Char('+' | '=') => Self::FontSize(FONT_STEP),
            KeyCode::Char('-') => Self::FontSize(-FONT_STEP),
            KeyCode::Char(']') => Self::Speed(SPEED_STEP),
            KeyCode::Char('[') => Self::Speed(-SPEED_STEP),
            KeyCode::Char('.') => Self::Opacity(OPACITY_STEP),
            KeyCode::Char(',') => Self::Opacity(-OPACITY_STEP),
            KeyCode::Char('}') => Self::Area(AREA_STEP),
            KeyCode::Char('{') => Self::Area(-AREA_STEP),
            KeyCode::Char('a') => Self::ToggleAntiOverlap,
            _ => return None,
        };
        Some(control)
    }

    /// New settings after this control, or `None` if it is not a settings change
    ///
    /// Values go through the settings' own clamps, so stepping past a bound
    /// leaves the setting at the bound.
    pub fn apply(self, settings: DisplaySettings) -> Option<DisplaySettings> {
        let next = match self {
            Self::Quit | Self::OpenInput => return None,
            Self::FontSize(delta) => settings.with_font_size(settings.font_size + delta),
            Self::Speed(delta) => settings.with_speed(settings.speed + delta),
            Self::Opacity(delta) => settings.with_opacity(settings.opacity + delta),
            Self::Area(delta) => settings.with_area(round_tenth(settings.area + delta)),
            Self::ToggleAntiOverlap => settings.with_anti_overlap(!settings.anti_overlap),
        };
        Some(next)
    }
}

// 0.8 - 0.1 is 0.7000000000000001 otherwise
fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(Control::from_key(key(KeyCode::Char('q'))), Some(Control::Quit));
        assert_eq!(Control::from_key(key(KeyCode::Esc)), Some(Control::Quit));
        assert_eq!(
            Control::from_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Control::Quit)
        );
        assert_eq!(Control::from_key(key(KeyCode::Char('i'))), Some(Control::OpenInput));
        assert_eq!(
            Control::from_key(key(KeyCode::Char('='))),
            Some(Control::FontSize(FONT_STEP))
        );
        assert_eq!(
            Control::from_key(key(KeyCode::Char('a'))),
            Some(Control::ToggleAntiOverlap)
        );
        assert_eq!(Control::from_key(key(KeyCode::Char('c'))), None);
        assert_eq!(Control::from_key(key(KeyCode::Enter)), None);
    }

    #[test]
    fn test_font_size_stops_at_minimum() {
        let settings = DisplaySettings::default().with_font_size(13.0);
        let next = Control::FontSize(-FONT_STEP).apply(settings).unwrap();
        assert_eq!(next.font_size, 12.0);
    }

    #[test]
    fn test_speed_and_opacity_clamp() {
        let settings = DisplaySettings::default().with_speed(0.5).with_opacity(1.0);
        let slower = Control::Speed(-SPEED_STEP).apply(settings).unwrap();
        assert_eq!(slower.speed, 0.5);
        let brighter = Control::Opacity(OPACITY_STEP).apply(settings).unwrap();
        assert_eq!(brighter.opacity, 1.0);
    }

    #[test]
    fn test_area_steps_to_zero_and_back() {
        let settings = DisplaySettings::default().with_area(0.1);
        let none = Control::Area(-AREA_STEP).apply(settings).unwrap();
        assert_eq!(none.area, 0.0);
        let some = Control::Area(AREA_STEP).apply(none).unwrap();
        assert_eq!(some.area, 0.1);
    }

    #[test]
    fn test_toggle_anti_overlap() {
        let settings = DisplaySettings::default();
        let toggled = Control::ToggleAntiOverlap.apply(settings).unwrap();
        assert_eq!(toggled.anti_overlap, !settings.anti_overlap);
    }

    #[test]
    fn test_non_settings_controls() {
        assert!(Control::Quit.apply(DisplaySettings::default()).is_none());
        assert!(Control::OpenInput.apply(DisplaySettings::default()).is_none());
    }
}
