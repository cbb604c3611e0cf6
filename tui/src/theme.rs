//! Theme and Colors

use ratatui::style::Color;

// ============================================================================
// UI Colors
// ============================================================================

/// Video placeholder frame
pub const FRAME_GRAY: Color = Color::Rgb(70, 70, 80);

/// Video title
pub const TITLE_WHITE: Color = Color::Rgb(220, 220, 230);

/// Caption input (matches the accent given to user captions)
pub const USER_GREEN: Color = Color::Rgb(34, 197, 94);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Loading indicator
pub const LOADING_BLUE: Color = Color::Rgb(150, 180, 255);

// ============================================================================
// Caption Colors
// ============================================================================

/// Terminal color for a caption's `#rrggbb` color at `opacity`
///
/// Terminals have no alpha, so opacity darkens the color toward the (assumed
/// dark) background. Anything that is not `#rrggbb` or `#rgb` paints white.
pub fn caption_color(hex: &str, opacity: f64) -> Color {
    let (r, g, b) = parse_hex(hex).unwrap_or((255, 255, 255));
    let opacity = opacity.clamp(0.0, 1.0);
    Color::Rgb(scale(r, opacity), scale(g, opacity), scale(b, opacity))
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if !digits.is_ascii() {
        return None;
    }
    match digits.len() {
        6 => Some((
            u8::from_str_radix(&digits[0..2], 16).ok()?,
            u8::from_str_radix(&digits[2..4], 16).ok()?,
            u8::from_str_radix(&digits[4..6], 16).ok()?,
        )),
        3 => {
            let nibble = |i: usize| u8::from_str_radix(&digits[i..=i], 16).ok().map(|v| v * 17);
            Some((nibble(0)?, nibble(1)?, nibble(2)?))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale(channel: u8, opacity: f64) -> u8 {
    (f64::from(channel) * opacity).round() as u8
}
