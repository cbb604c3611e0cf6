//! Overlay Painting
//!
//! Layout, top to bottom: the video placeholder with captions scrolling over
//! it, a status line, and the caption input line.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use danmu_core::{DisplaySettings, OverlayElement};

use crate::surface::TerminalSurface;
use crate::theme::{caption_color, DIM_GRAY, FRAME_GRAY, LOADING_BLUE, TITLE_WHITE, USER_GREEN};

/// Rows below the overlay: status and input
pub const CHROME_HEIGHT: u16 = 2;

/// Key hints for the idle input row; fits an 80-column terminal
const KEY_HINTS: &str =
    " i: comment  +/- size  [ ] speed  , . opacity  { } area  a: overlap  q: quit";

/// Everything one frame needs, borrowed from the app
pub struct View<'a> {
    pub title: &'a str,
    pub elapsed_secs: f64,
    pub now_ms: u64,
    pub elements: &'a [OverlayElement],
    pub surface: &'a TerminalSurface,
    pub settings: DisplaySettings,
    pub lane_count: usize,
    pub queued: usize,
    pub loading: bool,
    pub input: Option<&'a str>,
}

/// Split the terminal into (video frame, status line, input line)
pub fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let [video, status, input] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);
    (video, status, input)
}

/// Cells inside the video frame border
pub fn overlay_area(area: Rect) -> Rect {
    let (video, _, _) = layout(area);
    Block::default().borders(Borders::ALL).inner(video)
}

pub fn draw(frame: &mut Frame, view: &View<'_>) {
    let (video, status, input) = layout(frame.area());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(FRAME_GRAY))
        .title(format!(" ▶ {} ", view.title))
        .title_style(Style::default().fg(TITLE_WHITE).add_modifier(Modifier::BOLD));
    frame.render_widget(block, video);

    draw_captions(frame, view);

    frame.render_widget(
        Paragraph::new(status_line(view)).style(Style::default().fg(DIM_GRAY)),
        status,
    );

    let input_line = match view.input {
        Some(text) => Paragraph::new(format!(" > {text}_")).style(Style::default().fg(USER_GREEN)),
        None if view.loading => {
            Paragraph::new(" Loading captions...").style(Style::default().fg(LOADING_BLUE))
        }
        None => Paragraph::new(KEY_HINTS).style(Style::default().fg(DIM_GRAY)),
    };
    frame.render_widget(input_line, input);
}

fn draw_captions(frame: &mut Frame, view: &View<'_>) {
    let area = view.surface.area();
    let buf = frame.buffer_mut();

    for element in view.elements {
        let position = element.position(view.now_ms);
        let (col, row) = view.surface.to_cell(position.x, position.y);
        let Ok(row) = u16::try_from(row) else {
            continue;
        };
        if row >= area.height {
            continue;
        }
        let Some((offset, visible)) = clip_line(&element.text, col, area.width) else {
            continue;
        };
        let style = Style::default()
            .fg(caption_color(&element.color, element.opacity))
            .add_modifier(Modifier::BOLD);
        buf.set_string(area.x + offset, area.y + row, visible, style);
    }
}

fn status_line(view: &View<'_>) -> String {
    let total = view.elapsed_secs.max(0.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = total as u64;
    format!(
        " {:02}:{:02} | {} on screen, {} queued | {} lanes | {}px {:.2}x {:.0}%{}",
        secs / 60,
        secs % 60,
        view.elements.len(),
        view.queued,
        view.lane_count,
        view.settings.font_size,
        view.settings.speed,
        view.settings.opacity * 100.0,
        if view.settings.anti_overlap {
            " anti-overlap"
        } else {
            ""
        },
    )
}

/// Visible part of `text` starting at column `col` in a row `width` cells wide
///
/// Returns the column offset of the first visible glyph and the glyphs that
/// fit. A wide glyph cut by either edge is dropped whole.
pub fn clip_line(text: &str, col: i32, width: u16) -> Option<(u16, String)> {
    let width = i32::from(width);
    let mut cursor = col;
    let mut start = None;
    let mut visible = String::new();

    for ch in text.chars() {
        let w = i32::try_from(ch.width().unwrap_or(0)).unwrap_or(0);
        if cursor >= width {
            break;
        }
        if cursor >= 0 && cursor + w <= width {
            if start.is_none() {
                start = Some(cursor);
            }
            visible.push(ch);
        } else if start.is_some() {
            break;
        }
        cursor += w;
    }

    let start = u16::try_from(start?).ok()?;
    Some((start, visible))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use unicode_width::UnicodeWidthStr;

    #[test]
    fn test_clip_fully_visible() {
        assert_eq!(clip_line("hello", 3, 20), Some((3, "hello".to_string())));
    }

    #[test]
    fn test_clip_entering_from_right() {
        assert_eq!(clip_line("hello", 17, 20), Some((17, "hel".to_string())));
        assert_eq!(clip_line("hello", 20, 20), None);
    }

    #[test]
    fn test_clip_leaving_on_left() {
        assert_eq!(clip_line("hello", -2, 20), Some((0, "llo".to_string())));
        assert_eq!(clip_line("hello", -5, 20), None);
    }

    #[test]
    fn test_clip_drops_split_wide_glyph() {
        // 前 occupies columns -1..1, so only 方 is drawn
        assert_eq!(clip_line("前方", -1, 20), Some((1, "方".to_string())));
        // 方 would need columns 19..21
        assert_eq!(clip_line("前方", 17, 20), Some((17, "前".to_string())));
    }

    #[test]
    fn test_key_hints_fit_standard_terminal() {
        assert!(KEY_HINTS.width() <= 80, "{} columns", KEY_HINTS.width());
        assert!(KEY_HINTS.ends_with("q: quit"));
    }

    #[test]
    fn test_layout_reserves_chrome_rows() {
        let (video, status, input) = layout(Rect::new(0, 0, 80, 24));
        assert_eq!(video.height, 24 - CHROME_HEIGHT);
        assert_eq!(status.y, 22);
        assert_eq!(input.y, 23);
        assert_eq!(overlay_area(Rect::new(0, 0, 80, 24)), Rect::new(1, 1, 78, 20));
    }
}
