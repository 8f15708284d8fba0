//! Text layout for the 16x2 character LCD.

use core::fmt::Write;

use crate::capacity::CapacityData;

/// Characters per LCD row.
pub const LCD_COLS: usize = 16;

/// One fully laid-out LCD row.
pub type Line = heapless::String<LCD_COLS>;

/// Truncate `text` to the row width and pad with spaces, so writing the
/// row always overwrites stale characters.  Non-ASCII characters (the
/// HD44780 ROM cannot show them) become `?`.
pub fn fit_line(text: &str) -> Line {
    let mut line = Line::new();
    for c in text.chars().take(LCD_COLS) {
        let c = if c.is_ascii() && !c.is_ascii_control() { c } else { '?' };
        let _ = line.push(c);
    }
    while line.len() < LCD_COLS {
        let _ = line.push(' ');
    }
    line
}

/// The idle capacity screen: `Cap: 50%` over the status label.  The
/// percentage is truncated so the number never crosses a status threshold
/// ahead of the label.
pub fn capacity_screen(data: &CapacityData) -> (Line, Line) {
    let mut first = heapless::String::<32>::new();
    let _ = write!(first, "Cap: {}%", data.percentage as u8);
    (fit_line(&first), fit_line(data.status.label()))
}
