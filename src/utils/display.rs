//! Terminal display utilities for table output.

use terminal_size::terminal_size;
use unicode_width::UnicodeWidthChar;

/// Width assumed when the terminal size cannot be determined.
pub const DEFAULT_WIDTH: usize = 100;

/// Current terminal width in character columns.
pub fn terminal_width() -> usize {
    terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Truncate text to fit within `max_width` columns, appending an ellipsis
/// when truncation occurred. Wide characters are measured with their
/// display width, not their char count.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let widths: Vec<(char, usize)> = text
        .chars()
        .map(|c| (c, UnicodeWidthChar::width(c).unwrap_or(1)))
        .collect();
    let total: usize = widths.iter().map(|(_, w)| *w).sum();

    if total <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut used = 0;
    let mut truncated = String::new();
    for (c, w) in widths {
        if used + w > budget {
            break;
        }
        used += w;
        truncated.push(c);
    }

    if truncated.is_empty() {
        // No room for any content; the ellipsis itself must fit
        return ".".repeat(max_width.min(3));
    }
    format!("{}...", truncated)
}
