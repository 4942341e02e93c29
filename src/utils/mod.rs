//! Shared helpers for terminal output.

mod display;

pub use display::{terminal_width, truncate_with_ellipsis, DEFAULT_WIDTH};
