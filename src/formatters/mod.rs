//! Output formatters.
//!
//! Three renderings of API results: pretty JSON with an optional metadata
//! envelope, terminal tables, and BibTeX citation records.

mod bibtex;
mod json;
mod table;

pub use bibtex::{format_bibtex_output, to_bibtex};
pub use json::format_json_output;
pub use table::{format_table_output, TableKind};
