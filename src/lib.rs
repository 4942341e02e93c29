//! # s2cli
//!
//! A command-line client for the Semantic Scholar API: search academic
//! papers, look up authors, fetch citation graphs, and export BibTeX.
//!
//! ## Architecture
//!
//! The library is organized into a few modules:
//!
//! - [`api`]: the retry-aware request pipeline and error taxonomy
//! - [`formatters`]: JSON, table, and BibTeX output formatting
//! - [`config`]: configuration file support
//! - [`utils`]: terminal display helpers

pub mod api;
pub mod config;
pub mod formatters;
pub mod utils;

// Re-export commonly used types
pub use api::{ApiError, ClientError, ErrorCode, RetryPolicy, SemanticScholar};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
