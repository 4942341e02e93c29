//! Terminal table rendering for paper, author, and citation results.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use serde_json::Value;

use crate::utils::{terminal_width, truncate_with_ellipsis};

const VENUE_WIDTH: usize = 28;
const AUTHORS_WIDTH: usize = 32;

/// Which columns to render for a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Paper,
    Author,
    /// Citation/reference rows, each wrapping a paper in a
    /// `citingPaper`/`citedPaper` envelope
    Citation,
}

/// Render an API result as a table. Accepts a bare array, a `{data: [...]}`
/// or `{recommendedPapers: [...]}` envelope, or a single record.
pub fn format_table_output(data: &Value, kind: TableKind) -> String {
    let rows = records(data);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    match kind {
        TableKind::Paper | TableKind::Citation => {
            table.set_header(vec!["Title", "Authors", "Year", "Venue", "Citations"]);
            let title_width = title_column_width();
            for row in rows {
                let paper = if kind == TableKind::Citation {
                    unwrap_citation(row)
                } else {
                    row
                };
                table.add_row(paper_row(paper, title_width));
            }
        }
        TableKind::Author => {
            table.set_header(vec!["ID", "Name", "Papers", "Citations", "h-index"]);
            for row in rows {
                table.add_row(author_row(row));
            }
        }
    }

    table.to_string()
}

/// Extract the record list from whichever envelope the endpoint used.
fn records(data: &Value) -> Vec<&Value> {
    if let Some(list) = data.as_array() {
        return list.iter().collect();
    }
    if let Some(list) = data.get("data").and_then(Value::as_array) {
        return list.iter().collect();
    }
    if let Some(list) = data.get("recommendedPapers").and_then(Value::as_array) {
        return list.iter().collect();
    }
    vec![data]
}

fn unwrap_citation(row: &Value) -> &Value {
    row.get("citingPaper")
        .or_else(|| row.get("citedPaper"))
        .unwrap_or(row)
}

/// Title gets whatever width the fixed columns leave over.
fn title_column_width() -> usize {
    terminal_width()
        .saturating_sub(VENUE_WIDTH + AUTHORS_WIDTH + 20)
        .clamp(24, 70)
}

fn paper_row(paper: &Value, title_width: usize) -> Vec<String> {
    let title = paper.get("title").and_then(Value::as_str).unwrap_or("");
    let year = paper
        .get("year")
        .and_then(Value::as_i64)
        .map(|y| y.to_string())
        .unwrap_or_default();
    let venue = paper.get("venue").and_then(Value::as_str).unwrap_or("");
    let citations = paper
        .get("citationCount")
        .and_then(Value::as_i64)
        .map(|c| c.to_string())
        .unwrap_or_default();

    vec![
        truncate_with_ellipsis(title, title_width),
        truncate_with_ellipsis(&author_names(paper), AUTHORS_WIDTH),
        year,
        truncate_with_ellipsis(venue, VENUE_WIDTH),
        citations,
    ]
}

fn author_row(author: &Value) -> Vec<String> {
    let id = author.get("authorId").and_then(Value::as_str).unwrap_or("");
    let name = author.get("name").and_then(Value::as_str).unwrap_or("");
    let papers = author
        .get("paperCount")
        .and_then(Value::as_i64)
        .map(|n| n.to_string())
        .unwrap_or_default();
    let citations = author
        .get("citationCount")
        .and_then(Value::as_i64)
        .map(|n| n.to_string())
        .unwrap_or_default();
    let h_index = author
        .get("hIndex")
        .and_then(Value::as_i64)
        .map(|n| n.to_string())
        .unwrap_or_default();

    vec![id.to_string(), name.to_string(), papers, citations, h_index]
}

/// First three author names, "et al." beyond that.
fn author_names(paper: &Value) -> String {
    let names: Vec<&str> = paper
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .filter_map(|author| author.get("name").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if names.len() > 3 {
        format!("{} et al.", names[..3].join(", "))
    } else {
        names.join(", ")
    }
}
