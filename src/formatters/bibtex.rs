//! BibTeX citation generation.
//!
//! Converts raw paper records into BibTeX entries: normalizes Unicode
//! author and title text, derives deterministic citation keys, classifies
//! entry types from venue heuristics, and escapes reserved characters.

use serde_json::Value;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Words skipped when picking the title component of a citation key.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "on", "in", "at", "to", "and", "or", "for", "with", "by", "from",
];

/// Characters that must be backslash-escaped in BibTeX field values.
const RESERVED: &[char] = &['&', '%', '$', '#', '_', '{', '}'];

/// Strip combining diacritical marks, reducing accented Latin characters
/// to their base ASCII form ("café" -> "cafe"). Characters with no ASCII
/// decomposition pass through unchanged.
fn normalize_text(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Backslash-escape BibTeX-reserved characters. Absent input maps to an
/// empty string.
fn escape_value(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Lower-case a word and drop everything that is not alphanumeric.
fn keyify(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Derive a citation key from first-author family name, year, and the
/// first non-stopword title token. Deterministic, lower-case, no
/// whitespace. Fallbacks: `unknown`, `nodate`, `paper`.
///
/// The family name is the last whitespace token of the normalized author
/// name; surname particles ("van", "de") are dropped along with the given
/// names. Best-effort heuristic, not a correctness guarantee.
fn cite_key(paper: &Value) -> String {
    let family = paper
        .get("authors")
        .and_then(Value::as_array)
        .and_then(|authors| authors.first())
        .and_then(|author| author.get("name"))
        .and_then(Value::as_str)
        .map(normalize_text)
        .and_then(|name| name.split_whitespace().last().map(keyify))
        .filter(|token| !token.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let year = year_of(paper).unwrap_or_else(|| "nodate".to_string());

    let title_word = paper
        .get("title")
        .and_then(Value::as_str)
        .map(normalize_text)
        .and_then(|title| {
            title
                .split_whitespace()
                .map(keyify)
                .find(|word| !word.is_empty() && !STOPWORDS.contains(&word.as_str()))
        })
        .unwrap_or_else(|| "paper".to_string());

    format!("{}{}{}", family, year, title_word)
}

/// Classify a record as `inproceedings` or `article`. The publication
/// venue type wins over venue-name substring matching; arXiv-only and
/// unknown-venue papers default to `article`.
fn entry_type(paper: &Value) -> &'static str {
    if let Some(kind) = paper
        .pointer("/publicationVenue/type")
        .and_then(Value::as_str)
    {
        match kind {
            "conference" => return "inproceedings",
            "journal" => return "article",
            _ => {}
        }
    }

    if let Some(venue) = paper.get("venue").and_then(Value::as_str) {
        let venue = venue.to_lowercase();
        if venue.contains("conference") || venue.contains("workshop") {
            return "inproceedings";
        }
        if venue.contains("journal") {
            return "article";
        }
    }

    "article"
}

fn year_of(paper: &Value) -> Option<String> {
    match paper.get("year") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Render one paper record as a BibTeX entry. Fields with no source value
/// are omitted, never emitted empty.
pub fn to_bibtex(paper: &Value) -> String {
    let entry = entry_type(paper);
    let key = cite_key(paper);
    let mut fields: Vec<(&str, String)> = Vec::new();

    if let Some(title) = paper.get("title").and_then(Value::as_str) {
        if !title.is_empty() {
            fields.push(("title", escape_value(Some(title))));
        }
    }

    let authors: Vec<String> = paper
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .filter_map(|author| author.get("name").and_then(Value::as_str))
                .map(|name| escape_value(Some(&normalize_text(name))))
                .collect()
        })
        .unwrap_or_default();
    if !authors.is_empty() {
        fields.push(("author", authors.join(" and ")));
    }

    if let Some(year) = year_of(paper) {
        fields.push(("year", year));
    }

    if let Some(venue) = paper.get("venue").and_then(Value::as_str) {
        if !venue.is_empty() {
            let field = if entry == "inproceedings" {
                "booktitle"
            } else {
                "journal"
            };
            fields.push((field, escape_value(Some(venue))));
        }
    }

    if let Some(doi) = paper.pointer("/externalIds/DOI").and_then(Value::as_str) {
        fields.push(("doi", doi.to_string()));
    }

    if let Some(arxiv) = paper.pointer("/externalIds/ArXiv").and_then(Value::as_str) {
        fields.push(("eprint", arxiv.to_string()));
        fields.push(("archiveprefix", "arXiv".to_string()));
    }

    if let Some(url) = paper.pointer("/openAccessPdf/url").and_then(Value::as_str) {
        fields.push(("url", url.to_string()));
    }

    let body = fields
        .iter()
        .map(|(name, value)| format!("  {} = {{{}}}", name, value))
        .collect::<Vec<_>>()
        .join(",\n");

    format!("@{}{{{},\n{}\n}}", entry, key, body)
}

/// Render a sequence of paper records, blank-line separated, in input
/// order. Null entries are skipped; an empty input yields empty output.
pub fn format_bibtex_output(papers: &[Value]) -> String {
    papers
        .iter()
        .filter(|paper| !paper.is_null())
        .map(to_bibtex)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_ascii_unchanged() {
        assert_eq!(normalize_text("hello world"), "hello world");
    }

    #[test]
    fn normalize_strips_diacritics() {
        assert_eq!(normalize_text("café"), "cafe");
        assert_eq!(normalize_text("naïve"), "naive");
        assert_eq!(normalize_text("José García"), "Jose Garcia");
    }

    #[test]
    fn escape_reserved_characters() {
        assert_eq!(escape_value(Some("Smith & Jones")), r"Smith \& Jones");
        assert_eq!(escape_value(Some("100% accurate")), r"100\% accurate");
        assert_eq!(escape_value(Some("$10")), r"\$10");
        assert_eq!(escape_value(Some("#1")), r"\#1");
        assert_eq!(escape_value(Some("under_score")), r"under\_score");
        assert_eq!(escape_value(Some("{test}")), r"\{test\}");
    }

    #[test]
    fn escape_empty_and_absent() {
        assert_eq!(escape_value(Some("")), "");
        assert_eq!(escape_value(None), "");
    }

    #[test]
    fn cite_key_standard_paper() {
        let paper = json!({
            "authors": [{"name": "Ashish Vaswani"}],
            "year": 2017,
            "title": "Attention Is All You Need",
        });
        assert_eq!(cite_key(&paper), "vaswani2017attention");
    }

    #[test]
    fn cite_key_skips_stopwords() {
        let paper = json!({
            "authors": [{"name": "John Doe"}],
            "year": 2020,
            "title": "The Art of Programming",
        });
        assert_eq!(cite_key(&paper), "doe2020art");
    }

    #[test]
    fn cite_key_no_authors() {
        let paper = json!({"year": 2020, "title": "Anonymous Paper"});
        assert_eq!(cite_key(&paper), "unknown2020anonymous");
    }

    #[test]
    fn cite_key_no_year() {
        let paper = json!({"authors": [{"name": "Jane Smith"}], "title": "Timeless Work"});
        assert_eq!(cite_key(&paper), "smithnodatetimeless");
    }

    #[test]
    fn cite_key_no_title() {
        let paper = json!({"authors": [{"name": "Jane Smith"}], "year": 2020});
        assert_eq!(cite_key(&paper), "smith2020paper");
    }

    #[test]
    fn cite_key_unicode_author() {
        let paper = json!({
            "authors": [{"name": "José García"}],
            "year": 2020,
            "title": "Test Paper",
        });
        assert_eq!(cite_key(&paper), "garcia2020test");
    }

    #[test]
    fn cite_key_multi_word_last_name() {
        let paper = json!({
            "authors": [{"name": "Vincent van Gogh"}],
            "year": 1888,
            "title": "Sunflowers",
        });
        assert_eq!(cite_key(&paper), "gogh1888sunflowers");
    }

    #[test]
    fn entry_type_from_publication_venue() {
        assert_eq!(
            entry_type(&json!({"publicationVenue": {"type": "conference"}})),
            "inproceedings"
        );
        assert_eq!(
            entry_type(&json!({"publicationVenue": {"type": "journal"}})),
            "article"
        );
    }

    #[test]
    fn entry_type_from_venue_name() {
        assert_eq!(
            entry_type(&json!({"venue": "Conference on Neural Information Processing Systems"})),
            "inproceedings"
        );
        assert_eq!(entry_type(&json!({"venue": "ACL Workshop on NLP"})), "inproceedings");
        assert_eq!(
            entry_type(&json!({"venue": "Journal of Machine Learning Research"})),
            "article"
        );
    }

    #[test]
    fn entry_type_defaults_to_article() {
        assert_eq!(entry_type(&json!({"externalIds": {"ArXiv": "2106.12345"}})), "article");
        assert_eq!(entry_type(&json!({})), "article");
    }

    #[test]
    fn basic_article() {
        let paper = json!({
            "paperId": "abc123",
            "title": "Test Paper",
            "authors": [{"name": "John Doe"}],
            "year": 2023,
            "venue": "Nature",
        });
        let bib = to_bibtex(&paper);
        assert!(bib.contains("@article{doe2023test"));
        assert!(bib.contains("title = {Test Paper}"));
        assert!(bib.contains("author = {John Doe}"));
        assert!(bib.contains("year = {2023}"));
        assert!(bib.contains("journal = {Nature}"));
    }

    #[test]
    fn conference_paper_uses_booktitle() {
        let paper = json!({
            "paperId": "def456",
            "title": "Deep Learning Advances",
            "authors": [{"name": "Jane Smith"}, {"name": "Bob Wilson"}],
            "year": 2022,
            "venue": "Conference on Machine Learning",
        });
        let bib = to_bibtex(&paper);
        assert!(bib.contains("@inproceedings{"));
        assert!(bib.contains("booktitle = {Conference on Machine Learning}"));
        assert!(bib.contains("author = {Jane Smith and Bob Wilson}"));
    }

    #[test]
    fn includes_doi() {
        let paper = json!({
            "paperId": "xyz",
            "title": "Paper with DOI",
            "authors": [],
            "year": 2021,
            "externalIds": {"DOI": "10.1234/example"},
        });
        assert!(to_bibtex(&paper).contains("doi = {10.1234/example}"));
    }

    #[test]
    fn includes_arxiv_eprint() {
        let paper = json!({
            "paperId": "xyz",
            "title": "ArXiv Paper",
            "authors": [],
            "year": 2021,
            "externalIds": {"ArXiv": "2106.12345"},
        });
        let bib = to_bibtex(&paper);
        assert!(bib.contains("eprint = {2106.12345}"));
        assert!(bib.contains("archiveprefix = {arXiv}"));
    }

    #[test]
    fn includes_open_access_url() {
        let paper = json!({
            "paperId": "xyz",
            "title": "Open Paper",
            "authors": [],
            "year": 2021,
            "openAccessPdf": {"url": "https://example.com/paper.pdf"},
        });
        assert!(to_bibtex(&paper).contains("url = {https://example.com/paper.pdf}"));
    }

    #[test]
    fn escapes_special_characters_in_title() {
        let paper = json!({
            "paperId": "xyz",
            "title": "100% Accuracy & More",
            "authors": [],
            "year": 2021,
        });
        assert!(to_bibtex(&paper).contains(r"100\% Accuracy \& More"));
    }

    #[test]
    fn multiple_papers_concatenated_in_order() {
        let papers = vec![
            json!({"paperId": "1", "title": "First", "authors": [], "year": 2020}),
            json!({"paperId": "2", "title": "Second", "authors": [], "year": 2021}),
        ];
        let output = format_bibtex_output(&papers);
        assert!(output.contains("@article{unknown2020first"));
        assert!(output.contains("@article{unknown2021second"));
        assert_eq!(output.matches("@article").count(), 2);
    }

    #[test]
    fn null_entries_skipped() {
        let papers = vec![
            json!({"paperId": "1", "title": "Valid", "authors": [], "year": 2020}),
            Value::Null,
            json!({"paperId": "2", "title": "Also Valid", "authors": [], "year": 2021}),
        ];
        let output = format_bibtex_output(&papers);
        assert_eq!(output.matches("@article").count(), 2);
    }

    #[test]
    fn empty_list_yields_empty_output() {
        assert_eq!(format_bibtex_output(&[]), "");
    }

    #[test]
    fn cite_key_is_deterministic_and_clean() {
        let paper = json!({
            "authors": [{"name": "Ashish Vaswani"}],
            "year": 2017,
            "title": "Attention Is All You Need",
        });
        let first = cite_key(&paper);
        let second = cite_key(&paper);
        assert_eq!(first, second);
        assert_eq!(first, first.to_lowercase());
        assert!(!first.contains(char::is_whitespace));
    }
}
