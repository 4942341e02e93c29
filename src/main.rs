use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use s2cli::api::{PaperSearchQuery, SemanticScholar, BIBTEX_FIELDS};
use s2cli::formatters::{format_bibtex_output, format_json_output, format_table_output, TableKind};
use s2cli::{config, ClientError, RetryPolicy};
use serde_json::{json, Map, Value};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Semantic Scholar CLI - search academic papers, get citations, export BibTeX
#[derive(Parser, Debug)]
#[command(name = "s2cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search academic papers, get citations, export BibTeX", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv, -vvv)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// API key for higher rate limits
    #[arg(long, global = true, env = "S2_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Fail immediately on rate limiting instead of retrying
    #[arg(long, global = true)]
    no_retry: bool,

    /// Maximum number of retries on rate limiting
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Pretty-printed JSON (machine-readable)
    Json,
    /// Table format (human-readable)
    Table,
    /// BibTeX citation records
    Bibtex,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for papers by keyword
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Number of results
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        /// Pagination offset
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Year or range (2023, 2020-2023)
        #[arg(long)]
        year: Option<String>,

        /// Filter by venue
        #[arg(long)]
        venue: Option<String>,

        /// Field of study filter
        #[arg(long)]
        field: Option<String>,

        /// Minimum citation count
        #[arg(long)]
        min_citations: Option<u64>,

        /// Only papers with free PDFs
        #[arg(long)]
        open_access: bool,

        /// Comma-separated fields to return
        #[arg(long)]
        fields: Option<String>,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Get paper details by ID (S2 ID, DOI:..., ARXIV:..., CorpusId:...)
    Paper {
        /// Paper ID(s); several IDs use the batch endpoint
        #[arg(required = true)]
        paper_ids: Vec<String>,

        /// Comma-separated fields to return
        #[arg(long)]
        fields: Option<String>,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Get papers that cite this paper
    Citations {
        paper_id: String,

        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long)]
        fields: Option<String>,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Get papers cited by this paper
    References {
        paper_id: String,

        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long)]
        fields: Option<String>,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Get paper recommendations based on a seed paper
    Recommend {
        paper_id: String,

        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        /// Recommendation pool: "recent" or "all-cs"
        #[arg(long, default_value = "recent")]
        pool: String,

        #[arg(long)]
        fields: Option<String>,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Export BibTeX citations for papers (shortcut for paper --format bibtex)
    Bibtex {
        #[arg(required = true)]
        paper_ids: Vec<String>,
    },

    /// Author-related commands
    Author {
        #[command(subcommand)]
        command: AuthorCommands,
    },

    /// List available dataset releases
    Datasets,

    /// Get dataset info or download links for a release
    Dataset {
        /// Release ID (e.g. "2024-01-01" or "latest")
        release_id: String,

        /// Dataset name to get download links for
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum AuthorCommands {
    /// Search for authors by name
    Search {
        query: String,

        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long)]
        fields: Option<String>,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Get author details by ID
    Get {
        author_id: String,

        #[arg(long)]
        fields: Option<String>,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Get papers by an author
    Papers {
        author_id: String,

        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long)]
        fields: Option<String>,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        match err.downcast_ref::<ClientError>() {
            Some(ClientError::Api(api_error)) => {
                eprintln!("{}", format_json_output(&api_error.to_json(), None));
            }
            _ => eprintln!("error: {:#}", err),
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("s2cli={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(cli: &Cli) -> SemanticScholar {
    let file_config = config::load();
    let api_key = cli.api_key.clone().or(file_config.api.key);
    let timeout = Duration::from_secs(cli.timeout.unwrap_or(file_config.api.timeout_secs));

    let retry = if cli.no_retry || !file_config.retry.enabled {
        RetryPolicy::disabled()
    } else {
        RetryPolicy::new(cli.max_retries.unwrap_or(file_config.retry.max_retries)).with_callback(
            |status| {
                eprintln!(
                    "Rate limited, retrying in {}s (attempt {}/{})",
                    status.delay_secs, status.attempt, status.max_retries
                );
            },
        )
    };

    SemanticScholar::with_options(api_key, timeout, retry)
}

fn run(cli: Cli) -> Result<()> {
    let client = build_client(&cli);

    match cli.command {
        Commands::Search {
            query,
            limit,
            offset,
            year,
            venue,
            field,
            min_citations,
            open_access,
            fields,
            format,
        } => {
            let search = PaperSearchQuery {
                query: query.clone(),
                fields,
                limit,
                offset,
                year,
                venue,
                fields_of_study: field,
                min_citation_count: min_citations,
                open_access_pdf: open_access,
                publication_types: None,
            };
            let result = client.search_papers(&search)?;

            match format {
                OutputFormat::Table => {
                    println!("{}", format_table_output(&result, TableKind::Paper));
                    if let Some(total) = total_of(&result) {
                        println!("\nTotal: {} results", total);
                    }
                }
                OutputFormat::Bibtex => {
                    println!("{}", format_bibtex_output(&data_papers(&result, None)));
                }
                OutputFormat::Json => {
                    let mut meta = Map::new();
                    meta.insert("query".to_string(), json!(query));
                    meta.insert("limit".to_string(), json!(limit));
                    meta.insert("offset".to_string(), json!(offset));
                    if let Some(total) = total_of(&result) {
                        meta.insert("total".to_string(), json!(total));
                        if ((offset + limit) as u64) < total {
                            meta.insert(
                                "next".to_string(),
                                json!(format!(
                                    "s2cli search '{}' --offset {} --limit {}",
                                    query,
                                    offset + limit,
                                    limit
                                )),
                            );
                        }
                    }
                    println!("{}", format_json_output(&result, Some(&meta)));
                }
            }
        }

        Commands::Paper {
            paper_ids,
            fields,
            format,
        } => {
            let papers: Vec<Value> = if paper_ids.len() == 1 {
                vec![client.get_paper(&paper_ids[0], fields.as_deref())?]
            } else {
                client
                    .get_papers_batch(&paper_ids, fields.as_deref())?
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
            };

            match format {
                OutputFormat::Table => {
                    println!(
                        "{}",
                        format_table_output(&Value::Array(papers), TableKind::Paper)
                    );
                }
                OutputFormat::Bibtex => println!("{}", format_bibtex_output(&papers)),
                OutputFormat::Json => {
                    if papers.len() == 1 {
                        println!("{}", format_json_output(&papers[0], None));
                    } else {
                        println!("{}", format_json_output(&Value::Array(papers), None));
                    }
                }
            }
        }

        Commands::Citations {
            paper_id,
            limit,
            offset,
            fields,
            format,
        } => {
            let result = client.get_paper_citations(&paper_id, fields.as_deref(), limit, offset)?;
            emit_linked_papers(&result, format, &paper_id, "citations", "citingPaper", limit, offset);
        }

        Commands::References {
            paper_id,
            limit,
            offset,
            fields,
            format,
        } => {
            let result = client.get_paper_references(&paper_id, fields.as_deref(), limit, offset)?;
            emit_linked_papers(&result, format, &paper_id, "references", "citedPaper", limit, offset);
        }

        Commands::Recommend {
            paper_id,
            limit,
            pool,
            fields,
            format,
        } => {
            let result = client.get_recommendations(&paper_id, fields.as_deref(), limit, &pool)?;
            let papers = result
                .get("recommendedPapers")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            match format {
                OutputFormat::Table => {
                    println!(
                        "{}",
                        format_table_output(&Value::Array(papers), TableKind::Paper)
                    );
                }
                OutputFormat::Bibtex => println!("{}", format_bibtex_output(&papers)),
                OutputFormat::Json => {
                    let mut meta = Map::new();
                    meta.insert("paper_id".to_string(), json!(paper_id));
                    meta.insert("type".to_string(), json!("recommendations"));
                    meta.insert("pool".to_string(), json!(pool));
                    meta.insert("limit".to_string(), json!(limit));
                    println!("{}", format_json_output(&Value::Array(papers), Some(&meta)));
                }
            }
        }

        Commands::Bibtex { paper_ids } => {
            let papers: Vec<Value> = if paper_ids.len() == 1 {
                vec![client.get_paper(&paper_ids[0], Some(BIBTEX_FIELDS))?]
            } else {
                client
                    .get_papers_batch(&paper_ids, Some(BIBTEX_FIELDS))?
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
            };
            println!("{}", format_bibtex_output(&papers));
        }

        Commands::Author { command } => run_author(&client, command)?,

        Commands::Datasets => {
            let result = client.list_releases()?;
            println!("{}", format_json_output(&result, None));
        }

        Commands::Dataset { release_id, name } => {
            let result = match name {
                Some(name) => client.get_dataset_links(&release_id, &name)?,
                None => client.get_release(&release_id)?,
            };
            println!("{}", format_json_output(&result, None));
        }
    }

    Ok(())
}

fn run_author(client: &SemanticScholar, command: AuthorCommands) -> Result<()> {
    match command {
        AuthorCommands::Search {
            query,
            limit,
            offset,
            fields,
            format,
        } => {
            let result = client.search_authors(&query, fields.as_deref(), limit, offset)?;
            match format {
                OutputFormat::Table => {
                    println!("{}", format_table_output(&result, TableKind::Author));
                    if let Some(total) = total_of(&result) {
                        println!("\nTotal: {} results", total);
                    }
                }
                _ => {
                    let mut meta = Map::new();
                    meta.insert("query".to_string(), json!(query));
                    meta.insert("limit".to_string(), json!(limit));
                    meta.insert("offset".to_string(), json!(offset));
                    if let Some(total) = total_of(&result) {
                        meta.insert("total".to_string(), json!(total));
                    }
                    println!("{}", format_json_output(&result, Some(&meta)));
                }
            }
        }

        AuthorCommands::Get {
            author_id,
            fields,
            format,
        } => {
            let result = client.get_author(&author_id, fields.as_deref())?;
            println!("{}", render_author(&result, format));
        }

        AuthorCommands::Papers {
            author_id,
            limit,
            offset,
            fields,
            format,
        } => {
            let result = client.get_author_papers(&author_id, fields.as_deref(), limit, offset)?;
            match format {
                OutputFormat::Table => {
                    println!("{}", format_table_output(&result, TableKind::Paper));
                }
                OutputFormat::Bibtex => {
                    println!("{}", format_bibtex_output(&data_papers(&result, None)));
                }
                OutputFormat::Json => {
                    let mut meta = Map::new();
                    meta.insert("author_id".to_string(), json!(author_id));
                    meta.insert("limit".to_string(), json!(limit));
                    meta.insert("offset".to_string(), json!(offset));
                    println!("{}", format_json_output(&result, Some(&meta)));
                }
            }
        }
    }
    Ok(())
}

/// Authors have no BibTeX form; every non-table format renders JSON.
fn render_author(result: &Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_table_output(result, TableKind::Author),
        _ => format_json_output(result, None),
    }
}

/// Shared output path for citation/reference listings.
fn emit_linked_papers(
    result: &Value,
    format: OutputFormat,
    paper_id: &str,
    kind: &str,
    envelope: &str,
    limit: usize,
    offset: usize,
) {
    match format {
        OutputFormat::Table => {
            println!("{}", format_table_output(result, TableKind::Citation));
        }
        OutputFormat::Bibtex => {
            println!("{}", format_bibtex_output(&data_papers(result, Some(envelope))));
        }
        OutputFormat::Json => {
            let mut meta = Map::new();
            meta.insert("paper_id".to_string(), json!(paper_id));
            meta.insert("type".to_string(), json!(kind));
            meta.insert("limit".to_string(), json!(limit));
            meta.insert("offset".to_string(), json!(offset));
            println!("{}", format_json_output(result, Some(&meta)));
        }
    }
}

/// Pull the paper list out of a `{data: [...]}` result, optionally
/// unwrapping a per-item envelope such as `citingPaper`. Items missing the
/// envelope become null so the BibTeX formatter skips them.
fn data_papers(result: &Value, envelope: Option<&str>) -> Vec<Value> {
    let items = result
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    match envelope {
        Some(key) => items
            .into_iter()
            .map(|item| item.get(key).cloned().unwrap_or(Value::Null))
            .collect(),
        None => items,
    }
}

fn total_of(result: &Value) -> Option<u64> {
    result.get("total").and_then(Value::as_u64).filter(|t| *t > 0)
}
