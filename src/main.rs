use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tokio_util::sync::CancellationToken;

use lode_core::LodeConfig;
use lode_index::scan::scan_directory;
use lode_index::{EmbeddingClient, IndexCoordinator, VectorStore};

#[derive(Parser)]
#[command(
    name = "lode",
    version,
    about = "Semantic code indexing and search",
    long_about = "Lodestone indexes source repositories into embedding vectors and searches them\n\
                   by meaning rather than keywords.\n\n\
                   Examples:\n  \
                     lode index --path . --repo myproject   Index a repository\n  \
                     lode search 'auth middleware'          Search indexed code\n  \
                     lode related src/auth.py               Find files related to one file\n  \
                     lode stats                             Show index statistics"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .lodestone.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the index database (default: .lodestone/index.db)
    #[arg(long, global = true, default_value = ".lodestone/index.db")]
    db: PathBuf,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable tables and summaries
    Text,
    /// Machine-readable JSON with camelCase keys
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Index a repository into the vector store
    #[command(long_about = "Index a repository into the vector store.\n\n\
        Walks the tree respecting .gitignore, chunks source files into logical\n\
        units, embeds each chunk, and persists the vectors. Interruptible with\n\
        Ctrl-C; chunks already stored survive the interruption.\n\n\
        Examples:\n  lode index --path .\n  lode index --path ../service --repo service")]
    Index {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Repository identifier (default: directory name)
        #[arg(long)]
        repo: Option<String>,
    },
    /// Search indexed code by meaning
    #[command(long_about = "Search indexed code by meaning.\n\n\
        Embeds the query and ranks stored chunks by cosine similarity.\n\n\
        Examples:\n  lode search 'error handling logic'\n  lode search 'auth middleware' --limit 5 --repo service")]
    Search {
        /// Natural language query
        query: String,

        /// Restrict to these repository identifiers (repeatable)
        #[arg(long)]
        repo: Vec<String>,

        /// Maximum results to return (default: from config)
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum similarity score (default: from config)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Find files related to a given file
    Related {
        /// File path as it was indexed
        file: PathBuf,

        /// Maximum results to return (default: from config)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show index statistics
    Stats,
    /// Delete everything indexed under a repository identifier
    Delete {
        /// Repository identifier to remove
        repo: String,
    },
    /// Create a default .lodestone.toml in the current directory
    Init,
}

const DEFAULT_CONFIG: &str = r#"# Lodestone Configuration

[index]
# chunk_size = 500
# chunk_overlap = 50
# min_chunk_chars = 50
# max_file_size = 1048576
# workers = 4

[embedding]
# api_key = "sk-..."            # or set LODESTONE_API_KEY
# base_url = "https://api.openai.com/v1"
# model = "text-embedding-ada-002"
# dimensions = 1536
# max_tokens = 8191
# tokenizer_path = "tokenizer.json"
# timeout_secs = 30

[search]
# limit = 10
# similarity_threshold = 0.7
"#;

fn load_config(path: Option<&Path>) -> Result<LodeConfig> {
    match path {
        Some(path) => Ok(LodeConfig::from_file(path)?),
        None => {
            let default_path = Path::new(".lodestone.toml");
            if default_path.exists() {
                Ok(LodeConfig::from_file(default_path)?)
            } else {
                Ok(LodeConfig::default())
            }
        }
    }
}

fn repository_id_for(path: &Path, explicit: Option<String>) -> String {
    if let Some(repo) = explicit {
        return repo;
    }
    path.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "default".to_string())
}

fn spinner(message: &str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Index { path, repo } => {
            let repository_id = repository_id_for(&path, repo);
            let embedder = EmbeddingClient::with_config(&config.embedding)?;
            let store = VectorStore::open(&cli.db)?;
            let coordinator = IndexCoordinator::new(config, embedder, store);

            let files = scan_directory(&path)?;

            let cancel = CancellationToken::new();
            let ctrl_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\ninterrupted, finishing in-flight files...");
                    ctrl_cancel.cancel();
                }
            });

            let pb = spinner(&format!("Indexing {}...", path.display()));
            let summary = coordinator
                .index_repository(&repository_id, files, &cancel)
                .await?;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&summary).into_diagnostic()?
                    );
                }
                OutputFormat::Text => {
                    println!("Indexed repository '{}'", summary.repository_id);
                    println!("  files processed:      {}", summary.files_processed);
                    println!("  chunks created:       {}", summary.chunks_created);
                    println!("  embeddings generated: {}", summary.embeddings_generated);
                }
            }
        }
        Command::Search {
            query,
            repo,
            limit,
            threshold,
        } => {
            let limit = limit.unwrap_or(config.search.limit);
            let threshold = threshold.unwrap_or(config.search.similarity_threshold);
            let repos = if repo.is_empty() { None } else { Some(repo) };

            let embedder = EmbeddingClient::with_config(&config.embedding)?;
            let store = VectorStore::open(&cli.db)?;
            let coordinator = IndexCoordinator::new(config, embedder, store);

            let results = coordinator
                .search_similar_code(&query, repos.as_deref(), limit, threshold)
                .await?;

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&results).into_diagnostic()?
                    );
                }
                OutputFormat::Text => {
                    if results.is_empty() {
                        println!("No results above similarity {threshold}.");
                    }
                    for (i, result) in results.iter().enumerate() {
                        println!(
                            "{}. {} [{}] ({:.3})",
                            i + 1,
                            result.file_path.display(),
                            result.chunk_type,
                            result.similarity_score
                        );
                        for line in result.content.lines().take(5) {
                            println!("     {line}");
                        }
                        println!();
                    }
                }
            }
        }
        Command::Related { file, limit } => {
            let limit = limit.unwrap_or(config.search.limit);
            let store = VectorStore::open(&cli.db)?;
            let related = store.find_related_files(&file, limit)?;

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&related).into_diagnostic()?
                    );
                }
                OutputFormat::Text => {
                    if related.is_empty() {
                        println!("No related files found for {}.", file.display());
                    }
                    for entry in &related {
                        println!(
                            "{:.3}  {} [{}]",
                            entry.similarity_score,
                            entry.file_path.display(),
                            entry.language
                        );
                    }
                }
            }
        }
        Command::Stats => {
            let store = VectorStore::open(&cli.db)?;
            let stats = store.stats()?;

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&stats).into_diagnostic()?
                    );
                }
                OutputFormat::Text => {
                    println!("Index statistics");
                    println!("  chunks:       {}", stats.total_chunks);
                    println!("  files:        {}", stats.total_files);
                    println!("  repositories: {}", stats.total_repositories);
                    println!("  size:         {} bytes", stats.index_size_bytes);
                }
            }
        }
        Command::Init => {
            let path = Path::new(".lodestone.toml");
            if path.exists() {
                miette::bail!(".lodestone.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .lodestone.toml with default configuration");
        }
        Command::Delete { repo } => {
            let store = VectorStore::open(&cli.db)?;
            let deleted = store.delete_repository(&repo)?;
            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({ "repositoryId": repo, "deletedChunks": deleted })
                    );
                }
                OutputFormat::Text => {
                    println!("Deleted {deleted} chunks from repository '{repo}'.");
                }
            }
        }
    }

    Ok(())
}
