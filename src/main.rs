//! # askdocs CLI
//!
//! The `askdocs` binary ingests a folder of PDFs into a vector index and
//! answers questions about them.
//!
//! ## Usage
//!
//! ```bash
//! askdocs --config ./config/askdocs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdocs init` | Create the vector index and the tracking file |
//! | `askdocs index` | Ingest new and changed PDFs from the documents directory |
//! | `askdocs ask [question]` | Answer one question, or start the interactive loop |
//! | `askdocs files list` | Show tracked files and their chunk counts |
//! | `askdocs files remove <name>` | Delete one file's chunks and tracking entry |
//! | `askdocs clear` | Recreate the index empty and clear all tracking |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use askdocs::config;
use askdocs::index;
use askdocs::ingest;
use askdocs::query;
use askdocs::tracking::TrackingStore;

/// Ask questions over a folder of PDFs.
#[derive(Parser)]
#[command(
    name = "askdocs",
    about = "Ask questions over a folder of PDFs",
    version,
    long_about = "askdocs ingests a directory of PDF documents page by page, embeds each page, \
    stores the chunks in a vector index, and answers natural-language questions by retrieving \
    the most relevant chunks and forwarding them to an LLM. Files are tracked by content hash, \
    so re-running ingestion skips unchanged files and cleanly re-indexes changed ones."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askdocs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector index and the tracking file.
    ///
    /// Idempotent; running it again is safe.
    Init,

    /// Ingest PDFs from the documents directory.
    ///
    /// New files are indexed, unchanged files are skipped, and files whose
    /// content changed have their old chunks removed before re-indexing.
    Index,

    /// Ask a question, or start the interactive loop when no question is
    /// given. In the loop, "exit" quits.
    Ask {
        /// The question to answer. Omit for interactive mode.
        question: Option<String>,
    },

    /// Inspect or edit the set of tracked files.
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },

    /// Delete the whole index and all tracking state.
    Clear,
}

#[derive(Subcommand)]
enum FilesAction {
    /// List tracked files with chunk counts and index times.
    List,
    /// Remove one file's chunks from the index and forget it.
    Remove {
        /// Filename as shown by `files list`.
        filename: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("askdocs=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let gateway = index::create_index(&cfg.index)?;
            gateway.ensure_index().await?;

            let tracking = TrackingStore::load(&cfg.documents.tracking_path)?;
            tracking.save()?;

            println!("Index and tracking state initialized.");
        }
        Commands::Index => {
            ingest::run_index(&cfg).await?;
        }
        Commands::Ask { question } => {
            query::run_ask(&cfg, question).await?;
        }
        Commands::Files { action } => match action {
            FilesAction::List => {
                let tracking = TrackingStore::load(&cfg.documents.tracking_path)?;
                if tracking.is_empty() {
                    println!("No files tracked.");
                } else {
                    println!("{:<40} {:>7}  {}", "FILE", "CHUNKS", "INDEXED AT");
                    for name in tracking.filenames() {
                        if let Some(entry) = tracking.get(&name) {
                            println!(
                                "{:<40} {:>7}  {}",
                                name,
                                entry.chunk_ids.len(),
                                entry.indexed_at.format("%Y-%m-%d %H:%M:%S")
                            );
                        }
                    }
                }
            }
            FilesAction::Remove { filename } => {
                ingest::run_remove(&cfg, &filename).await?;
            }
        },
        Commands::Clear => {
            ingest::run_clear(&cfg).await?;
        }
    }

    Ok(())
}
