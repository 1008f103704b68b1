//! # Activity Lens CLI (`alens`)
//!
//! The `alens` binary is the primary interface for Activity Lens. It
//! provides commands for database initialization, context event ingestion,
//! insight retrieval, and starting the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! alens --config ./config/alens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `alens init` | Create the SQLite database and run schema migrations |
//! | `alens ingest [file]` | Process a context event from a file or stdin |
//! | `alens insights` | Print recent ranked activities for a user |
//! | `alens hash-url <url>` | Print the SHA-256 hash used as a tab identity |
//! | `alens serve` | Start the HTTP API server |

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::PathBuf;

use activity_lens::config::load_config;
use activity_lens::normalize::normalize_event;
use activity_lens::pipeline::process_event;
use activity_lens::store::put_activities;
use activity_lens::summarize::create_summarizer;
use activity_lens::{db, insights, migrate, server};

/// Activity Lens — tab-activity clustering, summarization, and insight
/// retrieval for productivity assistants.
#[derive(Parser)]
#[command(
    name = "alens",
    about = "Activity Lens — cluster browser tabs into ranked, summarized activities",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/alens.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the activities table.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Process a context event and print the ranked activities.
    ///
    /// Reads the event JSON from the given file, or from stdin when no
    /// file is supplied.
    Ingest {
        /// Path to a context event JSON file; stdin when omitted.
        file: Option<PathBuf>,

        /// Compute activities without writing them to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print recent ranked activities for a user, newest first.
    Insights {
        /// User to query.
        #[arg(long, default_value = "dev-user")]
        user_id: String,

        /// Maximum number of activities to return (clamped to 1..=50).
        #[arg(long)]
        limit: Option<i64>,

        /// Only return captures at or after this ISO-8601 timestamp.
        #[arg(long)]
        since: Option<String>,
    },

    /// Print the SHA-256 hex digest used as a tab's `url_hash`.
    HashUrl {
        /// The URL to hash.
        url: String,
    },

    /// Start the HTTP API server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("ok: database initialized at {}", config.db.path.display());
        }

        Commands::Ingest { file, dry_run } => {
            let raw = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read event file: {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read event from stdin")?;
                    buf
                }
            };

            let value: serde_json::Value =
                serde_json::from_str(&raw).context("Event is not valid JSON")?;
            let event = normalize_event(value);

            let summarizer = create_summarizer(&config.summarizer, &config.pipeline)?;
            let response = process_event(&event, &config.pipeline, summarizer.as_ref()).await;

            if dry_run {
                println!("dry run — not persisting");
            } else {
                let pool = db::connect(&config).await?;
                let written = put_activities(
                    &pool,
                    &event.user_id,
                    &event.ts,
                    &response.activities,
                    config.db.ttl_days,
                )
                .await?;
                pool.close().await;
                println!("stored activities: {}", written);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Insights {
            user_id,
            limit,
            since,
        } => {
            let pool = db::connect(&config).await?;
            let response =
                insights::latest_activities(&pool, &user_id, limit, since.as_deref()).await?;
            pool.close().await;
            if response.items.is_empty() {
                println!("no activities found for {}", user_id);
            }
            for item in &response.items {
                println!(
                    "[{}] #{} {} ({}) active={} confidence={:.2}",
                    item.ts, item.rank, item.label, item.activity_id, item.is_active, item.confidence
                );
                println!("    {}", item.summary);
            }
        }

        Commands::HashUrl { url } => {
            let mut hasher = Sha256::new();
            hasher.update(url.as_bytes());
            println!("{:x}", hasher.finalize());
        }

        Commands::Serve => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}
