//! # Mirror CLI (`mirror`)
//!
//! Drives the mirror backend's forms from the terminal.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mirror sample` | Ingest the backend's bundled sample subject |
//! | `mirror ingest <files...>` | Upload files for a subject |
//! | `mirror ingest-urls <urls...>` | Ingest web pages for a subject |
//! | `mirror chat "<message>"` | Chat with a subject's mirror |
//! | `mirror facts show` | Print a subject's facts and preferences |
//! | `mirror facts add-fact` / `add-pref` | Append a row and save |
//! | `mirror facts remove <table> <index>` | Delete a row and save |
//! | `mirror facts export` / `import` | Move records to and from JSON files |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mirror_console::commands::{self, NewRow, TableKind};
use mirror_console::config;

/// Mirror CLI: ingest, chat with, and edit a subject's mirror.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(name = "mirror", about = "Mirror: form-driven client for the mirror backend", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mirror.toml")]
    config: PathBuf,

    /// Backend base URL; overrides `[server].base_url`.
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the backend's bundled sample documents under a subject.
    Sample {
        /// Subject id (defaults to `[defaults].sample_subject`).
        #[arg(long)]
        subject: Option<String>,
    },

    /// Upload local files for ingestion.
    Ingest {
        /// Files to upload.
        files: Vec<PathBuf>,

        /// Subject id (defaults to `[defaults].files_subject`).
        #[arg(long)]
        subject: Option<String>,
    },

    /// Ingest web pages by URL.
    IngestUrls {
        urls: Vec<String>,

        /// Subject id (defaults to `[defaults].urls_subject`).
        #[arg(long)]
        subject: Option<String>,
    },

    /// Send a chat message and print the reply and its citations.
    Chat {
        message: String,

        /// Subject id (defaults to `[defaults].chat_subject`).
        #[arg(long)]
        subject: Option<String>,

        /// Ask the backend to synthesize the reply as audio.
        #[arg(long)]
        voice: bool,

        /// Voice to synthesize with.
        #[arg(long)]
        voice_id: Option<String>,
    },

    /// View and edit a subject's facts and preferences.
    Facts {
        #[command(subcommand)]
        action: FactsAction,
    },
}

#[derive(Subcommand)]
enum FactsAction {
    /// Print both tables.
    Show {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Append a fact and save.
    AddFact {
        /// Fact type (e.g. `employer`).
        kind: String,
        value: String,
        #[arg(long)]
        confidence: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        subject: Option<String>,
    },

    /// Append a preference and save.
    AddPref {
        category: String,
        value: String,
        #[arg(long)]
        confidence: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        subject: Option<String>,
    },

    /// Delete a row by its index in `facts show` and save.
    Remove {
        #[arg(value_enum)]
        table: TableKind,
        index: usize,
        #[arg(long)]
        subject: Option<String>,
    },

    /// Write both tables as JSON.
    Export {
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        subject: Option<String>,
    },

    /// Replace a subject's records with the contents of a JSON file.
    Import {
        input: PathBuf,
        #[arg(long)]
        subject: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mirror_console=warn".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::minimal()
    };
    if let Some(server) = cli.server {
        cfg = cfg.with_base_url(server);
        config::validate(&cfg)?;
    }

    match cli.command {
        Commands::Sample { subject } => {
            commands::run_sample(&cfg, subject).await?;
        }
        Commands::Ingest { files, subject } => {
            commands::run_ingest(&cfg, subject, &files).await?;
        }
        Commands::IngestUrls { urls, subject } => {
            commands::run_ingest_urls(&cfg, subject, &urls).await?;
        }
        Commands::Chat {
            message,
            subject,
            voice,
            voice_id,
        } => {
            commands::run_chat(&cfg, subject, &message, voice, voice_id).await?;
        }
        Commands::Facts { action } => match action {
            FactsAction::Show { subject } => {
                commands::run_facts_show(&cfg, subject).await?;
            }
            FactsAction::AddFact {
                kind,
                value,
                confidence,
                source,
                subject,
            } => {
                let row = NewRow {
                    key: kind,
                    value,
                    confidence,
                    source,
                };
                commands::run_facts_add(&cfg, subject, TableKind::Facts, row).await?;
            }
            FactsAction::AddPref {
                category,
                value,
                confidence,
                source,
                subject,
            } => {
                let row = NewRow {
                    key: category,
                    value,
                    confidence,
                    source,
                };
                commands::run_facts_add(&cfg, subject, TableKind::Prefs, row).await?;
            }
            FactsAction::Remove {
                table,
                index,
                subject,
            } => {
                commands::run_facts_remove(&cfg, subject, table, index).await?;
            }
            FactsAction::Export { out, subject } => {
                commands::run_facts_export(&cfg, subject, out.as_deref()).await?;
            }
            FactsAction::Import { input, subject } => {
                commands::run_facts_import(&cfg, subject, &input).await?;
            }
        },
    }

    Ok(())
}
