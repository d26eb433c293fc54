//! # Context Autocomplete CLI (`ctxa`)
//!
//! The `ctxa` binary manages the context store and runs the suggestion
//! pipeline from a terminal.
//!
//! ## Usage
//!
//! ```bash
//! ctxa --config ./config/ctxa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ctxa init` | Create the SQLite database and schema |
//! | `ctxa add "<text>" --app <app>` | Record one context entry |
//! | `ctxa recent` | List the newest entries |
//! | `ctxa by-source <app>` | List the newest entries for one app |
//! | `ctxa search "<text>"` | Case-sensitive substring search |
//! | `ctxa slice <app>` | Print the context window sent to the model |
//! | `ctxa prune` | Drop entries by age and count |
//! | `ctxa stats` | Summarize the store |
//! | `ctxa suggest "<text>"` | Generate suggestions once |
//! | `ctxa run` | Interactive pipeline over stdin |
//!
//! ## Examples
//!
//! ```bash
//! # Record what the user is reading
//! ctxa add "Quarterly planning notes" --app Notes
//!
//! # See what the model would receive while typing in Mail
//! ctxa slice Mail --max-chars 2000
//!
//! # Keep a week of history, at most 1000 rows
//! ctxa prune --max-age-hours 168 --max-entries 1000
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use context_autocomplete::models::EntryType;
use context_autocomplete::{config, record, search, session, stats};

/// Context Autocomplete CLI: a context store and suggestion pipeline for a
/// system-wide autocomplete assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "ctxa",
    about = "Context Autocomplete — context store and suggestion pipeline",
    version,
    long_about = "Context Autocomplete records what you read and type into a local SQLite log, \
    slices it into a bounded context window, and asks a language model for ranked completions \
    that can be navigated, accepted, or dismissed."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ctxa.toml`. Database, model, suggestion, and
    /// context settings are read from this file.
    #[arg(long, global = true, default_value = "./config/ctxa.toml")]
    config: PathBuf,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the `context_entries` table and its
    /// indexes. Running it multiple times is safe.
    Init,

    /// Record a context entry.
    ///
    /// Identical content from the same app within five seconds is skipped.
    Add {
        /// Entry content.
        content: String,

        /// Application the content came from.
        #[arg(long)]
        app: String,

        /// Entry type: `visible_text`, `user_input`, or `accepted_suggestion`.
        #[arg(long = "type", default_value = "visible_text")]
        entry_type: EntryType,

        /// Page or document URL, if known.
        #[arg(long)]
        url: Option<String>,
    },

    /// List the most recent entries, newest first.
    Recent {
        /// Maximum number of entries to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List the most recent entries for one application.
    BySource {
        /// Application name (exact match).
        app: String,

        /// Maximum number of entries to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Search entry content for a substring (case-sensitive).
    Search {
        /// Text to look for.
        query: String,

        /// Maximum number of entries to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the context window built for an application.
    Slice {
        /// Application the user is typing in.
        app: String,

        /// Character budget. Defaults to `[context].window_chars`.
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Delete entries older than the age bound, then the oldest beyond the
    /// count bound.
    Prune {
        /// Age bound in hours. Defaults to `[context].max_age_hours`.
        #[arg(long)]
        max_age_hours: Option<u64>,

        /// Count bound. Defaults to `[context].max_entries`.
        #[arg(long)]
        max_entries: Option<usize>,
    },

    /// Show store statistics.
    Stats,

    /// Generate suggestions once for the given input.
    ///
    /// Requires an API key for the configured provider.
    Suggest {
        /// Text typed so far.
        text: String,

        /// Application the user is typing in.
        #[arg(long, default_value = "Terminal")]
        app: String,
    },

    /// Run the suggestion pipeline interactively over stdin.
    ///
    /// Each typed line becomes the field text and fires the trigger. Use
    /// `:up`, `:down`, `:accept`, `:dismiss`, `:app NAME`, and `:quit` to
    /// drive the overlay.
    Run {
        /// Initial application name for the simulated field.
        #[arg(long, default_value = "Terminal")]
        app: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},sqlx=warn,reqwest=warn,hyper=warn", default))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = search::open_store(&cfg).await?;
            store.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Add {
            content,
            app,
            entry_type,
            url,
        } => {
            record::run_add(&cfg, &app, &content, entry_type, url).await?;
        }
        Commands::Recent { limit } => {
            search::run_recent(&cfg, limit).await?;
        }
        Commands::BySource { app, limit } => {
            search::run_by_source(&cfg, &app, limit).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Slice { app, max_chars } => {
            search::run_slice(&cfg, &app, max_chars).await?;
        }
        Commands::Prune {
            max_age_hours,
            max_entries,
        } => {
            record::run_prune(&cfg, max_age_hours, max_entries).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Suggest { text, app } => {
            session::run_suggest(&cfg, &text, &app).await?;
        }
        Commands::Run { app } => {
            session::run_interactive(&cfg, &app).await?;
        }
    }

    Ok(())
}
