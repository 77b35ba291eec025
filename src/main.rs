//! # Schema Atlas CLI (`atlas`)
//!
//! The `atlas` binary drives every harvesting step: seeding, discovery,
//! community intake, refresh and full-version fetches, catalog builds and
//! validation.
//!
//! ## Usage
//!
//! ```bash
//! atlas --config ./config/atlas.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `atlas seed` | Download the APIs.guru index and preferred-version seeds |
//! | `atlas discover` | Probe discovery targets for well-known schema paths |
//! | `atlas intake` | Mine issue-tracker issues for schema URLs |
//! | `atlas refresh` | Harvest every source list and rebuild the catalog |
//! | `atlas fetch-all` | Resumable harvest of every indexed version |
//! | `atlas build <view>` | Rebuild catalog views (`plain`, `search`, `bridge`, `all`) |
//! | `atlas validate` | Re-validate every stored schema; non-zero exit on failure |
//! | `atlas sources` | List source files and their health |
//! | `atlas stats` | Repository and fetch-state summary |
//!
//! Per-item `ok <key>` / `fail <key>` lines go to stdout; logs and progress
//! go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Instrument;

use schema_atlas::catalog::{parse_kinds, run_build};
use schema_atlas::community::run_intake;
use schema_atlas::config::{load_or_default, Config};
use schema_atlas::discovery::run_discover;
use schema_atlas::guru::run_seed;
use schema_atlas::ingest::{run_fetch_all, run_refresh};
use schema_atlas::logging::{init_subscriber, new_trace_id};
use schema_atlas::progress::ProgressMode;
use schema_atlas::sources::list_sources;
use schema_atlas::stats::run_stats;
use schema_atlas::validate::run_validate;

/// Schema Atlas: harvest, normalize and catalog OpenAPI/Swagger schemas.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/atlas.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "atlas",
    about = "Schema Atlas: harvest, normalize and catalog OpenAPI/Swagger schemas",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/atlas.toml` when present, otherwise built-in
    /// defaults rooted at the current directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Progress output: `off`, `human` or `json`. Defaults to `human` on a TTY.
    #[arg(long, global = true, value_parser = parse_progress)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the APIs.guru index.
    ///
    /// Writes `sources/apis-guru-index.json` (every version of every API)
    /// and `sources/seeds.apis-guru.json` (preferred versions). Fails when
    /// the index cannot be fetched.
    Seed,

    /// Probe every discovery target for a schema at well-known paths.
    Discover,

    /// Mine the community issue tracker for schema URLs.
    Intake,

    /// Harvest every source list, then rebuild all catalog views.
    Refresh {
        /// Use durable state in `.cache/refresh-state.json`, skipping
        /// anything already fetched successfully.
        #[arg(long)]
        resume: bool,

        /// Maximum number of new items to process (0 = unlimited).
        #[arg(long)]
        max: Option<usize>,
    },

    /// Resumable harvest of every version listed in the APIs.guru index.
    FetchAll {
        /// Maximum number of new items to process (0 = unlimited).
        #[arg(long)]
        max: Option<usize>,

        /// Forget previous outcomes and start from scratch.
        #[arg(long)]
        reset: bool,
    },

    /// Rebuild catalog views from the schema repository.
    Build {
        /// `plain`, `search`, `bridge` or `all`.
        #[arg(default_value = "all")]
        view: String,
    },

    /// Re-validate every stored schema. Exits 1 if any fail.
    Validate,

    /// List source files and their health status.
    Sources,

    /// Show repository and fetch-state statistics.
    Stats,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Seed => "seed",
            Commands::Discover => "discover",
            Commands::Intake => "intake",
            Commands::Refresh { .. } => "refresh",
            Commands::FetchAll { .. } => "fetch-all",
            Commands::Build { .. } => "build",
            Commands::Validate => "validate",
            Commands::Sources => "sources",
            Commands::Stats => "stats",
        }
    }
}

fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s).ok_or_else(|| format!("invalid progress mode '{}': use off, human or json", s))
}

/// Run one command. Returns the process exit code.
async fn dispatch(cli: Cli, cfg: Config) -> anyhow::Result<i32> {
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Seed => run_seed(&cfg).await?,
        Commands::Discover => {
            run_discover(&cfg).await?;
        }
        Commands::Intake => {
            run_intake(&cfg).await?;
        }
        Commands::Refresh { resume, max } => {
            run_refresh(&cfg, resume, max, progress.as_ref()).await?;
        }
        Commands::FetchAll { max, reset } => {
            run_fetch_all(&cfg, max, reset, progress.as_ref()).await?;
        }
        Commands::Build { view } => {
            let kinds = parse_kinds(&view)?;
            run_build(&cfg, &kinds)?;
        }
        Commands::Validate => {
            let failed = run_validate(&cfg).await?;
            if failed > 0 {
                return Ok(1);
            }
        }
        Commands::Sources => list_sources(&cfg)?,
        Commands::Stats => run_stats(&cfg)?,
    }

    Ok(0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber(cli.log_json);

    let cfg = load_or_default(cli.config.as_deref())?;

    let span = tracing::info_span!(
        "command",
        name = cli.command.name(),
        trace_id = %new_trace_id()
    );
    let code = dispatch(cli, cfg).instrument(span).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
