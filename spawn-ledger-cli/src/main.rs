//! spawn-ledger CLI
//!
//! Command-line companion for tracking crafting-resource spawns and
//! synchronizing them with the community resource database.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use spawn_ledger_core::Galaxy;
use spawn_ledger_net::{Credentials, HttpResourceService};
use spawn_ledger_registry::{Notifier, ResourceRegistry};
use spawn_ledger_sync::cache::ExportKind;
use spawn_ledger_sync::{Settings, SyncManager, settings};

mod commands;
mod error;

use error::CliError;

#[derive(Parser)]
#[command(name = "spawn-ledger")]
#[command(about = "Track crafting-resource spawns and sync with the community database", long_about = None)]
struct Cli {
    /// Galaxy id (defaults to the main galaxy from settings)
    #[arg(short, long, global = true)]
    galaxy: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server freshness and the state of local caches
    Status,

    /// Refresh cached exports (categories, servers, current resources)
    Refresh {
        /// Refresh only the current-resources export for the galaxy
        #[arg(long)]
        resources_only: bool,
    },

    /// Look up a resource by name or remote id
    Lookup {
        /// Resource name, or a numeric remote id
        query: String,
    },

    /// List known galaxies from the servers export
    Galaxies,

    /// Rate a known resource against a weight vector
    Rate {
        /// Resource name, or a numeric remote id
        query: String,
        /// Weights as STAT=VALUE pairs (e.g. "OQ=66,DR=34")
        #[arg(short, long)]
        weights: String,
        /// Class token providing the caps (defaults to the resource's own class)
        #[arg(long)]
        caps_class: Option<String>,
        /// Count an expected-but-unmeasured stat as sitting at its cap
        #[arg(long)]
        zero_is_max: bool,
        /// Prefer the resource's own class cap when it is higher
        #[arg(long)]
        own_cap_wins: bool,
    },

    /// List resources matching a threshold filter
    Filter {
        /// Thresholds as STAT=VALUE pairs (e.g. "OQ=900,DR=500")
        thresholds: String,
        /// Require every threshold to hold (default: any one suffices)
        #[arg(long)]
        all: bool,
        /// Match resources even when a referenced stat is unmeasured
        #[arg(long)]
        accept_no_stats: bool,
    },

    /// Scan for suspiciously similar names before submitting
    Dupes {
        /// Candidate resource name
        name: String,
        /// Resource class token
        #[arg(short, long)]
        class: String,
    },

    /// Submit a new resource to the remote database
    Submit {
        /// Resource name
        name: String,
        /// Resource class token
        #[arg(short, long)]
        class: String,
        /// Stat values in game order, one per expected stat (e.g. "500 650 312")
        #[arg(short, long)]
        stats: String,
        /// Submit even when near duplicates were found
        #[arg(long)]
        force: bool,
    },

    /// Report a resource as no longer spawned
    Deplete {
        /// Resource name, or a numeric remote id
        query: String,
    },

    /// Run the periodic refresher in the foreground
    Watch,
}

/// Everything a command needs, built once at startup and injected.
/// There are no process-wide singletons; this struct is the composition
/// root.
pub struct App {
    pub settings: Settings,
    pub registry: Arc<ResourceRegistry>,
    pub notifier: Arc<Notifier>,
    pub service: Arc<HttpResourceService>,
    pub manager: Arc<SyncManager<HttpResourceService>>,
}

impl App {
    fn bootstrap() -> Result<Self, CliError> {
        let settings = settings::load();

        // Submissions need an account; lookups and refreshes don't. A
        // missing credentials file is only an error once `submit` runs.
        let credentials = Credentials::load().ok();
        let service = Arc::new(HttpResourceService::new(
            settings.server_url.clone(),
            credentials,
        )?);

        let registry = Arc::new(ResourceRegistry::new());
        let notifier = Arc::new(Notifier::new());
        let manager = Arc::new(SyncManager::with_default_cache_dir(
            service.clone(),
            registry.clone(),
            notifier.clone(),
        )?);

        Ok(Self {
            settings,
            registry,
            notifier,
            service,
            manager,
        })
    }

    /// Ingest whatever the previous session cached, so lookups and scans
    /// work before (and without) the first refresh.
    fn load_caches(&self, galaxy: Option<Galaxy>) {
        for kind in [ExportKind::Categories, ExportKind::Servers] {
            if let Err(err) = self.manager.load_cached(kind) {
                log::warn!("could not load cached {}: {err}", kind.file_name());
            }
        }
        if let Some(galaxy) = galaxy {
            if let Err(err) = self
                .manager
                .load_cached(ExportKind::CurrentResources(galaxy))
            {
                log::warn!("could not load cached {galaxy} resources: {err}");
            }
        }
    }

    /// The galaxy a command operates on: CLI flag first, then settings.
    fn galaxy(&self, flag: Option<u32>) -> Result<Galaxy, CliError> {
        flag.map(Galaxy)
            .or(self.settings.main_galaxy)
            .ok_or_else(|| {
                CliError::usage("no galaxy selected; pass --galaxy or set one in settings.toml")
            })
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!(
                "{} {err}",
                "error:".if_supports_color(Stderr, |t| t.red())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let app = App::bootstrap()?;

    match cli.command {
        Commands::Status => commands::status::run(&app),
        Commands::Refresh { resources_only } => {
            let galaxy = app.galaxy(cli.galaxy)?;
            app.load_caches(Some(galaxy));
            commands::refresh::run(&app, galaxy, resources_only)
        }
        Commands::Lookup { query } => {
            let galaxy = app.galaxy(cli.galaxy)?;
            app.load_caches(Some(galaxy));
            commands::lookup::run(&app, galaxy, &query)
        }
        Commands::Galaxies => {
            app.load_caches(None);
            commands::galaxies::run(&app)
        }
        Commands::Rate {
            query,
            weights,
            caps_class,
            zero_is_max,
            own_cap_wins,
        } => {
            let galaxy = app.galaxy(cli.galaxy)?;
            app.load_caches(Some(galaxy));
            commands::rate::run(
                &app,
                galaxy,
                &query,
                &weights,
                caps_class.as_deref(),
                zero_is_max,
                own_cap_wins,
            )
        }
        Commands::Filter {
            thresholds,
            all,
            accept_no_stats,
        } => {
            let galaxy = app.galaxy(cli.galaxy)?;
            app.load_caches(Some(galaxy));
            commands::filter::run(&app, galaxy, &thresholds, all, accept_no_stats)
        }
        Commands::Dupes { name, class } => {
            let galaxy = app.galaxy(cli.galaxy)?;
            app.load_caches(Some(galaxy));
            commands::dupes::run(&app, galaxy, &name, &class)
        }
        Commands::Submit {
            name,
            class,
            stats,
            force,
        } => {
            let galaxy = app.galaxy(cli.galaxy)?;
            app.load_caches(Some(galaxy));
            commands::submit::run(&app, galaxy, &name, &class, &stats, force)
        }
        Commands::Deplete { query } => {
            let galaxy = app.galaxy(cli.galaxy)?;
            app.load_caches(Some(galaxy));
            commands::deplete::run(&app, galaxy, &query)
        }
        Commands::Watch => {
            let galaxy = app.galaxy(cli.galaxy)?;
            app.load_caches(Some(galaxy));
            commands::watch::run(app, galaxy)
        }
    }
}
