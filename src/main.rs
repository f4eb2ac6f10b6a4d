use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use scheduler_manager::commands::{ControlTarget, Manager, Output};
use scheduler_manager::config::{ManagerConfig, OutputFormat};
use scheduler_manager::presentation;
use scheduler_manager::quartz::FailurePolicy;
use scheduler_manager::scheduler::{StateFilter, StorageType};

#[derive(Parser)]
#[command(
    name = "scheduler-manager",
    about = "Inspect and control Quartz scheduler jobs and fired triggers",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Quartz database path, overrides the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON output for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Report fired-trigger query failures instead of empty results
    #[arg(long, global = true)]
    fail_fast: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List of the all Jobs filtered by state (default ALL)
    List {
        /// Filter by trigger state {ALL, COMPLETE, NORMAL, EXPIRED, PAUSED, UNSCHEDULED}
        #[arg(long = "status", short = 's', default_value = "ALL")]
        status: StateFilter,
    },

    /// Detail info of the job
    Info {
        /// The job name
        job: String,
        /// The group name
        group: String,
        /// The storage type {MEMORY, MEMORY_CLUSTERED, PERSISTED}
        storage_type: StorageType,
    },

    /// Pause a job (<job> <group> <storageType>) or a group (<group> <storageType>)
    Pause {
        first: String,
        second: String,
        third: Option<String>,
    },

    /// Resume a job (<job> <group> <storageType>) or a group (<group> <storageType>)
    Resume {
        first: String,
        second: String,
        third: Option<String>,
    },

    /// Number of fired triggers in a group
    JobsIsFired {
        /// The trigger group
        group: String,
    },

    /// Whether a trigger has fired and not yet completed
    JobIsFired {
        /// The trigger name
        job: String,
    },

    /// Jobs currently in progress for a group
    ListJobsInProgress {
        /// The trigger group
        group: String,
    },

    /// Create the Quartz tables if missing (development bootstrap)
    InitStore,
}

const DEFAULT_LOG_LEVEL: &str = "warn";

/// `RUST_LOG` wins over the given level.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config fallbacks warn before the configured subscriber exists.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_LOG_LEVEL))
        .with_writer(std::io::stderr)
        .finish();
    let mut config = tracing::subscriber::with_default(bootstrap, || {
        ManagerConfig::resolve(cli.config.as_deref())
    })?;
    if let Some(db) = cli.db {
        config.datasource.path = db;
    }
    if cli.json {
        config.output.format = OutputFormat::Json;
    }
    if cli.fail_fast {
        config.query.failure_policy = FailurePolicy::FailFast;
    }

    // Initialize tracing on stderr; stdout carries command output.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.logging.level))
        .with_writer(std::io::stderr);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if let Commands::InitStore = cli.command {
        scheduler_manager::init_store(&config)?;
        println!("Quartz tables ready at {}", config.datasource.path.display());
        return Ok(());
    }

    let manager = Manager::from_config(&config);

    let output = match cli.command {
        Commands::List { status } => manager.list(status).await?,
        Commands::Info {
            job,
            group,
            storage_type,
        } => manager.info(&job, &group, storage_type).await?,
        Commands::Pause {
            first,
            second,
            third,
        } => {
            let target = ControlTarget::from_args(&first, &second, third.as_deref())?;
            manager.pause(&target).await?
        }
        Commands::Resume {
            first,
            second,
            third,
        } => {
            let target = ControlTarget::from_args(&first, &second, third.as_deref())?;
            manager.resume(&target).await?
        }
        Commands::JobsIsFired { group } => manager.jobs_is_fired(&group)?,
        Commands::JobIsFired { job } => manager.job_is_fired(&job)?,
        Commands::ListJobsInProgress { group } => manager.list_jobs_in_progress(&group)?,
        Commands::InitStore => Output::Nothing,
    };

    match output {
        Output::Table(table) => match config.output.format {
            OutputFormat::Text => {
                print!("{}", presentation::render_text(&table, config.output.table_width))
            }
            OutputFormat::Json => println!("{}", presentation::render_json(&table)?),
        },
        Output::Count(count) => println!("{}", count),
        Output::Flag(flag) => println!("{}", flag),
        Output::Nothing => {}
    }

    Ok(())
}
