//! Lectern CLI - Continuous document ingestion into your knowledge store

mod commands;
mod sink;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Lectern - Continuous document ingestion into your knowledge store
#[derive(Parser)]
#[command(name = "lectern")]
#[command(version)]
#[command(about = "Continuous document ingestion into your knowledge store", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Lectern (create config and data directory)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Learn the given files once
    Learn {
        /// Files to learn
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Watch a directory and learn files as they are modified
    Watch {
        /// Directory to watch (recursively)
        path: PathBuf,

        /// Number of concurrent learner workers
        #[arg(short, long, env = "LECTERN_WORKERS")]
        workers: Option<usize>,

        /// What to do when learning a file fails: isolate, terminate
        #[arg(long)]
        policy: Option<String>,

        /// Skip modifications of files that are still waiting in the queue
        #[arg(long)]
        coalesce: bool,

        /// Queue every supported file in the directory on startup
        #[arg(long)]
        scan: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., pipeline.workers)
        key: String,

        /// Value to set
        value: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lectern=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lectern=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Learn { files } => commands::learn::run(&files),
        Commands::Watch {
            path,
            workers,
            policy,
            coalesce,
            scan,
        } => commands::watch::run(
            &path,
            commands::watch::WatchOptions {
                workers,
                policy,
                coalesce,
                scan,
            },
        ),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
