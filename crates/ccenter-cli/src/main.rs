mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, skills::SkillsSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ccenter",
    about = "Command Center: one consistent view of running skill executions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .ccenter/ or .git/)
    #[arg(long, global = true, env = "CCENTER_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reconciler server and its source adapters
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Feed a JSON-lines event log through a reconciler on a manual clock
    Replay {
        /// Event log, one JSON object per line
        file: PathBuf,
        /// Clock value (epoch millis) at the start of the log
        #[arg(long, default_value_t = 0)]
        start_millis: i64,
    },

    /// Show the running list of a live server
    Status {
        /// Server base URL (default: http://localhost:<server.port>)
        #[arg(long)]
        url: Option<String>,
    },

    /// Inspect skill definitions
    Skills {
        #[command(subcommand)]
        subcommand: SkillsSubcommand,
    },

    /// Show, validate or create the config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Replay { file, start_millis } => {
            cmd::replay::run(&root, &file, start_millis, cli.json)
        }
        Commands::Status { url } => cmd::status::run(&root, url.as_deref(), cli.json),
        Commands::Skills { subcommand } => cmd::skills::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
