mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{ConfigArgs, SourceArgs};

/// podsync - converge podman pods under systemd
#[derive(Parser)]
#[command(name = "podsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Print machine-readable JSON
  #[arg(long, global = true)]
  json: bool,

  #[command(flatten)]
  config: ConfigArgs,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Make sure a pod exists, runs, and matches its manifest
  Apply {
    #[command(flatten)]
    source: SourceArgs,
  },

  /// Stop a pod and remove it with its unit files
  Remove {
    #[command(flatten)]
    source: SourceArgs,
  },

  /// Show the action plan without touching the host
  Plan {
    #[command(flatten)]
    source: SourceArgs,

    /// Plan removal instead of convergence
    #[arg(long)]
    absent: bool,
  },

  /// Show whether a pod exists and its service is active
  Status {
    /// Pod name
    #[arg(long, value_name = "POD")]
    name: String,

    /// Query the pod of this provisioned user
    #[arg(long, value_name = "USER")]
    user: Option<String>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let config = cli.config.build();
  match cli.command {
    Commands::Apply { source } => cmd::cmd_apply(&source, config, cli.json),
    Commands::Remove { source } => cmd::cmd_remove(&source, config, cli.json),
    Commands::Plan { source, absent } => cmd::cmd_plan(&source, config, absent, cli.json),
    Commands::Status { name, user } => cmd::cmd_status(&name, user.as_deref(), config, cli.json),
  }
}
