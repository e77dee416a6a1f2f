mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fab_lib::consts::DEFAULT_CONFIG_FILE;
use tracing_subscriber::EnvFilter;

use crate::cmd::{cmd_build, cmd_deploy, cmd_providers};
use crate::output::{OutputFormat, print_error};

/// fab - build and deploy FABs
#[derive(Parser)]
#[command(name = "fab")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose (debug) logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the build plugins and compile the FAB
  Build {
    /// Path to the config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Output directory (default: .fab/build next to the config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
  },

  /// Deploy a compiled FAB to the configured hosting providers
  Deploy {
    /// Path to the compiled FAB
    fab_path: PathBuf,

    /// Path to the config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Scratch directory for provider packaging output (default: .fab/deploy)
    #[arg(long)]
    package_dir: Option<PathBuf>,

    /// Deploy target to host the server
    #[arg(long)]
    server_host: Option<String>,

    /// Deploy target to host the assets
    #[arg(long)]
    assets_host: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
  },

  /// List the supported hosting providers
  Providers {
    /// Print the list as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() {
  let cli = Cli::parse();

  // RUST_LOG wins over --verbose
  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build { config, output, json } => cmd_build(&config, output.as_deref(), OutputFormat::from_json_flag(json)),
    Commands::Deploy {
      fab_path,
      config,
      package_dir,
      server_host,
      assets_host,
      json,
    } => cmd_deploy(
      &fab_path,
      &config,
      package_dir,
      server_host,
      assets_host,
      OutputFormat::from_json_flag(json),
    ),
    Commands::Providers { json } => cmd_providers(OutputFormat::from_json_flag(json)),
  };

  if let Err(err) = result {
    print_error(&format!("{:#}", err));
    std::process::exit(1);
  }
}
