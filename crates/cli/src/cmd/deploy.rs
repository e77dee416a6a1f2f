//! Implementation of the `fab deploy` command.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::debug;

use fab_lib::config::FabConfig;
use fab_lib::consts::DEFAULT_PACKAGE_DIR;
use fab_lib::deploy::{DeployOptions, DeployOutcome, ProviderRegistry, deploy};
use fab_lib::lua::LuaResolver;

use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success, symbols};

/// Execute the deploy command.
///
/// Hosting provider modules are resolved from the current directory, so
/// `fab_modules/` there is where deployer modules are installed.
pub fn cmd_deploy(
  fab_path: &Path,
  config_path: &Path,
  package_dir: Option<PathBuf>,
  server_host: Option<String>,
  assets_host: Option<String>,
  format: OutputFormat,
) -> Result<()> {
  let start = Instant::now();

  if !fab_path.exists() {
    bail!("FAB not found: {} (run `fab build` first)", fab_path.display());
  }

  let config = FabConfig::load(config_path)?;
  let cwd = std::env::current_dir().context("Failed to determine current directory")?;

  let options = DeployOptions {
    fab_path: fab_path.to_path_buf(),
    package_dir: package_dir.unwrap_or_else(|| cwd.join(DEFAULT_PACKAGE_DIR)),
    modules_base: cwd,
    server_host,
    assets_host,
  };

  debug!(?options, "deploy options");

  let providers = ProviderRegistry::builtin();
  let resolver = LuaResolver::new().context("Failed to start the Lua plugin runtime")?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt
    .block_on(deploy(&config, &options, &providers, &resolver))
    .context("Deploy failed")?;

  if format.is_json() {
    print_json(&outcome)?;
    return Ok(());
  }

  println!();
  match &outcome {
    DeployOutcome::Both { provider, result } => {
      print_success(&format!("Deployed to {}", provider));
      print_stat("Result", &result.to_string());
    }
    DeployOutcome::Split {
      assets_provider,
      assets_location,
      server_provider,
      server_result,
    } => {
      print_success(&format!("Deployed to {} and {}", assets_provider, server_provider));
      print_stat(
        "Assets",
        &format!("{} {} {}", assets_provider, symbols::ARROW, assets_location),
      );
      print_stat("Server", &format!("{} {} {}", server_provider, symbols::ARROW, server_result));
    }
  }
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
