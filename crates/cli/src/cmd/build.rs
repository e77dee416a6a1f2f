//! Implementation of the `fab build` command.
//!
//! Loads the config, runs every build plugin against a fresh `ProtoFab` and
//! writes the compiled FAB with a `DirectoryCompiler`. Plugin modules are
//! resolved relative to the directory holding the config file.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use fab_lib::build::build;
use fab_lib::compile::DirectoryCompiler;
use fab_lib::config::FabConfig;
use fab_lib::consts::DEFAULT_OUTPUT_DIR;
use fab_lib::lua::LuaResolver;

use crate::output::{OutputFormat, format_bytes, format_duration, print_json, print_stat, print_success};

pub fn cmd_build(config_path: &Path, output: Option<&Path>, format: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let config = FabConfig::load(config_path)?;
  let base = config_dir(config_path);
  let output_dir = output.map(Path::to_path_buf).unwrap_or_else(|| base.join(DEFAULT_OUTPUT_DIR));

  let resolver = LuaResolver::new().context("Failed to start the Lua plugin runtime")?;
  let compiler = DirectoryCompiler::new(output_dir);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt
    .block_on(build(base, &config, &resolver, &compiler))
    .context("Build failed")?;

  if format.is_json() {
    print_json(&result)?;
  } else {
    println!();
    print_success("Build complete!");
    print_stat("Output", &result.output_dir.display().to_string());
    print_stat("Manifest", &result.manifest_path.display().to_string());
    print_stat("Files", &result.file_count.to_string());
    print_stat("Size", &format_bytes(result.total_bytes));
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}

/// Directory of the config file; `.` for a bare file name.
fn config_dir(config_path: &Path) -> &Path {
  match config_path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  }
}
