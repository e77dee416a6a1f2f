use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::PluginError;

/// The three calls a hosting provider module can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployCapability {
  /// Deploy server and assets to the same host in one go.
  Both,
  /// Upload assets; yields the location they are served from.
  Assets,
  /// Deploy the server, given where the assets live.
  Server,
}

impl DeployCapability {
  /// Name of the export as provider modules spell it.
  pub fn export_name(self) -> &'static str {
    match self {
      DeployCapability::Both => "deployBoth",
      DeployCapability::Assets => "deployAssets",
      DeployCapability::Server => "deployServer",
    }
  }
}

impl fmt::Display for DeployCapability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.export_name())
  }
}

/// Arguments shared by every provider call.
#[derive(Debug, Clone, Copy)]
pub struct DeployRequest<'a> {
  /// The compiled FAB.
  pub fab_path: &'a Path,
  /// Scratch directory the provider may write packaging output into.
  pub package_dir: &'a Path,
  /// This provider's entry from the `deploy` config section.
  pub config: &'a Value,
}

/// A loaded hosting provider module.
///
/// Implementors override the calls they support and report them through
/// [`Deployer::supports`]; the orchestrator checks support before calling.
/// Providers own their retry and timeout policy.
#[async_trait(?Send)]
pub trait Deployer {
  fn supports(&self, capability: DeployCapability) -> bool;

  async fn deploy_both(&self, _request: &DeployRequest<'_>) -> Result<Value, PluginError> {
    Err(unsupported(DeployCapability::Both))
  }

  async fn deploy_assets(&self, _request: &DeployRequest<'_>) -> Result<String, PluginError> {
    Err(unsupported(DeployCapability::Assets))
  }

  async fn deploy_server(&self, _request: &DeployRequest<'_>, _assets_location: &str) -> Result<Value, PluginError> {
    Err(unsupported(DeployCapability::Server))
  }
}

fn unsupported(capability: DeployCapability) -> PluginError {
  PluginError::Message(format!("'{}' is not implemented by this provider", capability))
}

/// Which configured target hosts which half of the FAB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderResolution {
  pub server_provider: String,
  pub assets_provider: String,
}

impl ProviderResolution {
  pub fn is_single_provider(&self) -> bool {
    self.server_provider == self.assets_provider
  }
}

/// Inputs to [`deploy`](super::deploy) that come from the command line.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
  pub fab_path: PathBuf,
  /// Directory hosting provider modules are resolved from.
  pub modules_base: PathBuf,
  pub package_dir: PathBuf,
  /// Deploy target to use for the server, bypassing automatic selection.
  pub server_host: Option<String>,
  /// Deploy target to use for the assets, bypassing automatic selection.
  pub assets_host: Option<String>,
}

/// What a deploy produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeployOutcome {
  /// One provider deployed everything.
  Both { provider: String, result: Value },
  /// Assets went to one provider, the server to another.
  Split {
    assets_provider: String,
    assets_location: String,
    server_provider: String,
    server_result: Value,
  },
}
