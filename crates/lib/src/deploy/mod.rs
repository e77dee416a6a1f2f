//! Deploying a compiled FAB to its hosting providers.
//!
//! The server and the assets of a FAB may go to one provider or to two.
//! [`resolve`] decides which configured targets are used; [`deploy`] loads
//! their modules and makes the calls:
//!
//! - one provider: a single `deployBoth`
//! - two providers: `deployAssets` first, then `deployServer` with the
//!   location the assets were published to
//!
//! # Submodules
//!
//! - [`providers`] - the registry of supported hosting providers
//! - [`resolve`] - capability-based target selection

pub mod providers;
pub mod resolve;
mod types;

use std::fs;
use std::rc::Rc;

use serde_json::Value;
use tracing::{info, instrument};

use crate::config::{DeployConfig, FabConfig};
use crate::consts::DEPLOYING_DOCS;
use crate::error::FabError;
use crate::plugin::{PluginResolver, load_deployer};

pub use providers::{Capabilities, HostKind, HostingProvider, ProviderRegistry};
pub use types::*;

/// Deploy the FAB at `options.fab_path` according to the `deploy` section of `config`.
///
/// Both provider modules are loaded and checked for the calls they must
/// support before anything is uploaded.
#[instrument(skip_all, fields(fab = %options.fab_path.display()))]
pub async fn deploy(
  config: &FabConfig,
  options: &DeployOptions,
  providers: &ProviderRegistry,
  resolver: &dyn PluginResolver,
) -> Result<DeployOutcome, FabError> {
  let deploy_config = config.deploy.as_ref().ok_or_else(|| {
    FabError::Deploy(format!(
      "For the moment, you need to have your fab.config.json \"deploy\" section configured.\nSee {} for more information.",
      DEPLOYING_DOCS
    ))
  })?;

  info!(path = %options.package_dir.display(), "creating package directory");
  fs::create_dir_all(&options.package_dir).map_err(|e| FabError::io(&options.package_dir, e))?;

  let resolution = resolve::resolve(
    deploy_config,
    providers,
    options.server_host.as_deref(),
    options.assets_host.as_deref(),
  )?;

  let assets_module = provider_module(providers, &resolution.assets_provider)?;
  let assets_deployer = load_deployer(resolver, &options.modules_base, assets_module)?;

  if resolution.is_single_provider() {
    let provider = &resolution.assets_provider;
    require(&assets_deployer, assets_module, DeployCapability::Both)?;

    let request = DeployRequest {
      fab_path: &options.fab_path,
      package_dir: &options.package_dir,
      config: provider_config(deploy_config, provider)?,
    };

    info!(provider = %provider, "deploying server and assets");
    let result = assets_deployer
      .deploy_both(&request)
      .await
      .map_err(|e| FabError::plugin_failed(assets_module, e))?;

    return Ok(DeployOutcome::Both {
      provider: provider.clone(),
      result,
    });
  }

  require(&assets_deployer, assets_module, DeployCapability::Assets)?;

  let server_module = provider_module(providers, &resolution.server_provider)?;
  let server_deployer = load_deployer(resolver, &options.modules_base, server_module)?;
  require(&server_deployer, server_module, DeployCapability::Server)?;

  let assets_request = DeployRequest {
    fab_path: &options.fab_path,
    package_dir: &options.package_dir,
    config: provider_config(deploy_config, &resolution.assets_provider)?,
  };
  let server_request = DeployRequest {
    config: provider_config(deploy_config, &resolution.server_provider)?,
    ..assets_request
  };

  info!(provider = %resolution.assets_provider, "deploying assets");
  let assets_location = assets_deployer
    .deploy_assets(&assets_request)
    .await
    .map_err(|e| FabError::plugin_failed(assets_module, e))?;
  info!(location = %assets_location, "assets deployed");

  info!(provider = %resolution.server_provider, "deploying server");
  let server_result: Value = server_deployer
    .deploy_server(&server_request, &assets_location)
    .await
    .map_err(|e| FabError::plugin_failed(server_module, e))?;

  Ok(DeployOutcome::Split {
    assets_provider: resolution.assets_provider,
    assets_location,
    server_provider: resolution.server_provider,
    server_result,
  })
}

fn provider_module<'a>(providers: &'a ProviderRegistry, name: &str) -> Result<&'a str, FabError> {
  providers
    .get(name)
    .map(|provider| provider.module.as_str())
    .ok_or_else(|| FabError::InvalidConfig(format!("Deploy target '{}' is not a supported provider.", name)))
}

fn provider_config<'a>(deploy: &'a DeployConfig, name: &str) -> Result<&'a Value, FabError> {
  deploy
    .get(name)
    .ok_or_else(|| FabError::InvalidConfig(format!("Deploy target '{}' has no entry in the deploy config.", name)))
}

fn require(deployer: &Rc<dyn Deployer>, module: &str, capability: DeployCapability) -> Result<(), FabError> {
  if deployer.supports(capability) {
    Ok(())
  } else {
    Err(FabError::Deploy(format!(
      "{} doesn't export a '{}' method!",
      module, capability
    )))
  }
}
