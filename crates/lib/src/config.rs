//! `fab.config.json` loading.
//!
//! The config has three sections, all order-sensitive:
//!
//! ```json
//! {
//!   "build": { "./plugins/input-static": { "dir": "public" }, "@fab/rewire-assets": {} },
//!   "runtime": ["@fab/server-render"],
//!   "deploy": { "cf-workers": { "account_id": "abc" } }
//! }
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::FabError;

/// Arguments handed to a build plugin, opaque to the core.
pub type PluginArgs = serde_json::Value;

/// Deploy target name -> provider-specific configuration, in declared order.
pub type DeployConfig = IndexMap<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FabConfig {
  /// Build plugins and their arguments. Declaration order is execution order.
  #[serde(default)]
  pub build: IndexMap<String, PluginArgs>,

  /// Runtime plugins embedded in the compiled manifest.
  #[serde(default)]
  pub runtime: Vec<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deploy: Option<DeployConfig>,
}

impl FabConfig {
  /// Read and parse a config file.
  pub fn load(path: &Path) -> Result<Self, FabError> {
    let content = fs::read_to_string(path).map_err(|source| FabError::ConfigRead {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&content).map_err(|source| FabError::ConfigParse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(content)
  }
}
