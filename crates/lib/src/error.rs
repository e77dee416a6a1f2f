//! Error types shared by the build and deploy pipelines.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the orchestration core.
///
/// Every variant carries a message meant for the person running the tool:
/// what went wrong and, where possible, how to fix it. Presentation and exit
/// codes belong to the caller.
#[derive(Debug, Error)]
pub enum FabError {
  /// A plugin or deploy target reference could not be resolved, or is ambiguous.
  #[error("invalid config: {0}")]
  InvalidConfig(String),

  /// A module was found but does not export what its config section requires.
  #[error("invalid plugin '{plugin}': {message}")]
  InvalidPlugin { plugin: String, message: String },

  /// The artifact left by the build plugins cannot be compiled.
  #[error("build failed: {0}")]
  BuildFailed(String),

  /// A deploy target cannot do what was asked of it.
  #[error("deploy failed: {0}")]
  Deploy(String),

  /// A plugin or hosting provider returned an error.
  #[error("plugin '{plugin}' failed: {source}")]
  PluginFailed {
    plugin: String,
    #[source]
    source: PluginError,
  },

  #[error("cannot read config {}: {source}", path.display())]
  ConfigRead {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot parse config {}: {source}", path.display())]
  ConfigParse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// The compiler refused to touch an output directory or write a path.
  #[error("cannot write output to {}: {message}", path.display())]
  Output { path: PathBuf, message: String },

  #[error("io error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl FabError {
  pub(crate) fn invalid_plugin(plugin: &str, message: impl Into<String>) -> Self {
    FabError::InvalidPlugin {
      plugin: plugin.to_string(),
      message: message.into(),
    }
  }

  pub(crate) fn plugin_failed(plugin: &str, source: impl Into<PluginError>) -> Self {
    FabError::PluginFailed {
      plugin: plugin.to_string(),
      source: source.into(),
    }
  }

  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    FabError::Io {
      path: path.into(),
      source,
    }
  }
}

/// Errors returned by plugin implementations.
#[derive(Debug, Error)]
pub enum PluginError {
  #[error("{0}")]
  Message(String),

  #[error("lua error: {0}")]
  Lua(#[from] mlua::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl From<String> for PluginError {
  fn from(message: String) -> Self {
    PluginError::Message(message)
  }
}

impl From<&str> for PluginError {
  fn from(message: &str) -> Self {
    PluginError::Message(message.to_string())
  }
}
