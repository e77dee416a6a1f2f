//! Plugin name resolution.
//!
//! Config files name plugins (`"./plugins/input-static"`, `"@fab/rewire-assets"`)
//! and hosting providers name their deployer modules. This module turns those
//! names into callable capabilities through a pluggable [`PluginResolver`].
//!
//! # Submodules
//!
//! - [`registry`] - compiled-in registration table for Rust plugins
//! - [`resolve`] - per-kind resolution rules (runtime fallback, export checks)
//!
//! The Lua backend lives in [`crate::lua`].

pub mod registry;
pub mod resolve;

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::PluginArgs;
use crate::deploy::Deployer;
use crate::error::{FabError, PluginError};
use crate::proto_fab::ProtoFab;

pub use registry::{PluginRegistry, RegisteredModule};
pub use resolve::{load_deployer, resolve, resolve_build_plugin, resolve_runtime_plugin};

/// Which config section a plugin reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
  Build,
  Runtime,
  Deploy,
}

impl fmt::Display for PluginKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PluginKind::Build => write!(f, "build"),
      PluginKind::Runtime => write!(f, "runtime"),
      PluginKind::Deploy => write!(f, "deploy"),
    }
  }
}

/// Where a resolved module lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginLocation {
  /// A module file on disk.
  Path(PathBuf),
  /// A module compiled into the binary.
  Registered(String),
}

impl fmt::Display for PluginLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PluginLocation::Path(path) => write!(f, "{}", path.display()),
      PluginLocation::Registered(name) => write!(f, "registry:{}", name),
    }
  }
}

/// A plugin name bound to a location. Short-lived: produced by resolution,
/// consumed by the matching `load_*` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginReference {
  pub declared_name: String,
  pub location: PluginLocation,
  pub kind: PluginKind,
}

/// A build step contributed by a plugin.
///
/// Plugins receive the artifact by exclusive reference and mutate it in place.
/// Steps run one at a time, so a step sees everything earlier steps wrote.
#[async_trait(?Send)]
pub trait BuildPlugin {
  async fn build(&self, args: &PluginArgs, proto_fab: &mut ProtoFab) -> Result<(), PluginError>;
}

/// Adapter letting a plain closure act as a [`BuildPlugin`].
pub struct FnBuildPlugin<F>(pub F);

#[async_trait(?Send)]
impl<F> BuildPlugin for FnBuildPlugin<F>
where
  F: Fn(&PluginArgs, &mut ProtoFab) -> Result<(), PluginError>,
{
  async fn build(&self, args: &PluginArgs, proto_fab: &mut ProtoFab) -> Result<(), PluginError> {
    (self.0)(args, proto_fab)
  }
}

/// One resolved entry of the `build` section.
#[derive(Clone)]
pub struct BuildPluginDescriptor {
  pub name: String,
  pub args: PluginArgs,
  pub builder: Rc<dyn BuildPlugin>,
}

impl fmt::Debug for BuildPluginDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BuildPluginDescriptor")
      .field("name", &self.name)
      .field("args", &self.args)
      .finish_non_exhaustive()
  }
}

/// One resolved entry of the `runtime` section. Recorded, never run, at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimePluginDescriptor {
  pub name: String,
  pub location: PluginLocation,
}

/// Backend that finds modules by name and exposes their capabilities.
///
/// `locate` answers "does a module with this name exist?" without any
/// fallback logic; the per-kind rules live in [`resolve`].
pub trait PluginResolver {
  /// Find the module `name`, relative to `base` where the backend has a notion of paths.
  fn locate(&self, base: &Path, name: &str) -> Option<PluginLocation>;

  /// Load the module's build step. `Ok(None)` means the module has no `build` export.
  fn load_build(&self, reference: &PluginReference) -> Result<Option<Rc<dyn BuildPlugin>>, FabError>;

  /// Whether the module exports `runtime`.
  fn has_runtime_export(&self, reference: &PluginReference) -> Result<bool, FabError>;

  /// Load a hosting provider module.
  fn load_deployer(&self, reference: &PluginReference) -> Result<Rc<dyn Deployer>, FabError>;
}
