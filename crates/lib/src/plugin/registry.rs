//! Compiled-in plugin registration table.
//!
//! Embedders that ship their plugins as Rust code register them here by the
//! same names a config file would use. Lookups are exact; `base` paths are
//! ignored.

use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::PluginArgs;
use crate::deploy::Deployer;
use crate::error::{FabError, PluginError};
use crate::proto_fab::ProtoFab;

use super::{BuildPlugin, FnBuildPlugin, PluginLocation, PluginReference, PluginResolver};

/// The exports of one registered module. Any combination may be present.
#[derive(Clone, Default)]
pub struct RegisteredModule {
  pub build: Option<Rc<dyn BuildPlugin>>,
  pub runtime: bool,
  pub deployer: Option<Rc<dyn Deployer>>,
}

#[derive(Clone, Default)]
pub struct PluginRegistry {
  modules: IndexMap<String, RegisteredModule>,
}

impl PluginRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register (or replace) a whole module.
  pub fn register(&mut self, name: &str, module: RegisteredModule) {
    self.modules.insert(name.to_string(), module);
  }

  pub fn with_module(mut self, name: &str, module: RegisteredModule) -> Self {
    self.register(name, module);
    self
  }

  /// Add a `build` export to the module `name`, creating it if needed.
  pub fn with_build(mut self, name: &str, plugin: impl BuildPlugin + 'static) -> Self {
    self.entry(name).build = Some(Rc::new(plugin));
    self
  }

  pub fn with_build_fn<F>(self, name: &str, f: F) -> Self
  where
    F: Fn(&PluginArgs, &mut ProtoFab) -> Result<(), PluginError> + 'static,
  {
    self.with_build(name, FnBuildPlugin(f))
  }

  /// Mark the module `name` as exporting `runtime`, creating it if needed.
  pub fn with_runtime(mut self, name: &str) -> Self {
    self.entry(name).runtime = true;
    self
  }

  pub fn with_deployer(mut self, name: &str, deployer: impl Deployer + 'static) -> Self {
    self.entry(name).deployer = Some(Rc::new(deployer));
    self
  }

  /// Registered module names, in registration order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.modules.keys().map(String::as_str)
  }

  fn entry(&mut self, name: &str) -> &mut RegisteredModule {
    self.modules.entry(name.to_string()).or_default()
  }

  fn module(&self, reference: &PluginReference) -> Result<&RegisteredModule, FabError> {
    let name = match &reference.location {
      PluginLocation::Registered(name) => name,
      PluginLocation::Path(path) => {
        return Err(FabError::invalid_plugin(
          &reference.declared_name,
          format!("{} is a file location, not a registered module", path.display()),
        ));
      }
    };

    self.modules.get(name).ok_or_else(|| {
      FabError::invalid_plugin(
        &reference.declared_name,
        format!("module '{}' is no longer registered", name),
      )
    })
  }
}

impl PluginResolver for PluginRegistry {
  fn locate(&self, _base: &Path, name: &str) -> Option<PluginLocation> {
    self
      .modules
      .contains_key(name)
      .then(|| PluginLocation::Registered(name.to_string()))
  }

  fn load_build(&self, reference: &PluginReference) -> Result<Option<Rc<dyn BuildPlugin>>, FabError> {
    Ok(self.module(reference)?.build.clone())
  }

  fn has_runtime_export(&self, reference: &PluginReference) -> Result<bool, FabError> {
    Ok(self.module(reference)?.runtime)
  }

  fn load_deployer(&self, reference: &PluginReference) -> Result<Rc<dyn Deployer>, FabError> {
    self.module(reference)?.deployer.clone().ok_or_else(|| {
      FabError::invalid_plugin(
        &reference.declared_name,
        format!(
          "'{}' is not a hosting provider module: it exports no deploy functions",
          reference.declared_name
        ),
      )
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::plugin::PluginKind;

  fn noop(_: &PluginArgs, _: &mut ProtoFab) -> Result<(), PluginError> {
    Ok(())
  }

  #[test]
  fn exports_accumulate_on_one_module() {
    let registry = PluginRegistry::new()
      .with_build_fn("@fab/both", noop)
      .with_runtime("@fab/both");

    let reference = PluginReference {
      declared_name: "@fab/both".to_string(),
      location: registry.locate(Path::new("."), "@fab/both").unwrap(),
      kind: PluginKind::Build,
    };

    assert!(registry.load_build(&reference).unwrap().is_some());
    assert!(registry.has_runtime_export(&reference).unwrap());
    assert_eq!(registry.names().collect::<Vec<_>>(), ["@fab/both"]);
  }

  #[test]
  fn locate_is_exact() {
    let registry = PluginRegistry::new().with_runtime("@fab/a");

    assert!(registry.locate(Path::new("."), "@fab/a").is_some());
    assert!(registry.locate(Path::new("."), "@fab/a/").is_none());
    assert!(registry.locate(Path::new("."), "@fab").is_none());
  }

  #[test]
  fn module_without_deployer_is_rejected() {
    let registry = PluginRegistry::new().with_build_fn("@fab/input-static", noop);
    let reference = PluginReference {
      declared_name: "@fab/input-static".to_string(),
      location: PluginLocation::Registered("@fab/input-static".to_string()),
      kind: PluginKind::Deploy,
    };

    let err = registry.load_deployer(&reference).err().unwrap();
    assert!(matches!(err, FabError::InvalidPlugin { .. }));
  }
}
