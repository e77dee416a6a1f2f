//! [`PluginResolver`] over Lua modules on disk.
//!
//! Lookup rules for a name:
//!
//! - `./x`, `../x` and absolute paths are taken relative to the base path
//! - anything else is looked up in `{base}/fab_modules/` and then in each
//!   extra search directory, in order
//!
//! A candidate `p` matches when `p.lua` or `p/init.lua` is a file. Modules
//! are evaluated at most once per resolver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use async_trait::async_trait;
use mlua::prelude::*;
use serde_json::Value;
use tracing::debug;

use super::{loaders, runtime, to_lua};
use crate::config::PluginArgs;
use crate::consts::MODULES_DIR;
use crate::deploy::{DeployCapability, DeployRequest, Deployer};
use crate::error::{FabError, PluginError};
use crate::plugin::{BuildPlugin, PluginLocation, PluginReference, PluginResolver};
use crate::proto_fab::ProtoFab;

/// Finds plugin modules written in Lua and adapts their exports.
pub struct LuaResolver {
  lua: Rc<Lua>,
  search_dirs: Vec<PathBuf>,
  modules: RefCell<HashMap<PathBuf, LuaTable>>,
}

impl LuaResolver {
  /// A resolver that only looks in `{base}/fab_modules/` for bare names.
  pub fn new() -> Result<Self, FabError> {
    Self::with_search_dirs(Vec::new())
  }

  /// A resolver that also looks in `search_dirs` for bare names.
  pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Result<Self, FabError> {
    let lua = runtime::create_runtime(&search_dirs).map_err(|e| FabError::plugin_failed("lua runtime", e))?;
    Ok(Self {
      lua: Rc::new(lua),
      search_dirs,
      modules: RefCell::new(HashMap::new()),
    })
  }

  fn candidates(&self, base: &Path, name: &str) -> Vec<PathBuf> {
    if is_path_like(name) {
      return vec![base.join(name)];
    }
    std::iter::once(base.join(MODULES_DIR))
      .chain(self.search_dirs.iter().cloned())
      .map(|dir| dir.join(name))
      .collect()
  }

  /// Evaluate (or fetch from cache) the module behind `reference`.
  fn exports(&self, reference: &PluginReference) -> Result<LuaTable, FabError> {
    let name = &reference.declared_name;
    let path = match &reference.location {
      PluginLocation::Path(path) => path,
      other => {
        return Err(FabError::invalid_plugin(
          name,
          format!("'{}' is not a Lua module location", other),
        ));
      }
    };

    if let Some(exports) = self.modules.borrow().get(path) {
      return Ok(exports.clone());
    }

    debug!(plugin = %name, path = %path.display(), "loading lua module");
    let value = loaders::load_file_with_dir(&self.lua, path).map_err(|e| FabError::plugin_failed(name, e))?;
    let exports = match value {
      LuaValue::Table(table) => table,
      other => {
        return Err(FabError::invalid_plugin(
          name,
          format!(
            "Module {} must return a table of exports, got {}",
            path.display(),
            other.type_name()
          ),
        ));
      }
    };

    self.modules.borrow_mut().insert(path.clone(), exports.clone());
    Ok(exports)
  }

  fn export(&self, reference: &PluginReference, key: &str) -> Result<LuaValue, FabError> {
    self
      .exports(reference)?
      .get::<LuaValue>(key)
      .map_err(|e| FabError::plugin_failed(&reference.declared_name, e))
  }
}

impl PluginResolver for LuaResolver {
  fn locate(&self, base: &Path, name: &str) -> Option<PluginLocation> {
    self
      .candidates(base, name)
      .iter()
      .find_map(|candidate| module_file(candidate))
      .map(PluginLocation::Path)
  }

  fn load_build(&self, reference: &PluginReference) -> Result<Option<Rc<dyn BuildPlugin>>, FabError> {
    match self.export(reference, "build")? {
      LuaValue::Nil => Ok(None),
      LuaValue::Function(func) => Ok(Some(Rc::new(LuaBuildPlugin {
        lua: self.lua.clone(),
        func,
      }))),
      other => Err(FabError::invalid_plugin(
        &reference.declared_name,
        format!("The 'build' export must be a function, got {}", other.type_name()),
      )),
    }
  }

  fn has_runtime_export(&self, reference: &PluginReference) -> Result<bool, FabError> {
    Ok(!self.export(reference, "runtime")?.is_nil())
  }

  fn load_deployer(&self, reference: &PluginReference) -> Result<Rc<dyn Deployer>, FabError> {
    Ok(Rc::new(LuaDeployer {
      lua: self.lua.clone(),
      exports: self.exports(reference)?,
    }))
  }
}

fn is_path_like(name: &str) -> bool {
  name.starts_with("./") || name.starts_with("../") || Path::new(name).is_absolute()
}

/// `p.lua`, then `p/init.lua`.
fn module_file(candidate: &Path) -> Option<PathBuf> {
  let mut file = OsString::from(candidate.as_os_str());
  file.push(".lua");
  let file = PathBuf::from(file);

  [file, candidate.join("init.lua")]
    .into_iter()
    .find(|path| path.is_file())
    .and_then(|path| dunce::canonicalize(path).ok())
}

/// A Lua `build(args, fab)` function.
struct LuaBuildPlugin {
  lua: Rc<Lua>,
  func: LuaFunction,
}

#[async_trait(?Send)]
impl BuildPlugin for LuaBuildPlugin {
  async fn build(&self, args: &PluginArgs, proto_fab: &mut ProtoFab) -> Result<(), PluginError> {
    let args = to_lua(&self.lua, args)?;
    self.lua.scope(|scope| {
      let fab = scope.create_userdata_ref_mut(proto_fab)?;
      self.func.call::<()>((args, fab))
    })?;
    Ok(())
  }
}

/// A Lua hosting provider module.
struct LuaDeployer {
  lua: Rc<Lua>,
  exports: LuaTable,
}

impl LuaDeployer {
  fn function(&self, capability: DeployCapability) -> Result<LuaFunction, PluginError> {
    match self.exports.get::<LuaValue>(capability.export_name())? {
      LuaValue::Function(func) => Ok(func),
      _ => Err(PluginError::Message(format!("module has no '{}' function", capability))),
    }
  }

  fn call(
    &self,
    capability: DeployCapability,
    request: &DeployRequest<'_>,
    assets_location: Option<&str>,
  ) -> Result<LuaValue, PluginError> {
    let func = self.function(capability)?;
    let fab_path = request.fab_path.to_string_lossy().into_owned();
    let package_dir = request.package_dir.to_string_lossy().into_owned();
    let config = to_lua(&self.lua, request.config)?;
    Ok(func.call::<LuaValue>((fab_path, package_dir, config, assets_location))?)
  }

  fn to_json(&self, value: LuaValue) -> Result<Value, PluginError> {
    Ok(self.lua.from_value(value)?)
  }
}

#[async_trait(?Send)]
impl Deployer for LuaDeployer {
  fn supports(&self, capability: DeployCapability) -> bool {
    self.function(capability).is_ok()
  }

  async fn deploy_both(&self, request: &DeployRequest<'_>) -> Result<Value, PluginError> {
    let result = self.call(DeployCapability::Both, request, None)?;
    self.to_json(result)
  }

  async fn deploy_assets(&self, request: &DeployRequest<'_>) -> Result<String, PluginError> {
    match self.call(DeployCapability::Assets, request, None)? {
      LuaValue::String(location) => Ok(location.to_string_lossy()),
      other => Err(PluginError::Message(format!(
        "'{}' must return the assets location as a string, got {}",
        DeployCapability::Assets,
        other.type_name()
      ))),
    }
  }

  async fn deploy_server(&self, request: &DeployRequest<'_>, assets_location: &str) -> Result<Value, PluginError> {
    let result = self.call(DeployCapability::Server, request, Some(assets_location))?;
    self.to_json(result)
  }
}
