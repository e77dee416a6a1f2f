//! Per-kind resolution rules on top of a [`PluginResolver`].
//!
//! - build: plain lookup, module must export `build`
//! - runtime: `{name}/runtime` first, then `{name}`; module must export `runtime`
//! - deploy: plain lookup, no sub-location fallback

use std::path::Path;
use std::rc::Rc;

use tracing::debug;

use crate::config::PluginArgs;
use crate::deploy::Deployer;
use crate::error::FabError;

use super::{BuildPluginDescriptor, PluginKind, PluginReference, PluginResolver, RuntimePluginDescriptor};

/// Resolve `name` to a module location following the rules for `kind`.
pub fn resolve(
  resolver: &dyn PluginResolver,
  base: &Path,
  name: &str,
  kind: PluginKind,
) -> Result<PluginReference, FabError> {
  let location = match kind {
    PluginKind::Build => resolver.locate(base, name).ok_or_else(|| {
      FabError::InvalidConfig(format!(
        "Cannot find module '{}', which was referenced in the 'build' config.\nAre you sure it's installed?",
        name
      ))
    })?,
    PluginKind::Runtime => {
      let sub_location = runtime_sub_location(name);
      resolver
        .locate(base, &sub_location)
        .or_else(|| resolver.locate(base, name))
        .ok_or_else(|| {
          FabError::InvalidConfig(format!(
            "The plugin '{}' could not be found!\nLooked for {} and {}, expected a named export 'runtime'.",
            name, sub_location, name
          ))
        })?
    }
    PluginKind::Deploy => resolver.locate(base, name).ok_or_else(|| {
      FabError::InvalidConfig(format!(
        "Cannot find hosting provider module '{}'.\nAre you sure it's installed?",
        name
      ))
    })?,
  };

  debug!(plugin = name, kind = %kind, location = %location, "resolved plugin");

  Ok(PluginReference {
    declared_name: name.to_string(),
    location,
    kind,
  })
}

/// Resolve one entry of the `build` section.
pub fn resolve_build_plugin(
  resolver: &dyn PluginResolver,
  base: &Path,
  name: &str,
  args: &PluginArgs,
) -> Result<BuildPluginDescriptor, FabError> {
  let reference = resolve(resolver, base, name, PluginKind::Build)?;
  let builder = resolver.load_build(&reference)?.ok_or_else(|| {
    FabError::invalid_plugin(
      name,
      format!(
        "The plugin '{}' has no 'build' export, but is referenced in the 'build' section of the config!",
        name
      ),
    )
  })?;

  Ok(BuildPluginDescriptor {
    name: name.to_string(),
    args: args.clone(),
    builder,
  })
}

/// Resolve one entry of the `runtime` section.
///
/// The module is never run here, but it must export `runtime`: a module
/// without it fails now rather than on the deployed server.
pub fn resolve_runtime_plugin(
  resolver: &dyn PluginResolver,
  base: &Path,
  name: &str,
) -> Result<RuntimePluginDescriptor, FabError> {
  let reference = resolve(resolver, base, name, PluginKind::Runtime)?;

  if !resolver.has_runtime_export(&reference)? {
    return Err(FabError::invalid_plugin(
      name,
      format!(
        "The plugin '{}' has no 'runtime' export, but is referenced in the 'runtime' section of the config!\nLooked in {} and {}, expected a named export 'runtime'.",
        name,
        runtime_sub_location(name),
        name
      ),
    ));
  }

  Ok(RuntimePluginDescriptor {
    name: reference.declared_name,
    location: reference.location,
  })
}

/// Resolve and load a hosting provider module.
pub fn load_deployer(resolver: &dyn PluginResolver, base: &Path, module: &str) -> Result<Rc<dyn Deployer>, FabError> {
  let reference = resolve(resolver, base, module, PluginKind::Deploy)?;
  resolver.load_deployer(&reference)
}

fn runtime_sub_location(name: &str) -> String {
  format!("{}/runtime", name.trim_end_matches('/'))
}
