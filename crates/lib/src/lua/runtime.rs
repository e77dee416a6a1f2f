use std::path::PathBuf;

use mlua::prelude::*;
use tracing::{debug, error, info, warn};

use super::loaders;

/// Create the Lua state plugin modules run in.
///
/// Each search directory is put in front of `package.path` so plugins can
/// `require` helpers shipped alongside them, `require` is hooked to provide
/// `__dir`, and the `fab` global is registered.
pub fn create_runtime(search_dirs: &[PathBuf]) -> LuaResult<Lua> {
  let lua = Lua::new();

  let package = lua.globals().get::<LuaTable>("package")?;
  let mut package_path = String::new();
  for dir in search_dirs {
    let dir = dir.display();
    package_path.push_str(&format!("{dir}/?.lua;{dir}/?/init.lua;"));
  }
  package_path.push_str(&package.get::<String>("path")?);
  package.set("path", package_path)?;

  loaders::install_loaders(&lua)?;
  register_globals(&lua)?;

  Ok(lua)
}

/// Register the `fab` global table.
///
/// - `fab.log.debug|info|warn|error(msg)` - forward to `tracing`
fn register_globals(lua: &Lua) -> LuaResult<()> {
  let fab = lua.create_table()?;
  let log = lua.create_table()?;

  log.set("debug", log_fn(lua, |msg| debug!("{}", msg))?)?;
  log.set("info", log_fn(lua, |msg| info!("{}", msg))?)?;
  log.set("warn", log_fn(lua, |msg| warn!("{}", msg))?)?;
  log.set("error", log_fn(lua, |msg| error!("{}", msg))?)?;

  fab.set("log", log)?;
  lua.globals().set("fab", fab)?;
  Ok(())
}

fn log_fn(lua: &Lua, emit: fn(&str)) -> LuaResult<LuaFunction> {
  lua.create_function(move |_, msg: LuaValue| {
    let msg = match msg {
      LuaValue::String(s) => s.to_string_lossy(),
      other => other.to_string()?,
    };
    emit(&msg);
    Ok(())
  })
}
