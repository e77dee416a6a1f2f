//! Lua module loading with a per-file `__dir`.
//!
//! Plugin modules are plain Lua files returning a table of exports. Each file
//! is evaluated in its own environment that inherits from `_G` and carries
//! `__dir`, the directory of the file, so plugins can find files shipped next
//! to them. `require` is hooked through `package.searchers[2]` so helper
//! modules pulled in by a plugin get the same treatment.

use std::fs;
use std::path::Path;

use mlua::prelude::*;

/// Evaluate a Lua file with `__dir` set, returning whatever the chunk returns.
pub fn load_file_with_dir(lua: &Lua, path: &Path) -> LuaResult<LuaValue> {
  let canonical_path =
    dunce::canonicalize(path).map_err(|e| LuaError::external(format!("cannot resolve '{}': {}", path.display(), e)))?;

  let content = fs::read_to_string(&canonical_path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical_path.display(), e)))?;

  let dir = canonical_path
    .parent()
    .unwrap_or(Path::new("."))
    .to_string_lossy()
    .into_owned();

  let env = lua.create_table()?;
  env.set("__dir", dir)?;

  let mt = lua.create_table()?;
  mt.set("__index", lua.globals())?;
  mt.set("__newindex", lua.globals())?;
  env.set_metatable(Some(mt))?;

  lua
    .load(&content)
    .set_name(format!("@{}", canonical_path.display()))
    .set_environment(env)
    .eval::<LuaValue>()
}

/// `package.searchers[2]` replacement: `package.searchpath` lookup, `__dir` loading.
fn create_lua_searcher(lua: &Lua) -> LuaResult<LuaFunction> {
  lua.create_function(|lua, modname: String| {
    let package: LuaTable = lua.globals().get("package")?;
    let path: String = package.get("path")?;
    let searchpath: LuaFunction = package.get("searchpath")?;

    // (filepath) on success, (nil, errmsg) on failure
    let found = searchpath
      .call::<LuaMultiValue>((modname.clone(), path))?
      .into_iter()
      .next();

    match found {
      Some(LuaValue::String(filepath)) => {
        let filepath = filepath.to_str()?.to_string();
        let load_path = filepath.clone();
        let loader = lua.create_function(move |lua, _: LuaMultiValue| load_file_with_dir(lua, Path::new(&load_path)))?;
        Ok((LuaValue::Function(loader), filepath))
      }
      _ => Ok((LuaValue::Nil, format!("\n\tno file for module '{}'", modname))),
    }
  })
}

/// Hook `require` so modules it loads get `__dir`.
pub fn install_loaders(lua: &Lua) -> LuaResult<()> {
  let package: LuaTable = lua.globals().get("package")?;
  let searchers: LuaTable = package.get("searchers")?;
  searchers.set(2, create_lua_searcher(lua)?)?;
  Ok(())
}
