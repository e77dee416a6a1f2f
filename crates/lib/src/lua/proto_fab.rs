//! `ProtoFab` as Lua userdata.
//!
//! Build plugins receive the artifact as their second argument:
//!
//! ```lua
//! return {
//!   build = function(args, fab)
//!     for _, path in ipairs(fab:files()) do
//!       if path ~= "/server.js" then
//!         fab:rename_file(path, "/_assets" .. path)
//!       end
//!     end
//!   end,
//! }
//! ```
//!
//! The userdata only lives for the duration of the `build` call.

use mlua::prelude::*;

use crate::proto_fab::ProtoFab;

impl LuaUserData for ProtoFab {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method_mut("add_file", |_, this, (path, content): (String, LuaString)| {
      this.add_file(&path, content.as_bytes().to_vec());
      Ok(())
    });

    methods.add_method("get_file", |lua, this, path: String| {
      this.get_file(&path).map(|content| lua.create_string(content)).transpose()
    });

    methods.add_method("has_file", |_, this, path: String| Ok(this.has_file(&path)));

    methods.add_method_mut("remove_file", |_, this, path: String| Ok(this.remove_file(&path).is_some()));

    methods.add_method_mut("rename_file", |_, this, (from, to): (String, String)| {
      Ok(this.rename_file(&from, &to))
    });

    methods.add_method("files", |_, this, ()| {
      Ok(this.paths().map(str::to_string).collect::<Vec<_>>())
    });

    methods.add_method_mut("set_meta", |lua, this, (key, value): (String, LuaValue)| {
      let value: serde_json::Value = lua.from_value(value)?;
      this.set_metadata(&key, value);
      Ok(())
    });

    methods.add_method("get_meta", |lua, this, key: String| {
      this.get_metadata(&key).map(|value| super::to_lua(lua, value)).transpose()
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  /// Run `code` as a function of `fab` against a borrowed ProtoFab.
  ///
  /// The returned value belongs to `lua`, which must outlive it.
  fn run(lua: &Lua, fab: &mut ProtoFab, code: &str) -> LuaResult<LuaValue> {
    let func: LuaFunction = lua.load(code).eval()?;
    lua.scope(|scope| {
      let ud = scope.create_userdata_ref_mut(fab)?;
      func.call::<LuaValue>(ud)
    })
  }

  #[test]
  fn lua_writes_are_visible_in_rust() -> LuaResult<()> {
    let mut fab = ProtoFab::new();

    run(
      &Lua::new(),
      &mut fab,
      r#"
        return function(fab)
          fab:add_file("server.js", "export default {}")
          fab:add_file("/_assets/app.js", "console.log(1)")
          fab:set_meta("render", { spa = true })
        end
      "#,
    )?;

    assert_eq!(fab.get_file("/server.js"), Some(b"export default {}".as_slice()));
    assert!(fab.has_file("/_assets/app.js"));
    assert_eq!(fab.get_metadata("render"), Some(&json!({ "spa": true })));
    Ok(())
  }

  #[test]
  fn lua_sees_rust_contents() -> LuaResult<()> {
    let mut fab = ProtoFab::new();
    fab.add_file("/index.html", "<html>");
    fab.add_file("/server.js", "s");
    fab.set_metadata("name", json!("site"));

    let lua = Lua::new();
    let result = run(
      &lua,
      &mut fab,
      r#"
        return function(fab)
          local files = fab:files()
          return table.concat(files, ",") .. "|" .. fab:get_file("/index.html") .. "|" .. fab:get_meta("name")
            .. "|" .. tostring(fab:has_file("/missing")) .. "|" .. tostring(fab:get_file("/missing"))
        end
      "#,
    )?;

    assert_eq!(result.to_string()?, "/index.html,/server.js|<html>|site|false|nil");
    Ok(())
  }

  #[test]
  fn lua_can_move_and_remove_files() -> LuaResult<()> {
    let mut fab = ProtoFab::new();
    fab.add_file("/index.html", "<html>");
    fab.add_file("/junk.txt", "x");

    run(
      &Lua::new(),
      &mut fab,
      r#"
        return function(fab)
          assert(fab:rename_file("/index.html", "/_assets/index.html"))
          assert(not fab:rename_file("/nope", "/_assets/nope"))
          assert(fab:remove_file("/junk.txt"))
        end
      "#,
    )?;

    assert_eq!(fab.paths().collect::<Vec<_>>(), ["/_assets/index.html"]);
    Ok(())
  }

  #[test]
  fn binary_content_survives() -> LuaResult<()> {
    let mut fab = ProtoFab::new();
    run(
      &Lua::new(),
      &mut fab,
      r#"
        return function(fab)
          fab:add_file("/_assets/blob.bin", "\0\1\255")
        end
      "#,
    )?;

    assert_eq!(fab.get_file("/_assets/blob.bin"), Some([0u8, 1, 255].as_slice()));
    Ok(())
  }
}
