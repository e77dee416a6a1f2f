//! Lua plugin backend.
//!
//! Plugins and hosting provider modules can be written as Lua files that
//! return a table of exports. [`LuaResolver`] finds them on disk and adapts
//! their exports to the [`crate::plugin`] traits.
//!
//! # Submodules
//!
//! - [`loaders`] - file loading with a per-file `__dir`
//! - [`proto_fab`] - the artifact as Lua userdata
//! - [`resolver`] - [`PluginResolver`](crate::plugin::PluginResolver) over Lua modules
//! - [`runtime`] - Lua state setup and the `fab` global

pub mod loaders;
pub mod proto_fab;
pub mod resolver;
pub mod runtime;

use mlua::prelude::*;
use serde::Serialize;

pub use resolver::LuaResolver;

/// Convert a Rust value to Lua with JSON `null` mapped to `nil`.
pub(crate) fn to_lua<T: Serialize + ?Sized>(lua: &Lua, value: &T) -> LuaResult<LuaValue> {
  lua.to_value_with(
    value,
    LuaSerializeOptions::new()
      .serialize_none_to_null(false)
      .serialize_unit_to_null(false),
  )
}
