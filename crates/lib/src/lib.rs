//! fab-lib: build and deploy orchestration for FABs
//!
//! A FAB is a portable bundle holding one server entry point and a tree of
//! static assets. This crate provides:
//! - `build`: runs the configured build plugins, in order, against one `ProtoFab`
//! - `gate`: the structural check a `ProtoFab` must pass before compilation
//! - `compile`: the `Compiler` seam and a directory-backed implementation
//! - `deploy`: capability-based hosting provider selection and dispatch
//! - `plugin`: name resolution for build, runtime and deploy modules
//! - `lua`: a plugin backend that loads those modules from Lua files

pub mod build;
pub mod compile;
pub mod config;
pub mod consts;
pub mod deploy;
pub mod error;
pub mod gate;
pub mod lua;
pub mod plugin;
pub mod proto_fab;

pub use error::{FabError, PluginError};
