//! Structural check run on a `ProtoFab` before it reaches the compiler.
//!
//! A compilable FAB holds exactly two kinds of files: the server entry
//! (`/server.js`) and anything under the assets root (`/_assets/`).

use crate::consts::{ASSETS_ROOT, SERVER_ENTRY};
use crate::proto_fab::ProtoFab;

/// Check that every file sits under one of the two permitted roots.
///
/// Returns `None` when the artifact can be compiled, otherwise a diagnostic
/// listing every offending path.
pub fn validate(proto_fab: &ProtoFab) -> Option<String> {
  let invalid: Vec<&str> = proto_fab.paths().filter(|path| !is_permitted(path)).collect();

  if invalid.is_empty() {
    return None;
  }

  let listing: Vec<String> = invalid.iter().map(|path| format!("  {}", path)).collect();
  Some(format!(
    "Build config leaves {} file(s) outside of {} (only {} may live at the root):\n{}",
    invalid.len(),
    ASSETS_ROOT,
    SERVER_ENTRY,
    listing.join("\n")
  ))
}

fn is_permitted(path: &str) -> bool {
  if path == SERVER_ENTRY {
    return true;
  }

  match path.strip_prefix(ASSETS_ROOT) {
    Some(rest) => !rest.is_empty() && rest.split('/').all(|segment| !matches!(segment, "" | "." | "..")),
    None => false,
  }
}
