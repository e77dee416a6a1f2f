//! The in-progress FAB that build plugins write into.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Mutable accumulator for a FAB under construction.
///
/// Files are keyed by absolute, `/`-separated paths (`/server.js`,
/// `/_assets/app.js`). Paths passed in without a leading slash are
/// normalized on the way in so plugins can write either form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtoFab {
  files: BTreeMap<String, Vec<u8>>,
  metadata: Map<String, Value>,
}

impl ProtoFab {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add or replace a file. Returns the previous content, if any.
  pub fn add_file(&mut self, path: &str, content: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
    self.files.insert(normalize_path(path), content.into())
  }

  pub fn get_file(&self, path: &str) -> Option<&[u8]> {
    self.files.get(&normalize_path(path)).map(Vec::as_slice)
  }

  pub fn has_file(&self, path: &str) -> bool {
    self.files.contains_key(&normalize_path(path))
  }

  pub fn remove_file(&mut self, path: &str) -> Option<Vec<u8>> {
    self.files.remove(&normalize_path(path))
  }

  /// Move a file to a new path, replacing anything already there.
  ///
  /// Returns `false` when `from` does not exist.
  pub fn rename_file(&mut self, from: &str, to: &str) -> bool {
    match self.files.remove(&normalize_path(from)) {
      Some(content) => {
        self.files.insert(normalize_path(to), content);
        true
      }
      None => false,
    }
  }

  /// All file paths, sorted.
  pub fn paths(&self) -> impl Iterator<Item = &str> {
    self.files.keys().map(String::as_str)
  }

  pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
    self.files.iter().map(|(path, content)| (path.as_str(), content.as_slice()))
  }

  pub fn file_count(&self) -> usize {
    self.files.len()
  }

  pub fn set_metadata(&mut self, key: &str, value: Value) -> Option<Value> {
    self.metadata.insert(key.to_string(), value)
  }

  pub fn get_metadata(&self, key: &str) -> Option<&Value> {
    self.metadata.get(key)
  }

  pub fn metadata(&self) -> &Map<String, Value> {
    &self.metadata
  }
}

fn normalize_path(path: &str) -> String {
  if path.starts_with('/') {
    path.to_string()
  } else {
    format!("/{}", path)
  }
}
