//! Turning a validated `ProtoFab` into output on disk.
//!
//! The core only needs the [`Compiler`] seam; [`DirectoryCompiler`] is the
//! implementation the CLI uses. It writes every file of the FAB under an
//! output directory and records the runtime plugins, metadata and a sha256
//! per file in `fab.manifest.json`.
//!
//! An existing output directory is only replaced when everything in it was
//! written by an earlier compilation, i.e. is listed in its manifest.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::consts::MANIFEST_FILENAME;
use crate::error::FabError;
use crate::plugin::RuntimePluginDescriptor;
use crate::proto_fab::ProtoFab;

/// Summary of a finished compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileOutput {
  pub output_dir: PathBuf,
  pub manifest_path: PathBuf,
  pub file_count: usize,
  pub total_bytes: u64,
}

/// Serializes a validated artifact. Takes ownership: the artifact is spent afterwards.
#[async_trait(?Send)]
pub trait Compiler {
  async fn compile(
    &self,
    proto_fab: ProtoFab,
    runtime_plugins: &[RuntimePluginDescriptor],
  ) -> Result<CompileOutput, FabError>;
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
  runtime: &'a [RuntimePluginDescriptor],
  metadata: &'a Map<String, Value>,
  files: Vec<ManifestFile<'a>>,
}

#[derive(Debug, Serialize)]
struct ManifestFile<'a> {
  path: &'a str,
  size: usize,
  sha256: String,
}

/// The part of an earlier manifest needed to know what we wrote last time.
#[derive(Debug, Deserialize)]
struct PreviousManifest {
  files: Vec<PreviousFile>,
}

#[derive(Debug, Deserialize)]
struct PreviousFile {
  path: String,
}

/// Writes the FAB as a plain directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryCompiler {
  output_dir: PathBuf,
}

impl DirectoryCompiler {
  pub fn new(output_dir: impl Into<PathBuf>) -> Self {
    Self {
      output_dir: output_dir.into(),
    }
  }

  pub fn output_dir(&self) -> &Path {
    &self.output_dir
  }

  fn refuse(&self, message: impl Into<String>) -> FabError {
    FabError::Output {
      path: self.output_dir.clone(),
      message: message.into(),
    }
  }

  /// Remove the output of an earlier compilation.
  ///
  /// Fails without deleting anything if the directory holds a file the
  /// previous manifest does not list.
  fn clear_previous_output(&self) -> Result<(), FabError> {
    if !self.output_dir.exists() {
      return Ok(());
    }
    if !self.output_dir.is_dir() {
      return Err(self.refuse("it exists and is not a directory"));
    }

    let manifest_path = self.output_dir.join(MANIFEST_FILENAME);
    let previous: HashSet<PathBuf> = match fs::read_to_string(&manifest_path) {
      Ok(json) => serde_json::from_str::<PreviousManifest>(&json)
        .map_err(|e| self.refuse(format!("existing {} is not a fab manifest: {}", MANIFEST_FILENAME, e)))?
        .files
        .iter()
        .filter_map(|file| relative_target(&file.path))
        .map(|rel| self.output_dir.join(rel))
        .collect(),
      Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
      Err(e) => return Err(FabError::io(&manifest_path, e)),
    };

    let mut foreign = Vec::new();
    for entry in WalkDir::new(&self.output_dir).min_depth(1) {
      let entry = entry.map_err(|e| FabError::io(&self.output_dir, e.into()))?;
      if entry.file_type().is_dir() {
        continue;
      }
      let path = entry.path();
      if path != manifest_path && !previous.contains(path) {
        foreign.push(path.display().to_string());
      }
    }

    if !foreign.is_empty() {
      foreign.sort();
      return Err(self.refuse(format!(
        "it contains files that were not written by fab:\n  {}\nChoose an empty or fab-owned output directory.",
        foreign.join("\n  ")
      )));
    }

    debug!(path = %self.output_dir.display(), "clearing previous output");
    fs::remove_dir_all(&self.output_dir).map_err(|e| FabError::io(&self.output_dir, e))
  }
}

/// `/a/b.js` -> `a/b.js`; `None` for anything that could escape the output directory.
fn relative_target(path: &str) -> Option<&str> {
  let rel = path.strip_prefix('/')?;
  let valid = !rel.is_empty()
    && rel
      .split('/')
      .all(|segment| !matches!(segment, "" | "." | "..") && !segment.contains('\\'));
  valid.then_some(rel)
}

#[async_trait(?Send)]
impl Compiler for DirectoryCompiler {
  async fn compile(
    &self,
    proto_fab: ProtoFab,
    runtime_plugins: &[RuntimePluginDescriptor],
  ) -> Result<CompileOutput, FabError> {
    let targets = proto_fab
      .files()
      .map(|(path, content)| {
        relative_target(path)
          .map(|rel| (path, rel, content))
          .ok_or_else(|| self.refuse(format!("'{}' is not a valid FAB file path", path)))
      })
      .collect::<Result<Vec<_>, _>>()?;

    self.clear_previous_output()?;
    fs::create_dir_all(&self.output_dir).map_err(|e| FabError::io(&self.output_dir, e))?;

    let mut files = Vec::with_capacity(targets.len());
    let mut total_bytes = 0u64;

    for (path, rel, content) in targets {
      let target = self.output_dir.join(rel);
      if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| FabError::io(parent, e))?;
      }
      fs::write(&target, content).map_err(|e| FabError::io(&target, e))?;

      total_bytes += content.len() as u64;
      files.push(ManifestFile {
        path,
        size: content.len(),
        sha256: hex::encode(Sha256::digest(content)),
      });
    }

    let manifest = Manifest {
      runtime: runtime_plugins,
      metadata: proto_fab.metadata(),
      files,
    };
    let manifest_path = self.output_dir.join(MANIFEST_FILENAME);
    let json = serde_json::to_string_pretty(&manifest).map_err(|e| FabError::io(&manifest_path, io::Error::other(e)))?;
    fs::write(&manifest_path, json).map_err(|e| FabError::io(&manifest_path, e))?;

    info!(
      path = %self.output_dir.display(),
      files = proto_fab.file_count(),
      bytes = total_bytes,
      "compiled fab"
    );

    Ok(CompileOutput {
      output_dir: self.output_dir.clone(),
      manifest_path,
      file_count: proto_fab.file_count(),
      total_bytes,
    })
  }
}
