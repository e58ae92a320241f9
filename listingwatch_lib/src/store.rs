//! Flat-file snapshot of the identifiers seen in the previous run.
//!
//! One identifier per line, UTF-8, no header. Each save replaces the whole
//! file; it is not an append log.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Persisted identifier set from the previous run.
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the previous run's identifiers. A missing or unreadable file is
    /// logged and treated as an empty set.
    pub fn load(&self) -> HashSet<String> {
        match self.try_load() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("{}; treating previous state as empty", e);
                HashSet::new()
            }
        }
    }

    /// Like [`load`](Self::load) but reports read failures. A missing file is
    /// still an empty set, not an error.
    pub fn try_load(&self) -> Result<HashSet<String>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No previous state at {}", self.path.display());
                return Ok(HashSet::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let ids: HashSet<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        tracing::debug!("Loaded {} identifiers from {}", ids.len(), self.path.display());
        Ok(ids)
    }

    /// Replaces the stored set with exactly `ids`.
    ///
    /// The snapshot is written to a sibling temporary file and renamed over
    /// the target. Lines are sorted so the file diffs cleanly between runs.
    pub fn save(&self, ids: &HashSet<String>) -> Result<(), StoreError> {
        let mut lines: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| {
                let ok = !id.is_empty() && !id.contains(['\n', '\r']);
                if !ok {
                    tracing::warn!("Not persisting malformed identifier {:?}", id);
                }
                ok
            })
            .collect();
        lines.sort_unstable();

        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let tmp = self.temp_path();
        fs::write(&tmp, contents).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;

        tracing::debug!("Saved {} identifiers to {}", lines.len(), self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "seen".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
