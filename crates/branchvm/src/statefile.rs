//! Persistence of run state, one record per repository

use crate::error::{Error, Result};
use crate::runstate::RunState;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Stores run state records as JSON files in a state directory
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the record of the repository at `root`
    pub fn record_path(&self, root: &Path) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(root)))
    }

    fn lock_path(&self, root: &Path) -> PathBuf {
        self.dir.join(format!("{}.json.lock", file_stem(root)))
    }

    /// Load the record for `root`, `None` if there is none
    pub fn load(&self, root: &Path) -> Result<Option<RunState>> {
        let path = self.record_path(root);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No run state at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::persistence(&path, e)),
        };
        let state = serde_json::from_str(&content)
            .map_err(|e| Error::persistence(&path, format!("corrupt run state: {e}")))?;
        log::debug!("Loaded run state from {}", path.display());
        Ok(Some(state))
    }

    /// Write the record for `root`, replacing any previous one
    pub fn save(&self, root: &Path, state: &RunState) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::persistence(&self.dir, e))?;
        let path = self.record_path(root);
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| Error::persistence(&path, format!("cannot serialize run state: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| Error::persistence(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Error::persistence(&path, e))?;

        log::debug!("Saved run state to {}", path.display());
        Ok(())
    }

    /// Remove the record for `root`; a missing record is fine
    pub fn delete(&self, root: &Path) -> Result<()> {
        let path = self.record_path(root);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Deleted run state {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(&path, e)),
        }
    }

    /// Take the advisory lock for `root`
    ///
    /// Held from resolving unfinished state until the workflow's program
    /// has run. Fails with [`Error::Locked`] while another process holds it.
    pub fn lock(&self, root: &Path) -> Result<RunLock> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::persistence(&self.dir, e))?;
        let path = self.lock_path(root);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Locked { path });
            }
            Err(e) => return Err(Error::persistence(&path, e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(|e| Error::persistence(&path, e))?;
        log::debug!("Acquired lock {}", path.display());
        Ok(RunLock { path })
    }
}

/// Held advisory lock, released on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to release lock {}: {e}", self.path.display());
        }
    }
}

/// File name for a repository root: path characters other than
/// alphanumerics, `.` and `_` become `-`
fn file_stem(root: &Path) -> String {
    let stem: String = root
        .to_string_lossy()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "root".to_string()
    } else {
        stem.to_string()
    }
}
