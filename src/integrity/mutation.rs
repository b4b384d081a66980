// src/integrity/mutation.rs
use crate::error::{MefError, Result};
use parking_lot::{const_mutex, Mutex};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::metadata::session_path;

static LOCKED_SEGMENTS: Mutex<BTreeSet<PathBuf>> = const_mutex(BTreeSet::new());

/// Process-wide exclusive claim on one segment directory
///
/// Released when dropped.
#[derive(Debug)]
pub struct SegmentLock {
    directory: PathBuf,
    key: PathBuf,
}

impl SegmentLock {
    /// Claim `directory`, failing with [`MefError::SegmentBusy`] if it is already claimed
    pub fn acquire(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let key = fs::canonicalize(&directory).unwrap_or_else(|_| directory.clone());

        if !LOCKED_SEGMENTS.lock().insert(key.clone()) {
            return Err(MefError::SegmentBusy(directory));
        }
        Ok(SegmentLock { directory, key })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Rename the segment directory with `suffix`, keeping its contents
    pub fn quarantine(&self, suffix: &str) -> Result<PathBuf> {
        let target = session_path::quarantine_path(&self.directory, suffix);
        if target.exists() {
            return Err(MefError::Config(format!(
                "cannot quarantine {}: {} already exists",
                self.directory.display(),
                target.display()
            )));
        }
        fs::rename(&self.directory, &target)?;
        Ok(target)
    }
}

impl Drop for SegmentLock {
    fn drop(&mut self) {
        LOCKED_SEGMENTS.lock().remove(&self.key);
    }
}

/// Backup-then-mutate access to one file of a locked segment
///
/// The first [`apply`](ScopedMutation::apply) copies the target to its backup
/// path (unless a backup already exists from an earlier run) before the
/// target is opened for writing. The backup therefore exists on every exit
/// path of the mutation, failed ones included.
#[derive(Debug)]
pub struct ScopedMutation<'l> {
    _lock: &'l SegmentLock,
    target: PathBuf,
    backup: PathBuf,
    created_backup: bool,
    reported_backup: bool,
}

impl<'l> ScopedMutation<'l> {
    pub fn new(
        lock: &'l SegmentLock,
        target: impl Into<PathBuf>,
        backup_suffix: &str,
    ) -> Result<Self> {
        let target = target.into();
        if !target.starts_with(lock.directory()) {
            return Err(MefError::Config(format!(
                "{} is outside locked segment {}",
                target.display(),
                lock.directory().display()
            )));
        }
        let backup = session_path::backup_path(&target, backup_suffix);
        Ok(ScopedMutation {
            _lock: lock,
            target,
            backup,
            created_backup: false,
            reported_backup: false,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Run `f` against the target opened read/write
    pub fn apply<T>(&mut self, f: impl FnOnce(&mut File) -> Result<T>) -> Result<T> {
        self.ensure_backup()?;
        let mut file = OpenOptions::new().read(true).write(true).open(&self.target)?;
        let value = f(&mut file)?;
        file.sync_data()?;
        Ok(value)
    }

    fn ensure_backup(&mut self) -> Result<()> {
        if !self.backup.exists() {
            fs::copy(&self.target, &self.backup)?;
            self.created_backup = true;
            tracing::debug!(target_file = ?self.target, backup = ?self.backup, "Created backup");
        }
        Ok(())
    }

    /// The backup path, the first time it is asked for after this mutation created it
    pub fn take_created_backup(&mut self) -> Option<PathBuf> {
        if self.created_backup && !self.reported_backup {
            self.reported_backup = true;
            Some(self.backup.clone())
        } else {
            None
        }
    }
}
