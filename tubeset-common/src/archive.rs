//! Archive manager
//!
//! The active store lives at its canonical path. Deleting it moves the whole
//! tree into a holding area (`recyclebin/<store name>`); restoring moves it
//! back. The holding area has a single slot.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::package;
use crate::store::Store;
use crate::{Error, Result};

/// Where the store currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchiveStatus {
    /// A store sits at the canonical location
    pub active: bool,
    /// A store sits in the holding area
    pub archived: bool,
}

/// Moves one store between its canonical location and a holding area
#[derive(Debug, Clone)]
pub struct ArchiveManager {
    active_path: PathBuf,
    archived_path: PathBuf,
}

impl ArchiveManager {
    /// `active_path` is the store root; `holding_root` the holding area.
    pub fn new(active_path: impl Into<PathBuf>, holding_root: impl AsRef<Path>) -> Self {
        let active_path = active_path.into();
        let store_name = active_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "database".into());
        let archived_path = holding_root.as_ref().join(store_name);

        Self {
            active_path,
            archived_path,
        }
    }

    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    pub fn archived_path(&self) -> &Path {
        &self.archived_path
    }

    /// Handle to the active store location
    pub fn store(&self) -> Store {
        Store::open(&self.active_path)
    }

    pub fn status(&self) -> ArchiveStatus {
        ArchiveStatus {
            active: self.active_path.is_dir(),
            archived: self.archived_path.is_dir(),
        }
    }

    /// Move the active store into the holding area
    ///
    /// A previously archived copy is discarded first.
    pub fn archive(&self) -> Result<()> {
        if !self.active_path.is_dir() {
            return Err(Error::NotFound(format!(
                "no active store at {}",
                self.active_path.display()
            )));
        }

        self.purge()?;
        if let Some(parent) = self.archived_path.parent() {
            fs::create_dir_all(parent)?;
        }
        move_dir(&self.active_path, &self.archived_path)?;

        tracing::info!(
            from = %self.active_path.display(),
            to = %self.archived_path.display(),
            "Store moved to holding area"
        );

        Ok(())
    }

    /// Move the archived store back to its canonical location
    pub fn restore(&self) -> Result<()> {
        if !self.archived_path.is_dir() {
            return Err(Error::NotFound(format!(
                "no archived store at {}",
                self.archived_path.display()
            )));
        }
        if self.active_path.exists() {
            return Err(Error::AlreadyExists(format!(
                "a store is already active at {}",
                self.active_path.display()
            )));
        }

        if let Some(parent) = self.active_path.parent() {
            fs::create_dir_all(parent)?;
        }
        move_dir(&self.archived_path, &self.active_path)?;

        tracing::info!(
            from = %self.archived_path.display(),
            to = %self.active_path.display(),
            "Store restored from holding area"
        );

        Ok(())
    }

    /// Discard whatever sits in the holding area
    pub fn purge(&self) -> Result<()> {
        if self.archived_path.exists() {
            fs::remove_dir_all(&self.archived_path)?;
            tracing::info!(path = %self.archived_path.display(), "Archived store purged");
        }
        Ok(())
    }

    /// Zip of the active store, shaped like a merge package
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        if !self.active_path.is_dir() {
            return Err(Error::NotFound(format!(
                "no active store at {}",
                self.active_path.display()
            )));
        }
        package::zip_dir(&self.active_path)
    }
}

/// Relocate a directory tree, falling back to copy + delete across filesystems
fn move_dir(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(
                from = %from.display(),
                to = %to.display(),
                "rename crossed filesystems, copying instead"
            );
            copy_dir_all(from, to)?;
            fs::remove_dir_all(from)?;
            Ok(())
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// EXDEV on unix, ERROR_NOT_SAME_DEVICE on windows
#[cfg(windows)]
const CROSS_DEVICE_CODE: i32 = 17;
#[cfg(not(windows))]
const CROSS_DEVICE_CODE: i32 = 18;

fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(CROSS_DEVICE_CODE)
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
