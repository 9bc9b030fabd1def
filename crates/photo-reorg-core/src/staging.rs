//! Temporary holder names for files whose final name is not yet known.
//!
//! A staged file lives in the same directory as its original, so staging and
//! the later commit are plain renames on one volume. The [`StagingArea`] owns
//! the only record of where each staged file came from; committing an entry
//! removes it from that record, and rollback restores whatever is left.

use log::{debug, error, warn};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};

/// Separates the original name from the random part of a holder name
const STAGING_SEPARATOR: &str = "__";

/// Suffix of every holder name, making leftovers easy to find
pub const STAGING_SUFFIX: &str = ".staged";

/// Where a rolled back file ended up
#[derive(Debug)]
pub enum Restoration {
    /// Back at its original path
    Restored(PathBuf),

    /// The original path was taken; moved to a free sibling name instead
    Relocated(PathBuf),

    /// The rename back failed; the file is still at its holder path
    Stranded { path: PathBuf, error: std::io::Error },
}

impl Restoration {
    /// Where the file now lives
    pub fn path(&self) -> &Path {
        match self {
            Restoration::Restored(path) | Restoration::Relocated(path) => path,
            Restoration::Stranded { path, .. } => path,
        }
    }
}

#[derive(Debug)]
struct StagedFile {
    staged: PathBuf,
    original: PathBuf,
}

/// Files of one directory level currently under a holder name
#[derive(Debug, Default)]
pub struct StagingArea {
    staged: Vec<StagedFile>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `path` to a collision-free holder name in its own directory.
    ///
    /// The holder is created exclusively first and the source is renamed
    /// over it, so no existing file can be replaced.
    pub fn stage(&mut self, path: &Path) -> Result<PathBuf> {
        let staging_error = |source: std::io::Error| Error::Staging {
            path: path.to_path_buf(),
            source,
        };

        let (parent, file_name) = match (path.parent(), path.file_name()) {
            (Some(parent), Some(file_name)) => (parent, file_name),
            _ => {
                return Err(staging_error(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path has no parent directory or file name",
                )))
            }
        };

        let mut prefix = OsString::from(file_name);
        prefix.push(STAGING_SEPARATOR);

        let holder = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(parent)
            .map_err(staging_error)?
            .into_temp_path()
            .keep()
            .map_err(|e| staging_error(e.error))?;

        if let Err(e) = fs::rename(path, &holder) {
            if let Err(cleanup) = fs::remove_file(&holder) {
                log_file_error(&holder, "remove_holder", &cleanup);
            }
            return Err(staging_error(e));
        }

        debug!("stage: {} -> {}", path.display(), holder.display());
        self.staged.push(StagedFile {
            staged: holder.clone(),
            original: path.to_path_buf(),
        });

        Ok(holder)
    }

    /// Forget a staged file once it has been committed elsewhere.
    /// Returns its original path.
    pub fn release(&mut self, staged: &Path) -> Option<PathBuf> {
        self.take(staged).map(|file| file.original)
    }

    /// Return one staged file to its original path
    pub fn rollback(&mut self, staged: &Path) -> Option<Restoration> {
        self.take(staged).map(restore)
    }

    /// Return every still staged file, most recently staged first
    pub fn rollback_all(&mut self) -> Vec<Restoration> {
        let mut restorations = Vec::with_capacity(self.staged.len());
        while let Some(file) = self.staged.pop() {
            restorations.push(restore(file));
        }
        restorations
    }

    pub fn contains(&self, staged: &Path) -> bool {
        self.staged.iter().any(|file| file.staged == staged)
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    fn take(&mut self, staged: &Path) -> Option<StagedFile> {
        let index = self.staged.iter().position(|file| file.staged == staged)?;
        Some(self.staged.swap_remove(index))
    }
}

fn restore(file: StagedFile) -> Restoration {
    let StagedFile { staged, original } = file;

    let target = if original.symlink_metadata().is_err() {
        original
    } else {
        warn!(
            "Cannot restore {}: path is occupied, keeping file at a sibling name",
            original.display()
        );
        free_sibling(&original)
    };

    match fs::rename(&staged, &target) {
        Ok(()) => {
            log_fs_modification("restore", &staged, Some(&target));
            if target.file_name() == staged_origin_name(&staged).as_deref() {
                Restoration::Restored(target)
            } else {
                Restoration::Relocated(target)
            }
        }
        Err(e) => {
            error!(
                "Restore failed, file remains at {}: {}",
                staged.display(),
                e
            );
            Restoration::Stranded {
                path: staged,
                error: e,
            }
        }
    }
}

/// The original file name encoded in a holder name
fn staged_origin_name(staged: &Path) -> Option<OsString> {
    let name = staged.file_name()?.to_string_lossy().into_owned();
    let end = name.rfind(STAGING_SEPARATOR)?;
    Some(OsString::from(&name[..end]))
}

/// First `name (restored k).ext` next to `original` that does not exist
fn free_sibling(original: &Path) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|k| original.with_file_name(format!("{} (restored {}){}", stem, k, extension)))
        .find(|candidate| candidate.symlink_metadata().is_err())
        .unwrap_or_else(|| original.to_path_buf())
}
