use log::{debug, info, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::{ReorganizationEngine, RunContext};
use crate::config::{ExistingPolicy, Transfer};
use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};
use crate::processing::ImageTransform;
use crate::staging::StagingArea;
use crate::types::{Entry, RunReport};

/// What happened to the bytes of a committed entry
enum Written {
    Transferred,
    Rewritten,
    PassedThrough,
    Degraded,
}

impl ReorganizationEngine {
    /// Put one allocated entry at its final path.
    ///
    /// Only a failed move or write into the destination is an error; a
    /// failed transform degrades to a plain copy.
    pub(super) fn commit_entry(
        &self,
        context: &RunContext,
        entry: &mut Entry,
        final_path: PathBuf,
        staging: &mut StagingArea,
        protected: &mut Vec<PathBuf>,
        report: &mut RunReport,
    ) -> Result<()> {
        let source = entry.current_path().to_path_buf();
        let staged = entry.staged_path().map(Path::to_path_buf);

        // Copying a file onto itself
        if staged.is_none() && final_path == entry.original_path() {
            debug!("Unchanged: {}", final_path.display());
            entry.mark_committed();
            report.unchanged += 1;
            if entry.uses_fallback() {
                self.patch_timestamp(entry, &final_path, report);
            }
            protected.push(final_path);
            return Ok(());
        }

        if self.config.on_existing != ExistingPolicy::Overwrite && final_path.symlink_metadata().is_ok() {
            log_fs_modification("skip (destination exists)", entry.original_path(), Some(&final_path));
            match staged {
                Some(staged) => {
                    if let Some(restoration) = staging.rollback(&staged) {
                        protected.push(restoration.path().to_path_buf());
                    }
                    entry.mark_rolled_back();
                }
                None => protected.push(source),
            }
            report.skipped += 1;
            return Ok(());
        }

        let written = match &self.transform {
            Some(transform) => self.write_transformed(&**transform, entry, &source, &final_path)?,
            None => transfer(context.transfer, &source, &final_path)?,
        };

        if let Some(staged) = &staged {
            if !matches!(written, Written::Transferred) {
                // The rewritten copy replaces the staged source
                if let Err(e) = fs::remove_file(staged) {
                    log_file_error(staged, "remove_staged", &e);
                    protected.push(staged.clone());
                }
            }
            staging.release(staged);
        }
        entry.mark_committed();

        match written {
            Written::Rewritten => report.rewritten += 1,
            Written::Degraded => report.degraded += 1,
            Written::Transferred | Written::PassedThrough => {}
        }
        if final_path == entry.original_path() {
            report.unchanged += 1;
        } else {
            report.committed += 1;
        }

        if entry.uses_fallback() {
            self.patch_timestamp(entry, &final_path, report);
        }

        Ok(())
    }

    fn write_transformed(
        &self,
        transform: &dyn ImageTransform,
        entry: &Entry,
        source: &Path,
        final_path: &Path,
    ) -> Result<Written> {
        let commit_error = |e: std::io::Error| Error::Commit {
            from: source.to_path_buf(),
            to: final_path.to_path_buf(),
            source: e,
        };

        let bytes = fs::read(source).map_err(commit_error)?;
        let label = final_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (output, written) = match transform.transform(&bytes, entry.capture_timestamp(), &label) {
            Ok(output) => (output, Written::Rewritten),
            Err(Error::UnsupportedFormat(reason)) => {
                debug!("Copying {} unchanged: {}", source.display(), reason);
                (bytes, Written::PassedThrough)
            }
            Err(e) => {
                warn!(
                    "Could not rewrite {}, copying it unchanged: {}",
                    entry.original_path().display(),
                    e
                );
                (bytes, Written::Degraded)
            }
        };

        let permissions = fs::metadata(source).map(|m| m.permissions()).ok();
        write_atomically(final_path, &output, permissions).map_err(commit_error)?;
        log_fs_modification("write", entry.original_path(), Some(final_path));
        Ok(written)
    }

    /// Best effort: write the fallback timestamp into the committed file
    fn patch_timestamp(&self, entry: &Entry, final_path: &Path, report: &mut RunReport) {
        let Some(timestamp) = entry.capture_timestamp() else {
            return;
        };

        match self.writer.write_timestamp(final_path, timestamp) {
            Ok(()) => {
                info!("Wrote capture date {} into {}", timestamp, final_path.display());
                report.patched += 1;
            }
            Err(e) => warn!(
                "Could not write capture date into {}: {}",
                final_path.display(),
                e
            ),
        }
    }
}

fn transfer(mode: Transfer, source: &Path, final_path: &Path) -> Result<Written> {
    let result = match mode {
        Transfer::Move => fs::rename(source, final_path),
        Transfer::Copy => fs::copy(source, final_path).map(|_| ()),
    };

    result.map_err(|e| Error::Commit {
        from: source.to_path_buf(),
        to: final_path.to_path_buf(),
        source: e,
    })?;

    let operation = match mode {
        Transfer::Move => "move",
        Transfer::Copy => "copy",
    };
    log_fs_modification(operation, source, Some(final_path));
    Ok(Written::Transferred)
}

/// Write through a temporary sibling so a failed write leaves nothing behind
fn write_atomically(
    path: &Path,
    bytes: &[u8],
    permissions: Option<fs::Permissions>,
) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    if let Some(permissions) = permissions {
        fs::set_permissions(file.path(), permissions)?;
    }
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
