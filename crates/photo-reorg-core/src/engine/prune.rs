use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::discovery::is_hidden;
use crate::logging::{log_file_error, log_fs_modification};

/// Delete every non-hidden entry of `directory` whose name is not in `keep`.
///
/// Failures are logged and skipped. Returns the number of entries removed.
pub(super) fn prune_directory(directory: &Path, keep: &HashSet<OsString>, hidden_prefix: &str) -> usize {
    let entries: Vec<_> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .collect();

    let mut pruned = 0;
    for entry in entries {
        let name = entry.file_name();
        if is_hidden(name, hidden_prefix) || keep.contains(name) {
            continue;
        }

        let path = entry.path();
        let result = if entry.file_type().is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };

        match result {
            Ok(()) => {
                log_fs_modification("prune", path, None);
                pruned += 1;
            }
            Err(e) => log_file_error(path, "prune", &e),
        }
    }

    pruned
}
