use log::{debug, warn};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Immediate children of one directory, hidden entries removed
#[derive(Debug, Default)]
pub struct Listing {
    pub files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
}

/// Returns true if the name starts with the hidden marker
pub fn is_hidden(name: &OsStr, hidden_prefix: &str) -> bool {
    name.to_string_lossy().starts_with(hidden_prefix)
}

/// List the plain files and subdirectories directly inside `directory`.
///
/// Hidden entries are skipped entirely. Symlinks to files count as files and
/// are moved as links; symlinks to directories are not followed.
pub fn list_directory(directory: &Path, hidden_prefix: &str) -> Result<Listing> {
    if !directory.is_dir() {
        return Err(Error::FileNotFound(directory.to_path_buf()));
    }

    let mut listing = Listing::default();

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name(), hidden_prefix))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Log error but continue with other entries
                warn!("Error reading entry in {}: {}", directory.display(), e);
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            listing.directories.push(entry.into_path());
        } else if file_type.is_file() {
            listing.files.push(entry.into_path());
        } else if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => listing.files.push(entry.into_path()),
                _ => debug!("Not following link: {}", entry.path().display()),
            }
        }
    }

    Ok(listing)
}

/// Walk every non-hidden file below `directory`, depth first
pub fn walk_files(directory: &Path, hidden_prefix: &str) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(Error::FileNotFound(directory.to_path_buf()));
    }

    let files = WalkDir::new(directory)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name(), hidden_prefix))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    Ok(files)
}

// -- Tests --

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_file;
    use tempfile::tempdir;

    fn setup_test_directory() -> tempfile::TempDir {
        let dir = tempdir().unwrap();

        create_file(dir.path(), "image1.jpg", b"one");
        create_file(dir.path(), "image2.png", b"two");
        create_file(dir.path(), ".DS_Store", b"hidden");
        create_file(&dir.path().join("subdir"), "nested.jpg", b"nested");
        create_file(&dir.path().join(".git"), "config", b"hidden dir");

        dir
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(OsStr::new(".DS_Store"), "."));
        assert!(!is_hidden(OsStr::new("photo.jpg"), "."));
        assert!(is_hidden(OsStr::new("_tmp"), "_"));
    }

    #[test]
    fn test_list_directory_one_level() {
        let dir = setup_test_directory();

        let listing = list_directory(dir.path(), ".").unwrap();

        let mut files: Vec<_> = listing
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["image1.jpg", "image2.png"]);

        assert_eq!(listing.directories, vec![dir.path().join("subdir")]);
    }

    #[test]
    fn test_list_directory_nonexistent() {
        let result = list_directory(Path::new("/path/that/does/not/exist"), ".");
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_walk_files_skips_hidden_trees() {
        let dir = setup_test_directory();

        let files = walk_files(dir.path(), ".").unwrap();

        assert_eq!(files.len(), 3);
        assert!(files.contains(&dir.path().join("subdir").join("nested.jpg")));
        assert!(!files.iter().any(|p| p.to_string_lossy().contains(".git")));
    }
}
