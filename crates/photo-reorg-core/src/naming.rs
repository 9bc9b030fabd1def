//! Destination names.
//!
//! Names are computed in commit order and registered in a
//! [`DestinationNamespace`] as they are handed out, so two entries of a run
//! never receive the same name even before either has reached the disk.

use log::debug;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::config::{format_timestamp, Config, ExistingPolicy, NamingMode, SuffixPlacement};
use crate::error::{Error, Result};
use crate::types::Entry;

/// Names already handed out for one destination directory during this run
#[derive(Debug, Clone)]
pub struct DestinationNamespace {
    directory: PathBuf,
    names: HashSet<OsString>,

    /// Names held by sources that stay in place until they are read
    occupied: HashSet<OsString>,
}

impl DestinationNamespace {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            names: HashSet::new(),
            occupied: HashSet::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Register a name; returns false if it was already taken
    pub fn reserve(&mut self, name: impl Into<OsString>) -> bool {
        self.names.insert(name.into())
    }

    pub fn contains(&self, name: &OsStr) -> bool {
        self.names.contains(name)
    }

    /// Mark a name as belonging to an unstaged source of this batch.
    /// Only the entry whose source it is may be allocated that name.
    pub fn occupy(&mut self, name: impl Into<OsString>) {
        self.occupied.insert(name.into());
    }

    pub fn is_occupied(&self, name: &OsStr) -> bool {
        self.occupied.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &OsStr> {
        self.names.iter().map(OsString::as_os_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A candidate name split where a collision suffix may go
struct Candidate {
    stem: OsString,
    extension: Option<String>,
}

impl Candidate {
    fn render(&self, suffix: Option<u32>, placement: SuffixPlacement) -> OsString {
        let suffix = suffix.map(|k| format!(" ({})", k)).unwrap_or_default();
        let mut name = self.stem.clone();

        match placement {
            SuffixPlacement::BeforeExtension => {
                name.push(&suffix);
                if let Some(extension) = &self.extension {
                    name.push(".");
                    name.push(extension);
                }
            }
            SuffixPlacement::AfterExtension => {
                if let Some(extension) = &self.extension {
                    name.push(".");
                    name.push(extension);
                }
                name.push(&suffix);
            }
        }

        name
    }
}

/// Computes final names from the naming mode and an entry's position
#[derive(Debug, Clone)]
pub struct NameAllocator {
    naming: NamingMode,
    sequence_width: usize,
    sequence_with_date: bool,
    date_format: String,
    suffix_placement: SuffixPlacement,
    check_disk: bool,
}

impl NameAllocator {
    pub fn from_config(config: &Config) -> Self {
        Self {
            naming: config.naming,
            sequence_width: config.sequence_width,
            sequence_with_date: config.sequence_with_date,
            date_format: config.date_format.clone(),
            suffix_placement: config.suffix_placement,
            check_disk: config.on_existing == ExistingPolicy::KeepBoth,
        }
    }

    /// Choose and reserve the final path for the entry at 1-based `position`
    pub fn allocate(
        &self,
        position: usize,
        entry: &Entry,
        namespace: &mut DestinationNamespace,
    ) -> Result<PathBuf> {
        let candidate = self.candidate(position, entry)?;

        let plain = candidate.render(None, self.suffix_placement);
        if !self.is_taken(&plain, entry, namespace) {
            return Ok(self.claim(plain, namespace));
        }

        for k in 1..=u32::MAX {
            let name = candidate.render(Some(k), self.suffix_placement);
            if !self.is_taken(&name, entry, namespace) {
                debug!(
                    "Name {} taken, using {}",
                    plain.to_string_lossy(),
                    name.to_string_lossy()
                );
                return Ok(self.claim(name, namespace));
            }
        }

        Err(Error::AllocationExhausted {
            directory: namespace.directory().to_path_buf(),
            candidate: plain.to_string_lossy().into_owned(),
        })
    }

    fn candidate(&self, position: usize, entry: &Entry) -> Result<Candidate> {
        let lowered = entry.extension().map(str::to_lowercase);

        let candidate = match self.naming {
            NamingMode::Keep => Candidate {
                stem: entry.base_name().to_os_string(),
                extension: entry.extension().map(str::to_string),
            },
            NamingMode::Date => {
                let stem = match entry.capture_timestamp() {
                    Some(timestamp) => OsString::from(format_timestamp(&timestamp, &self.date_format)?),
                    None => entry.base_name().to_os_string(),
                };
                Candidate {
                    stem,
                    extension: lowered,
                }
            }
            NamingMode::Sequence => {
                let mut stem = format!("{:0width$}", position, width = self.sequence_width);
                if let (true, Some(timestamp)) = (self.sequence_with_date, entry.capture_timestamp()) {
                    stem.push('_');
                    stem.push_str(&format_timestamp(&timestamp, &self.date_format)?);
                }
                Candidate {
                    stem: OsString::from(stem),
                    extension: lowered,
                }
            }
        };

        Ok(candidate)
    }

    fn is_taken(&self, name: &OsStr, entry: &Entry, namespace: &DestinationNamespace) -> bool {
        if namespace.contains(name) {
            return true;
        }

        // The entry's own source is not a collision with itself
        let path = namespace.directory().join(name);
        if path == entry.original_path() {
            return false;
        }
        if namespace.is_occupied(name) {
            return true;
        }

        self.check_disk && path.symlink_metadata().is_ok()
    }

    fn claim(&self, name: OsString, namespace: &mut DestinationNamespace) -> PathBuf {
        let path = namespace.directory().join(&name);
        namespace.reserve(name);
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_file, timestamp};
    use crate::types::TimestampSource;
    use tempfile::tempdir;

    fn entry(path: &str, date: Option<&str>) -> Entry {
        Entry::new(
            PathBuf::from(path),
            date.map(timestamp),
            Some(TimestampSource::Metadata),
        )
    }

    fn allocator(naming: NamingMode) -> NameAllocator {
        NameAllocator::from_config(&Config {
            naming,
            ..Default::default()
        })
    }

    fn name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    #[test]
    fn test_sequence_names() {
        let allocator = allocator(NamingMode::Sequence);
        let mut namespace = DestinationNamespace::new("/out");

        let dated = entry("/in/IMG_1.JPG", Some("2021-05-01 10:15"));
        let undated = entry("/in/scan.PNG", None);

        let first = allocator.allocate(7, &dated, &mut namespace).unwrap();
        let second = allocator.allocate(8, &undated, &mut namespace).unwrap();

        assert_eq!(first, PathBuf::from("/out/0007_2021-05-01 10:15.jpg"));
        assert_eq!(name(&second), "0008.png");
        assert_eq!(namespace.len(), 2);
    }

    #[test]
    fn test_sequence_without_date() {
        let allocator = NameAllocator::from_config(&Config {
            naming: NamingMode::Sequence,
            sequence_width: 3,
            sequence_with_date: false,
            ..Default::default()
        });
        let mut namespace = DestinationNamespace::new("/out");

        let path = allocator
            .allocate(12, &entry("/in/a.jpg", Some("2021-05-01 10:15")), &mut namespace)
            .unwrap();
        assert_eq!(name(&path), "012.jpg");
    }

    #[test]
    fn test_date_names_fall_back_to_base_name() {
        let allocator = allocator(NamingMode::Date);
        let mut namespace = DestinationNamespace::new("/out");

        let path = allocator
            .allocate(1, &entry("/in/Holiday.JPEG", None), &mut namespace)
            .unwrap();
        assert_eq!(name(&path), "Holiday.jpeg");
    }

    #[test]
    fn test_keep_preserves_original_name() {
        let allocator = allocator(NamingMode::Keep);
        let mut namespace = DestinationNamespace::new("/out");

        let path = allocator
            .allocate(1, &entry("/in/IMG_0001.JPG", Some("2021-05-01 10:15")), &mut namespace)
            .unwrap();
        assert_eq!(name(&path), "IMG_0001.JPG");
    }

    #[test]
    fn test_same_date_gets_counter_suffix() {
        let allocator = allocator(NamingMode::Date);
        let mut namespace = DestinationNamespace::new("/out");

        let names: Vec<String> = ["/in/a.jpg", "/in/b.jpg", "/in/c.jpg"]
            .iter()
            .map(|path| {
                let entry = entry(path, Some("2021-05-01 10:00"));
                name(&allocator.allocate(1, &entry, &mut namespace).unwrap())
            })
            .collect();

        assert_eq!(
            names,
            vec![
                "2021-05-01 10:00.jpg",
                "2021-05-01 10:00 (1).jpg",
                "2021-05-01 10:00 (2).jpg"
            ]
        );
    }

    #[test]
    fn test_suffix_after_extension() {
        let allocator = NameAllocator::from_config(&Config {
            naming: NamingMode::Date,
            suffix_placement: SuffixPlacement::AfterExtension,
            ..Default::default()
        });
        let mut namespace = DestinationNamespace::new("/out");

        let a = entry("/in/a.jpg", Some("2021-05-01 10:00"));
        let b = entry("/in/b.jpg", Some("2021-05-01 10:00"));
        allocator.allocate(1, &a, &mut namespace).unwrap();
        let second = allocator.allocate(2, &b, &mut namespace).unwrap();

        assert_eq!(name(&second), "2021-05-01 10:00.jpg (1)");
    }

    #[test]
    fn test_reserved_names_are_avoided() {
        let allocator = allocator(NamingMode::Keep);
        let mut namespace = DestinationNamespace::new("/out");
        assert!(namespace.reserve("photos"));
        assert!(!namespace.reserve("photos"));

        let path = allocator
            .allocate(1, &entry("/in/photos", None), &mut namespace)
            .unwrap();
        assert_eq!(name(&path), "photos (1)");
    }

    #[test]
    fn test_keep_both_avoids_files_on_disk() {
        let dir = tempdir().unwrap();
        create_file(dir.path(), "2021-05-01 10:00.jpg", b"existing");

        let config = Config {
            naming: NamingMode::Date,
            on_existing: ExistingPolicy::KeepBoth,
            ..Default::default()
        };
        let mut namespace = DestinationNamespace::new(dir.path());
        let entry = entry("/in/a.jpg", Some("2021-05-01 10:00"));

        let path = NameAllocator::from_config(&config)
            .allocate(1, &entry, &mut namespace)
            .unwrap();
        assert_eq!(name(&path), "2021-05-01 10:00 (1).jpg");

        // Without keep-both the existing file is left for the commit step
        let mut namespace = DestinationNamespace::new(dir.path());
        let path = allocator(NamingMode::Date)
            .allocate(1, &entry, &mut namespace)
            .unwrap();
        assert_eq!(name(&path), "2021-05-01 10:00.jpg");
    }

    #[test]
    fn test_occupied_names_belong_to_their_source() {
        let allocator = allocator(NamingMode::Sequence);
        let mut namespace = DestinationNamespace::new("/in");
        namespace.occupy("0001.jpg");
        namespace.occupy("z.jpg");

        let other = allocator
            .allocate(1, &entry("/in/z.jpg", None), &mut namespace)
            .unwrap();
        assert_eq!(name(&other), "0001 (1).jpg");

        let own = allocator
            .allocate(1, &entry("/in/0001.jpg", None), &mut DestinationNamespace::new("/in"))
            .unwrap();
        assert_eq!(name(&own), "0001.jpg");

        let mut namespace = DestinationNamespace::new("/in");
        namespace.occupy("0001.jpg");
        let own = allocator
            .allocate(1, &entry("/in/0001.jpg", None), &mut namespace)
            .unwrap();
        assert_eq!(name(&own), "0001.jpg");
    }

    #[test]
    fn test_allocation_is_repeatable() {
        let allocator = allocator(NamingMode::Sequence);
        let entries = vec![
            entry("/in/a.jpg", Some("2021-05-01 10:00")),
            entry("/in/b.jpg", Some("2021-05-01 10:00")),
            entry("/in/c.jpg", None),
        ];

        let run = || {
            let mut namespace = DestinationNamespace::new("/out");
            entries
                .iter()
                .enumerate()
                .map(|(i, e)| allocator.allocate(i + 1, e, &mut namespace).unwrap())
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }
}
