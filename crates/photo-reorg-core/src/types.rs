use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Date and time a photo was taken, in the camera's local time
pub type CaptureTimestamp = NaiveDateTime;

/// Where an entry's capture timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimestampSource {
    /// Read from the file's embedded metadata
    Metadata,

    /// Caller supplied default, used because metadata had none
    Fallback,
}

/// Lifecycle of an entry within one directory batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryState {
    /// Discovered, not yet touched on disk
    Fresh,

    /// Sitting under its temporary holder name
    Staged,

    /// Written to its destination; final
    Committed,

    /// Returned to its original location
    RolledBack,
}

/// One file under reorganization
#[derive(Debug, Clone)]
pub struct Entry {
    original_path: PathBuf,
    staged_path: Option<PathBuf>,
    extension: Option<String>,
    capture_timestamp: Option<CaptureTimestamp>,
    timestamp_source: Option<TimestampSource>,
    final_path: Option<PathBuf>,
    state: EntryState,
}

impl Entry {
    pub fn new(
        original_path: PathBuf,
        capture_timestamp: Option<CaptureTimestamp>,
        timestamp_source: Option<TimestampSource>,
    ) -> Self {
        let extension = original_path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());

        Self {
            original_path,
            staged_path: None,
            extension,
            capture_timestamp,
            timestamp_source: capture_timestamp.and(timestamp_source),
            final_path: None,
            state: EntryState::Fresh,
        }
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    /// File name at the time the batch began
    pub fn file_name(&self) -> &OsStr {
        self.original_path.file_name().unwrap_or_default()
    }

    /// Original file name without its extension
    pub fn base_name(&self) -> &OsStr {
        self.original_path.file_stem().unwrap_or_default()
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn capture_timestamp(&self) -> Option<CaptureTimestamp> {
        self.capture_timestamp
    }

    pub fn timestamp_source(&self) -> Option<TimestampSource> {
        self.timestamp_source
    }

    /// True when the timestamp is the caller's default rather than metadata
    pub fn uses_fallback(&self) -> bool {
        self.timestamp_source == Some(TimestampSource::Fallback)
    }

    pub fn staged_path(&self) -> Option<&Path> {
        self.staged_path.as_deref()
    }

    pub fn final_path(&self) -> Option<&Path> {
        self.final_path.as_deref()
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Where the source bytes currently live
    pub fn current_path(&self) -> &Path {
        self.staged_path.as_deref().unwrap_or(&self.original_path)
    }

    pub(crate) fn mark_staged(&mut self, staged_path: PathBuf) {
        debug_assert_eq!(self.state, EntryState::Fresh);
        self.staged_path = Some(staged_path);
        self.state = EntryState::Staged;
    }

    pub(crate) fn assign_final(&mut self, final_path: PathBuf) {
        self.final_path = Some(final_path);
    }

    pub(crate) fn mark_committed(&mut self) {
        debug_assert!(matches!(self.state, EntryState::Fresh | EntryState::Staged));
        self.staged_path = None;
        self.state = EntryState::Committed;
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        debug_assert_eq!(self.state, EntryState::Staged);
        self.staged_path = None;
        self.state = EntryState::RolledBack;
    }
}

/// The files found directly inside one directory
#[derive(Debug, Default)]
pub struct Batch {
    pub directory: PathBuf,
    pub entries: Vec<Entry>,
}

impl Batch {
    pub fn new(directory: PathBuf, entries: Vec<Entry>) -> Self {
        Self { directory, entries }
    }

    /// Entries still under a temporary name
    pub fn staged(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(|entry| entry.state() == EntryState::Staged)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counters accumulated over a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Directory levels completed
    pub directories: usize,

    /// Entries moved or copied to their destination
    pub committed: usize,

    /// Entries whose destination already was their original location
    pub unchanged: usize,

    /// Entries left alone because the destination existed
    pub skipped: usize,

    /// Entries rewritten by the content pipeline
    pub rewritten: usize,

    /// Entries copied unmodified after the content pipeline failed
    pub degraded: usize,

    /// Outputs whose missing capture date was written back
    pub patched: usize,

    /// Extraneous destination entries removed
    pub pruned: usize,
}
