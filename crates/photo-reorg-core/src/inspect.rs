//! Read-only listing of what the engine would see.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::discovery::walk_files;
use crate::error::Result;
use crate::metadata::{ExifReader, MetadataField, MetadataResolver};
use crate::types::{CaptureTimestamp, TimestampSource};

/// Resolved metadata of one file
#[derive(Debug, Clone)]
pub struct FileDescription {
    pub path: PathBuf,
    pub timestamp: Option<CaptureTimestamp>,
    pub source: Option<TimestampSource>,
    pub fields: Vec<MetadataField>,

    /// Why the metadata fields could not be read, if they could not
    pub error: Option<String>,
}

impl fmt::Display for FileDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.timestamp, self.source) {
            (Some(timestamp), Some(TimestampSource::Fallback)) => {
                write!(f, "{}: {} (default)", self.path.display(), timestamp)
            }
            (Some(timestamp), _) => write!(f, "{}: {}", self.path.display(), timestamp),
            (None, _) => write!(f, "{}: no capture date", self.path.display()),
        }
    }
}

/// Describe every non-hidden file below `source` without modifying anything
pub fn describe_tree(source: &Path, config: &Config) -> Result<Vec<FileDescription>> {
    let resolver = MetadataResolver::new(Box::new(ExifReader), config.fix_date);

    let descriptions = walk_files(source, &config.hidden_prefix)?
        .into_iter()
        .map(|path| {
            let resolution = resolver.resolve(&path);
            let (fields, error) = match ExifReader.fields(&path) {
                Ok(fields) => (fields, None),
                Err(e) => (Vec::new(), Some(e.to_string())),
            };

            FileDescription {
                path,
                timestamp: resolution.timestamp,
                source: resolution.source,
                fields,
                error,
            }
        })
        .collect();

    Ok(descriptions)
}
