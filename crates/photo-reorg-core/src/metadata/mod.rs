//! Capture timestamp extraction and write-back.
//!
//! The engine only ever talks to [`MetadataResolver`], which never fails:
//! a reader error is logged and the entry proceeds without a date.

pub mod embedded;

use log::warn;
use std::path::Path;

use crate::error::Result;
use crate::types::{CaptureTimestamp, TimestampSource};

pub use self::embedded::{ExifReader, ExifWriter, MetadataField};

/// Reads a capture timestamp from a file's embedded metadata
pub trait MetadataReader {
    fn read_timestamp(&self, path: &Path) -> Result<Option<CaptureTimestamp>>;
}

/// Writes a capture timestamp into a file's embedded metadata
pub trait MetadataWriter {
    fn write_timestamp(&self, path: &Path, timestamp: CaptureTimestamp) -> Result<()>;
}

/// Outcome of resolving one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    pub timestamp: Option<CaptureTimestamp>,
    pub source: Option<TimestampSource>,
}

/// Wraps a [`MetadataReader`] with an optional default timestamp
pub struct MetadataResolver {
    reader: Box<dyn MetadataReader>,
    fallback: Option<CaptureTimestamp>,
}

impl MetadataResolver {
    pub fn new(reader: Box<dyn MetadataReader>, fallback: Option<CaptureTimestamp>) -> Self {
        Self { reader, fallback }
    }

    pub fn resolve(&self, path: &Path) -> Resolution {
        let timestamp = match self.reader.read_timestamp(path) {
            Ok(timestamp) => timestamp,
            Err(e) => {
                warn!("Cannot read capture date of {}: {}", path.display(), e);
                None
            }
        };

        match (timestamp, self.fallback) {
            (Some(timestamp), _) => Resolution {
                timestamp: Some(timestamp),
                source: Some(TimestampSource::Metadata),
            },
            (None, Some(fallback)) => Resolution {
                timestamp: Some(fallback),
                source: Some(TimestampSource::Fallback),
            },
            (None, None) => {
                warn!("No capture date: {}", path.display());
                Resolution::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::timestamp;

    struct Broken;

    impl MetadataReader for Broken {
        fn read_timestamp(&self, _path: &Path) -> Result<Option<CaptureTimestamp>> {
            Err(Error::Metadata("corrupt".to_string()))
        }
    }

    struct Fixed(Option<CaptureTimestamp>);

    impl MetadataReader for Fixed {
        fn read_timestamp(&self, _path: &Path) -> Result<Option<CaptureTimestamp>> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_reader_errors_become_undated() {
        let resolver = MetadataResolver::new(Box::new(Broken), None);
        assert_eq!(resolver.resolve(Path::new("a.jpg")), Resolution::default());
    }

    #[test]
    fn test_fallback_applies_only_when_missing() {
        let fallback = timestamp("2000-01-01 00:00");
        let taken = timestamp("2021-05-01 10:15");

        let resolver = MetadataResolver::new(Box::new(Fixed(Some(taken))), Some(fallback));
        let resolution = resolver.resolve(Path::new("a.jpg"));
        assert_eq!(resolution.timestamp, Some(taken));
        assert_eq!(resolution.source, Some(TimestampSource::Metadata));

        let resolver = MetadataResolver::new(Box::new(Broken), Some(fallback));
        let resolution = resolver.resolve(Path::new("a.jpg"));
        assert_eq!(resolution.timestamp, Some(fallback));
        assert_eq!(resolution.source, Some(TimestampSource::Fallback));
    }
}
