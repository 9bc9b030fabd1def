use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use super::{MetadataReader, MetadataWriter};
use crate::error::{Error, Result};
use crate::types::CaptureTimestamp;

/// Layout of EXIF date fields, e.g. `2021:05:01 10:15:00`
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// One decoded metadata field, for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub ifd: String,
    pub tag: String,
    pub value: String,
}

/// Reads `DateTimeOriginal` from the primary EXIF directory
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifReader;

impl ExifReader {
    fn read(path: &Path) -> Result<Option<exif::Exif>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Ok(Some(exif)),
            Err(exif::Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every field in the file's EXIF block, in file order
    pub fn fields(&self, path: &Path) -> Result<Vec<MetadataField>> {
        let Some(exif) = Self::read(path)? else {
            return Ok(Vec::new());
        };

        Ok(exif
            .fields()
            .map(|field| MetadataField {
                ifd: field.ifd_num.to_string(),
                tag: field.tag.to_string(),
                value: field.display_value().with_unit(&exif).to_string(),
            })
            .collect())
    }
}

impl MetadataReader for ExifReader {
    fn read_timestamp(&self, path: &Path) -> Result<Option<CaptureTimestamp>> {
        let Some(exif) = Self::read(path)? else {
            return Ok(None);
        };

        let Some(field) = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY) else {
            return Ok(None);
        };

        match &field.value {
            Value::Ascii(values) => match values.first() {
                Some(raw) => parse_exif_date(raw).map(Some),
                None => Ok(None),
            },
            other => Err(Error::Metadata(format!(
                "Unexpected DateTimeOriginal value: {:?}",
                other
            ))),
        }
    }
}

/// Parse an EXIF ASCII date, tolerating trailing NULs and padding
pub fn parse_exif_date(raw: &[u8]) -> Result<CaptureTimestamp> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(text, EXIF_DATE_FORMAT)
        .map_err(|e| Error::Metadata(format!("Invalid EXIF date '{}': {}", text, e)))
}

/// Writes `DateTimeOriginal` in place, keeping the other tags
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifWriter;

impl MetadataWriter for ExifWriter {
    fn write_timestamp(&self, path: &Path, timestamp: CaptureTimestamp) -> Result<()> {
        let value = timestamp.format(EXIF_DATE_FORMAT).to_string();
        let path = path.to_path_buf();

        quietly(move || {
            let mut metadata = Metadata::new_from_path(&path).unwrap_or_else(|e| {
                debug!("No readable EXIF in {}, starting empty: {}", path.display(), e);
                Metadata::new()
            });
            metadata.set_tag(ExifTag::DateTimeOriginal(value));
            metadata.write_to_file(&path)
        })?
        .map_err(|e| Error::Metadata(e.to_string()))
    }
}

/// Copy the EXIF block of a source JPEG into a freshly encoded one
pub fn copy_jpeg_exif(source: &[u8], target: &mut Vec<u8>) -> Result<()> {
    let source = source.to_vec();
    let metadata = quietly(move || Metadata::new_from_vec(&source, FileExtension::JPEG))?
        .map_err(|e| Error::Metadata(e.to_string()))?;

    if metadata.data().is_empty() {
        return Ok(());
    }

    quietly(|| metadata.write_to_vec(target, FileExtension::JPEG))?
        .map_err(|e| Error::Metadata(e.to_string()))
}

/// Calls that have the panic hook swapped out
static HOOK_SWAP: Mutex<()> = Mutex::new(());

/// Run a little_exif call, turning a panic into an error.
///
/// The panic hook is process-wide: while it is swapped out, a panic on any
/// other thread is reported without a message.
fn quietly<T>(f: impl FnOnce() -> T) -> Result<T> {
    let _guard = HOOK_SWAP.lock().unwrap_or_else(PoisonError::into_inner);
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    panic::set_hook(previous);

    result.map_err(|_| Error::Metadata("EXIF library panicked".to_string()))
}
