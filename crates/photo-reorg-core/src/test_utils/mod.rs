#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::parse_timestamp;
use crate::error::Result;
use crate::metadata::{MetadataReader, MetadataWriter};
use crate::types::CaptureTimestamp;

/// Parse a `YYYY-MM-DD HH:MM` test timestamp
pub fn timestamp(value: &str) -> CaptureTimestamp {
    parse_timestamp(value).unwrap()
}

/// Create a file with the given contents, creating parent directories
pub fn create_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    let file_path = dir.join(name);
    let mut file = File::create(&file_path).unwrap();
    file.write_all(contents).unwrap();
    file_path
}

/// Create a real JPEG of the given size
pub fn create_test_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    let path = dir.join(name);
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    });
    img.save_with_format(&path, image::ImageFormat::Jpeg).unwrap();
    path
}

/// Create a black PNG of the given size
pub fn create_test_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    let path = dir.join(name);
    let img = image::RgbImage::new(width, height);
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    path
}

/// Relative path -> content hash of every file below `dir`
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, String> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let bytes = fs::read(e.path()).unwrap();
            let relative = e.path().strip_prefix(dir).unwrap().to_path_buf();
            (relative, blake3::hash(&bytes).to_string())
        })
        .collect()
}

/// Sorted content hashes of every file below `dir`, ignoring names
pub fn content_multiset(dir: &Path) -> Vec<String> {
    let mut hashes: Vec<String> = snapshot(dir).into_values().collect();
    hashes.sort();
    hashes
}

/// Sorted file names directly inside `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Metadata reader answering from a name -> timestamp table
#[derive(Default)]
pub struct FixedTimestamps {
    dates: HashMap<OsString, CaptureTimestamp>,
}

impl FixedTimestamps {
    pub fn new(dates: &[(&str, &str)]) -> Self {
        Self {
            dates: dates
                .iter()
                .map(|(name, date)| (OsString::from(name), timestamp(date)))
                .collect(),
        }
    }
}

impl MetadataReader for FixedTimestamps {
    fn read_timestamp(&self, path: &Path) -> Result<Option<CaptureTimestamp>> {
        Ok(path
            .file_name()
            .and_then(|name| self.dates.get(name))
            .copied())
    }
}

/// Metadata writer that only records what it was asked to write
#[derive(Default)]
pub struct RecordingWriter {
    pub written: std::rc::Rc<RefCell<Vec<(PathBuf, CaptureTimestamp)>>>,
}

impl MetadataWriter for RecordingWriter {
    fn write_timestamp(&self, path: &Path, timestamp: CaptureTimestamp) -> Result<()> {
        self.written
            .borrow_mut()
            .push((path.to_path_buf(), timestamp));
        Ok(())
    }
}
