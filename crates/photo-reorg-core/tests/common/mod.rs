#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use photo_reorg_core::metadata::{ExifWriter, MetadataWriter};
use photo_reorg_core::parse_timestamp;

/// Create a file with the given contents, creating parent directories
pub fn create_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(contents).unwrap();
    path
}

/// Create a JPEG whose EXIF block carries `date` as DateTimeOriginal
pub fn create_dated_jpeg(dir: &Path, name: &str, date: Option<&str>, shade: u8) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    let path = dir.join(name);
    let img = image::RgbImage::from_fn(48, 32, |x, y| image::Rgb([shade, x as u8, y as u8]));
    img.save_with_format(&path, image::ImageFormat::Jpeg).unwrap();

    if let Some(date) = date {
        ExifWriter
            .write_timestamp(&path, parse_timestamp(date).unwrap())
            .unwrap();
    }
    path
}

/// Sorted content hashes of every file below `dir`
pub fn content_hashes(dir: &Path) -> Vec<String> {
    let mut hashes: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| blake3::hash(&fs::read(e.path()).unwrap()).to_string())
        .collect();
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
