// Content rewriting applied while committing
pub mod resize;
pub mod stamp;

use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use log::{debug, warn};
use std::io::Cursor;

use crate::config::{format_timestamp, Config};
use crate::error::{Error, Result};
use crate::metadata::embedded::copy_jpeg_exif;
use crate::types::CaptureTimestamp;

pub use resize::fit_within;
pub use stamp::draw_stamp;

/// Quality used when re-encoding JPEG output
pub const JPEG_QUALITY: u8 = 90;

/// Rewrites the bytes of one file on its way to the destination
pub trait ImageTransform {
    /// `fallback_label` is stamped when there is no timestamp.
    ///
    /// An error means the bytes could not be rewritten; the caller then
    /// copies the original bytes through unchanged.
    fn transform(
        &self,
        bytes: &[u8],
        timestamp: Option<CaptureTimestamp>,
        fallback_label: &str,
    ) -> Result<Vec<u8>>;
}

/// Decode, optionally resize and stamp, then re-encode in the source format
#[derive(Debug, Clone)]
pub struct ImagePipeline {
    pub resize: Option<u32>,
    pub stamp: bool,
    pub stamp_format: String,
}

impl ImagePipeline {
    pub fn from_config(config: &Config) -> Self {
        Self {
            resize: config.resize,
            stamp: config.stamp,
            stamp_format: config.stamp_format.clone(),
        }
    }

    fn stamp_text(&self, timestamp: Option<CaptureTimestamp>, fallback_label: &str) -> Result<String> {
        match timestamp {
            Some(timestamp) => format_timestamp(&timestamp, &self.stamp_format),
            None => Ok(fallback_label.to_string()),
        }
    }
}

impl ImageTransform for ImagePipeline {
    fn transform(
        &self,
        bytes: &[u8],
        timestamp: Option<CaptureTimestamp>,
        fallback_label: &str,
    ) -> Result<Vec<u8>> {
        let format = image::guess_format(bytes)
            .map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
        let mut img = image::load_from_memory_with_format(bytes, format)?;

        if let Some(max_dimension) = self.resize {
            img = fit_within(img, max_dimension);
        }

        if self.stamp {
            let text = self.stamp_text(timestamp, fallback_label)?;
            debug!("Stamping '{}'", text);
            draw_stamp(&mut img, &text);
        }

        let mut encoded = encode(&img, format)?;

        if format == ImageFormat::Jpeg {
            if let Err(e) = copy_jpeg_exif(bytes, &mut encoded) {
                warn!("Could not carry EXIF data over: {}", e);
            }
        }

        Ok(encoded)
    }
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let output = match format {
        ImageFormat::Jpeg => ImageOutputFormat::Jpeg(JPEG_QUALITY),
        other => ImageOutputFormat::from(other),
    };

    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, output)?;
    Ok(cursor.into_inner())
}
