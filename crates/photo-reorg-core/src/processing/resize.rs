use image::{DynamicImage, GenericImageView};
use log::debug;

/// Dimensions with the longer side scaled down to `max_dimension`.
/// Returns `None` when the image already fits.
pub fn fitted_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width <= max_dimension && height <= max_dimension {
        return None;
    }

    // Calculate target dimensions maintaining aspect ratio
    let dimensions = if width >= height {
        let scale = max_dimension as f64 / width as f64;
        (max_dimension, ((height as f64 * scale).round() as u32).max(1))
    } else {
        let scale = max_dimension as f64 / height as f64;
        (((width as f64 * scale).round() as u32).max(1), max_dimension)
    };

    Some(dimensions)
}

/// Downscale so neither side exceeds `max_dimension`
pub fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    match fitted_dimensions(width, height, max_dimension) {
        Some((target_width, target_height)) => {
            debug!(
                "Resizing {}x{} -> {}x{}",
                width, height, target_width, target_height
            );
            img.resize_exact(
                target_width,
                target_height,
                image::imageops::FilterType::Lanczos3,
            )
        }
        None => img,
    }
}
