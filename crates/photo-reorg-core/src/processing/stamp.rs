//! Visible date stamp drawn into the bottom-right corner.
//!
//! Text is rendered with a built-in 5x7 bitmap font, scaled by whole pixels,
//! so no font files are needed at runtime. Lower case letters are drawn as
//! upper case; characters without a glyph are drawn as a box.

use image::{DynamicImage, GenericImage, GenericImageView, Rgba};

/// Distance between the text and the image border
pub const STAMP_MARGIN: u32 = 10;

/// Minimum glyph height, in pixels
pub const STAMP_MIN_HEIGHT: f32 = 10.0;

/// Glyph height relative to the image height
pub const STAMP_HEIGHT_RATIO: f32 = 0.025;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

type Glyph = [u8; GLYPH_HEIGHT as usize];

const UNKNOWN: Glyph = [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F];

/// Rows top to bottom; bit 4 is the leftmost column
fn glyph(c: char) -> Glyph {
    match c.to_ascii_uppercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '+' => [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        ' ' => [0x00; GLYPH_HEIGHT as usize],
        _ => UNKNOWN,
    }
}

/// Whole-pixel scale factor for an image of the given height
pub fn glyph_scale(image_height: u32) -> u32 {
    let target = (image_height as f32 * STAMP_HEIGHT_RATIO).max(STAMP_MIN_HEIGHT);
    ((target / GLYPH_HEIGHT as f32).round() as u32).max(1)
}

/// Size of `text` in pixels at the given scale
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let chars = text.chars().count() as u32;
    let width = (chars * GLYPH_ADVANCE).saturating_sub(1) * scale;
    (width, GLYPH_HEIGHT * scale)
}

/// Draw `text` in white, anchored to the bottom-right corner.
///
/// Text wider than the image is clipped on the left.
pub fn draw_stamp(img: &mut DynamicImage, text: &str) {
    let (width, height) = img.dimensions();
    let scale = glyph_scale(height);
    let (text_width, text_height) = text_size(text, scale);

    let right = width.saturating_sub(STAMP_MARGIN) as i64;
    let bottom = height.saturating_sub(STAMP_MARGIN) as i64;
    let origin_x = right - text_width as i64;
    let origin_y = bottom - text_height as i64;

    for (i, c) in text.chars().enumerate() {
        let cell_x = origin_x + (i as u32 * GLYPH_ADVANCE * scale) as i64;
        let rows = glyph(c);

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let x = cell_x + (col * scale) as i64;
                let y = origin_y + (row as u32 * scale) as i64;
                fill_block(img, x, y, scale);
            }
        }
    }
}

fn fill_block(img: &mut DynamicImage, x: i64, y: i64, size: u32) {
    let (width, height) = img.dimensions();

    for dy in 0..size as i64 {
        for dx in 0..size as i64 {
            let (px, py) = (x + dx, y + dy);
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                continue;
            }
            img.put_pixel(px as u32, py as u32, WHITE);
        }
    }
}
