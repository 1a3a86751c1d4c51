//! Local image checks and transforms. Everything here runs before an image is
//! stored or sent upstream.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Rgba};

use crate::error::{Result, RoomGenError};
use crate::models::MAX_REFERENCE_IMAGE_BYTES;

/// Longest edge sent upstream. Larger photos are shrunk to fit.
pub const MAX_DIMENSION: u32 = 2048;

const JPEG_QUALITY: u8 = 90;
const OVERLAY_COLOR: [u8; 3] = [147, 51, 234];

/// Checks size, container format (PNG or JPEG only) and that the pixels decode.
pub fn validate_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(RoomGenError::ValidationError("Image is empty".to_string()));
    }
    if bytes.len() > MAX_REFERENCE_IMAGE_BYTES {
        return Err(RoomGenError::ValidationError(format!(
            "Image is too large ({} bytes, limit {} bytes)",
            bytes.len(),
            MAX_REFERENCE_IMAGE_BYTES
        )));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| RoomGenError::ValidationError(format!("Unreadable image: {}", e)))?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(RoomGenError::ValidationError(format!(
            "Unsupported image format {:?}, upload PNG or JPEG",
            format
        )));
    }

    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| RoomGenError::ValidationError(format!("Unreadable image: {}", e)))
}

/// Validates the photo, drops alpha, shrinks it to fit [`MAX_DIMENSION`] and
/// re-encodes it as JPEG.
pub fn preprocess(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = validate_image(bytes)?;
    let (width, height) = (decoded.width(), decoded.height());

    let fitted = if width > MAX_DIMENSION || height > MAX_DIMENSION {
        log::debug!("Downscaling {}x{} photo to fit {}px", width, height, MAX_DIMENSION);
        decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        decoded
    };

    let rgb = fitted.to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| RoomGenError::InternalError(format!("Failed to encode JPEG: {}", e)))?;
    Ok(encoded)
}

/// Paints the non-zero mask pixels over the photo in a translucent highlight
/// and returns the result as PNG. `alpha` is the highlight opacity.
pub fn mask_overlay(image_bytes: &[u8], mask_bytes: &[u8], alpha: u8) -> Result<Vec<u8>> {
    let mut canvas = validate_image(image_bytes)?.to_rgba8();
    let (width, height) = canvas.dimensions();

    let mask = image::load_from_memory(mask_bytes)
        .map_err(|e| RoomGenError::ValidationError(format!("Unreadable mask: {}", e)))?
        .to_luma8();
    let mask: GrayImage = if mask.dimensions() == (width, height) {
        mask
    } else {
        image::imageops::resize(&mask, width, height, FilterType::Nearest)
    };

    let a = u16::from(alpha);
    let blend = |over: u8, under: u8| -> u8 { ((u16::from(over) * a + u16::from(under) * (255 - a)) / 255) as u8 };
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] == 0 {
            continue;
        }
        let Rgba([r, g, b, base_alpha]) = *pixel;
        *pixel = Rgba([
            blend(OVERLAY_COLOR[0], r),
            blend(OVERLAY_COLOR[1], g),
            blend(OVERLAY_COLOR[2], b),
            (a + u16::from(base_alpha) * (255 - a) / 255) as u8,
        ]);
    }

    let mut encoded = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
        .map_err(|e| RoomGenError::InternalError(format!("Failed to encode PNG: {}", e)))?;
    Ok(encoded)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    /// A real, decodable PNG of the given size.
    pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    pub(crate) fn left_half_mask(width: u32, height: u32) -> Vec<u8> {
        let mask = GrayImage::from_fn(width, height, |x, _| if x < width / 2 { Luma([255]) } else { Luma([0]) });
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(mask)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_text_file_is_rejected() {
        let err = validate_image(b"this is a plain text file, not a photo").unwrap_err();
        assert!(matches!(err, RoomGenError::ValidationError(_)));
    }

    #[test]
    fn test_truncated_png_is_rejected() {
        let err = validate_image(b"\x89PNG\r\n\x1a\nroom").unwrap_err();
        assert!(err.to_string().contains("Unreadable image"));
    }

    #[test]
    fn test_gif_is_not_accepted() {
        let err = validate_image(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;").unwrap_err();
        assert!(err.to_string().contains("upload PNG or JPEG"));
    }

    #[test]
    fn test_preprocess_shrinks_large_photos_to_jpeg() {
        let out = preprocess(&sample_png(2400, 1200)).unwrap();
        assert!(out.starts_with(b"\xff\xd8"));
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2048, 1024));
    }

    #[test]
    fn test_preprocess_keeps_small_photo_dimensions() {
        let decoded = image::load_from_memory(&preprocess(&sample_png(64, 48)).unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_mask_overlay_tints_masked_pixels_only() {
        let overlay = mask_overlay(&sample_png(8, 4), &left_half_mask(8, 4), 128).unwrap();
        let decoded = image::load_from_memory(&overlay).unwrap().to_rgba8();

        let tinted = decoded.get_pixel(0, 0);
        assert_ne!(tinted.0, [255, 255, 255, 255]);
        assert_eq!(tinted[3], 255);
        assert_eq!(decoded.get_pixel(7, 3).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_mask_is_resized_to_photo() {
        let overlay = mask_overlay(&sample_png(8, 4), &left_half_mask(4, 2), 255).unwrap();
        let decoded = image::load_from_memory(&overlay).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert_eq!(decoded.get_pixel(1, 1).0, [147, 51, 234, 255]);
    }
}
