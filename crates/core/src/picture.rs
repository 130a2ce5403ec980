//! Decoding and downscaling of embedded slide pictures.

use crate::error::{Error, Result};
use crate::types::ExtractedImage;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Largest width an extracted picture keeps, in pixels.
pub const MAX_IMAGE_WIDTH: u32 = 400;

/// Largest height an extracted picture keeps, in pixels.
pub const MAX_IMAGE_HEIGHT: u32 = 300;

/// Compute the size of a `width` x `height` picture shrunk to fit inside
/// `max_width` x `max_height` with its aspect ratio preserved.
///
/// Pictures that already fit are returned unchanged; nothing is ever enlarged.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    );
    let scaled = |side: u32, max: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max);

    (scaled(width, max_width), scaled(height, max_height))
}

/// Decode an encoded picture and shrink it to the given bounds with Lanczos
/// resampling.
pub fn decode_and_fit(
    data: &[u8],
    name: impl Into<String>,
    max_width: u32,
    max_height: u32,
) -> Result<ExtractedImage> {
    let decoded =
        image::load_from_memory(data).map_err(|e| Error::ImageDecodeError(e.to_string()))?;

    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::ImageDecodeError("image has no pixels".to_string()));
    }

    let (target_width, target_height) = fit_within(width, height, max_width, max_height);
    let resized = if (target_width, target_height) == (width, height) {
        decoded
    } else {
        log::debug!(
            "Downscaling picture from {}x{} to {}x{}",
            width,
            height,
            target_width,
            target_height
        );
        decoded.resize_exact(target_width, target_height, FilterType::Lanczos3)
    };

    Ok(ExtractedImage {
        name: name.into(),
        width: target_width,
        height: target_height,
        rgb: flatten_onto_white(&resized),
    })
}

/// Convert to packed RGB8, compositing any transparency onto a white page.
fn flatten_onto_white(image: &DynamicImage) -> Vec<u8> {
    let rgba = image.to_rgba8();
    let mut rgb = Vec::with_capacity(rgba.width() as usize * rgba.height() as usize * 3);

    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            let blended = (u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }

    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_fit_within_keeps_small_images() {
        assert_eq!(fit_within(200, 100, 400, 300), (200, 100));
        assert_eq!(fit_within(400, 300, 400, 300), (400, 300));
        assert_eq!(fit_within(1, 1, 400, 300), (1, 1));
    }

    #[test]
    fn test_fit_within_preserves_ratio() {
        assert_eq!(fit_within(800, 600, 400, 300), (400, 300));
        assert_eq!(fit_within(1600, 400, 400, 300), (400, 100));
        assert_eq!(fit_within(300, 900, 400, 300), (100, 300));
        assert_eq!(fit_within(401, 10, 400, 300), (400, 10));
    }

    #[test]
    fn test_fit_within_never_grows_and_keeps_ratio() {
        let sizes = [
            (401, 1),
            (1, 301),
            (1920, 1080),
            (1080, 1920),
            (640, 480),
            (4000, 3000),
            (999, 333),
            (555, 777),
        ];

        for (width, height) in sizes {
            let (w, h) = fit_within(width, height, 400, 300);
            assert!(w <= 400 && h <= 300, "{}x{} -> {}x{}", width, height, w, h);
            assert!(w <= width && h <= height);

            // Each side is rounded by at most half a pixel.
            let skew = (i64::from(w) * i64::from(height) - i64::from(h) * i64::from(width)).abs();
            assert!(
                skew as f64 <= 0.5 * f64::from(width + height),
                "{}x{} -> {}x{}",
                width,
                height,
                w,
                h
            );
        }
    }

    #[test]
    fn test_decode_and_fit_downscales() {
        let png = encode_png(DynamicImage::new_rgb8(800, 600));
        let image = decode_and_fit(&png, "image_2_1", MAX_IMAGE_WIDTH, MAX_IMAGE_HEIGHT).unwrap();

        assert_eq!(image.name, "image_2_1");
        assert_eq!((image.width, image.height), (400, 300));
        assert_eq!(image.rgb.len(), 400 * 300 * 3);
    }

    #[test]
    fn test_decode_and_fit_keeps_small_image() {
        let png = encode_png(DynamicImage::new_rgb8(40, 20));
        let image = decode_and_fit(&png, "small", 400, 300).unwrap();

        assert_eq!((image.width, image.height), (40, 20));
        assert_eq!(image.rgb.len(), 40 * 20 * 3);
    }

    #[test]
    fn test_transparency_becomes_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let png = encode_png(DynamicImage::ImageRgba8(rgba));

        let image = decode_and_fit(&png, "alpha", 400, 300).unwrap();
        assert_eq!(image.rgb, vec![255, 255, 255, 10, 20, 30]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_and_fit(b"definitely not an image", "bad", 400, 300).unwrap_err();
        assert!(matches!(err, Error::ImageDecodeError(_)));
    }
}
