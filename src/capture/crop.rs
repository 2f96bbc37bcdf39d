use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::geometry::PixelBounds;

/// Compressed formats a capture can be delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageEncoding {
    Jpeg,
    Png,
}

impl ImageEncoding {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }
}

/// Copy `bounds` out of `source` into a buffer of exactly that size.
///
/// Output pixel (0, 0) is source pixel (`bounds.x`, `bounds.y`).
pub fn crop(source: &RgbaImage, bounds: PixelBounds) -> Result<RgbaImage, CaptureError> {
    let (source_width, source_height) = source.dimensions();
    let fits = bounds.width > 0
        && bounds.height > 0
        && bounds.x.checked_add(bounds.width).is_some_and(|right| right <= source_width)
        && bounds.y.checked_add(bounds.height).is_some_and(|bottom| bottom <= source_height);

    if !fits {
        return Err(CaptureError::CropOutOfBounds {
            left: bounds.x,
            top: bounds.y,
            width: bounds.width,
            height: bounds.height,
            source_width,
            source_height,
        });
    }

    Ok(imageops::crop_imm(source, bounds.x, bounds.y, bounds.width, bounds.height).to_image())
}

/// Encode `image` in the given format. JPEG drops the alpha channel.
pub fn encode(image: &RgbaImage, encoding: ImageEncoding, jpeg_quality: u8) -> Result<Vec<u8>, CaptureError> {
    let mut bytes = Vec::new();
    match encoding {
        ImageEncoding::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality);
            rgb.write_with_encoder(encoder)?;
        }
        ImageEncoding::Png => {
            let encoder = PngEncoder::new(Cursor::new(&mut bytes));
            image.write_with_encoder(encoder)?;
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Every pixel encodes its own coordinates.
    fn coordinate_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn crop_starts_at_the_rect_origin() {
        let source = coordinate_image(200, 100);
        let bounds = PixelBounds {
            x: 37,
            y: 12,
            width: 50,
            height: 20,
        };

        let cropped = crop(&source, bounds).unwrap();
        assert_eq!(cropped.dimensions(), (50, 20));
        assert_eq!(cropped.get_pixel(0, 0), source.get_pixel(37, 12));
        assert_eq!(cropped.get_pixel(49, 19), source.get_pixel(86, 31));
    }

    #[test]
    fn crop_touching_the_edge_is_fine() {
        let source = coordinate_image(64, 48);
        let bounds = PixelBounds {
            x: 44,
            y: 28,
            width: 20,
            height: 20,
        };
        assert_eq!(crop(&source, bounds).unwrap().dimensions(), (20, 20));
    }

    #[test]
    fn crop_outside_fails() {
        let source = coordinate_image(64, 48);
        let bounds = PixelBounds {
            x: 50,
            y: 0,
            width: 20,
            height: 20,
        };
        assert!(matches!(crop(&source, bounds), Err(CaptureError::CropOutOfBounds { .. })));

        let empty = PixelBounds {
            x: 0,
            y: 0,
            width: 0,
            height: 5,
        };
        assert!(crop(&source, empty).is_err());
    }

    #[test]
    fn encodings_decode_back_to_the_same_size() {
        let source = coordinate_image(30, 20);
        for encoding in [ImageEncoding::Jpeg, ImageEncoding::Png] {
            let bytes = encode(&source, encoding, 90).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (30, 20), "{}", encoding.mime());
        }
    }
}
