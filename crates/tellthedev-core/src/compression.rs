use std::io::Cursor;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::feedback::RawImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionOptions {
    pub max_size_bytes: usize,
    pub max_width_or_height: u32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_size_bytes: 1024 * 1024,
            max_width_or_height: 1280,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("could not decode image: {0}")]
    Decode(image::ImageError),
    #[error("could not encode image: {0}")]
    Encode(image::ImageError),
    #[error("image is still {size} bytes after compression (limit {limit})")]
    TooLarge { size: usize, limit: usize },
}

pub trait ImageCompressor {
    fn compress(&self, image: RawImage) -> Result<RawImage, CompressionError>;
}

const JPEG_QUALITY_STEPS: [u8; 5] = [85, 70, 55, 40, 25];

/// Downscales to the bounding box, then re-encodes as JPEG at decreasing
/// quality until the size target is met.
#[derive(Debug, Clone, Default)]
pub struct RasterCompressor {
    pub options: CompressionOptions,
}

impl ImageCompressor for RasterCompressor {
    fn compress(&self, image: RawImage) -> Result<RawImage, CompressionError> {
        let decoded = image::load_from_memory(&image.bytes).map_err(CompressionError::Decode)?;
        let bound = self.options.max_width_or_height;
        let resized = if decoded.width() > bound || decoded.height() > bound {
            decoded.resize(bound, bound, FilterType::Triangle)
        } else {
            decoded
        };

        let mut smallest = 0;
        for quality in JPEG_QUALITY_STEPS {
            let bytes = encode_jpeg(&resized, quality)?;
            if bytes.len() <= self.options.max_size_bytes {
                return Ok(RawImage {
                    file_name: image.file_name,
                    content_type: "image/jpeg".to_string(),
                    bytes,
                });
            }
            smallest = bytes.len();
        }
        Err(CompressionError::TooLarge {
            size: smallest,
            limit: self.options.max_size_bytes,
        })
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressionError> {
    let rgb = image.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&rgb)
        .map_err(CompressionError::Encode)?;
    Ok(buffer.into_inner())
}
