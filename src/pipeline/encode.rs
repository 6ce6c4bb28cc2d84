//! Image encoding for recognizer backends.
//!
//! Tesseract reads a PNG from stdin; vision models take the same PNG as a
//! base64 attachment. PNG is lossless, which matters far more for text
//! crispness than file size does.

use crate::error::BackendError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a page raster as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| BackendError::Encode(e.to_string()))?;
    debug!("Encoded page → {} bytes PNG", buf.len());
    Ok(buf)
}

/// Encode a page raster as a base64 PNG attachment for a vision model.
///
/// `detail: "high"` lets GPT-4-class models tile the full image; small print
/// is lost at the single-tile overview.
pub fn encode_image_data(img: &DynamicImage) -> Result<ImageData, BackendError> {
    let b64 = STANDARD.encode(encode_png(img)?);
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([128])))
    }

    #[test]
    fn png_signature() {
        let bytes = encode_png(&page()).expect("encode should succeed");
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn image_data_is_base64_png() {
        let data = encode_image_data(&page()).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert!(decoded.starts_with(b"\x89PNG"));
    }
}
