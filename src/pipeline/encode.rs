//! Image encoding: raster → base64 JPEG wrapped in [`PageImage`].
//!
//! VLM APIs accept images as base64 data embedded in the JSON request body.
//! Pages are sent as JPEG: invoices are mostly flat print, and JPEG keeps a
//! multi-page request well below provider upload limits.

use crate::error::InvoiceError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// One encoded page, ready to attach to a model request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-indexed page number (always 1 for standalone images).
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    /// Mime type of the decoded payload, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Base64 payload (standard alphabet, padded).
    pub data: String,
}

impl PageImage {
    /// Verify `bytes` form a readable image and wrap them as base64.
    ///
    /// Only the header is parsed; pixel data is never decoded twice.
    pub fn from_encoded(page_num: usize, bytes: &[u8], origin: &str) -> Result<Self, InvoiceError> {
        let corrupt = |detail: String| InvoiceError::CorruptImage {
            origin: origin.to_string(),
            detail,
        };
        let format = image::guess_format(bytes).map_err(|e| corrupt(e.to_string()))?;
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| corrupt(e.to_string()))?;

        let data = STANDARD.encode(bytes);
        debug!(
            "Encoded page {} ({}x{}) → {} bytes base64",
            page_num,
            width,
            height,
            data.len()
        );

        Ok(Self {
            page_num,
            width,
            height,
            mime_type: format.to_mime_type().to_string(),
            data,
        })
    }

    /// Convert to the provider-neutral attachment type.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.data.clone(), self.mime_type.clone()).with_detail("high")
    }
}

/// Encode a rendered page as JPEG and wrap it in a [`PageImage`].
pub fn encode_page(
    page_num: usize,
    img: &DynamicImage,
    quality: u8,
) -> Result<PageImage, InvoiceError> {
    let mut buf = Vec::new();
    // JPEG has no alpha channel.
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .map_err(|e| InvoiceError::RasterisationFailed {
            page: page_num,
            detail: format!("Image encoding failed: {e}"),
        })?;
    PageImage::from_encoded(page_num, &buf, &format!("page {page_num}"))
}
