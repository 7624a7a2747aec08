//! Image enhancement: binarise a photographed or scanned invoice.
//!
//! Phone photos and scans carry uneven lighting, paper texture and sensor
//! noise. A global threshold loses faint print in shadowed regions, so the
//! filter thresholds each pixel against a Gaussian-weighted local mean
//! instead. The steps, in order:
//!
//! ```text
//! decode → grayscale → blur → adaptive threshold (inverted) → open → dilate → invert → JPEG
//! ```
//!
//! Thresholding is inverted so text becomes the white foreground that the
//! morphology operators work on; the final inversion restores dark text on a
//! light background.

use crate::error::InvoiceError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{dilate, open};
use tracing::debug;

/// Tunable parameters of the enhancement filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceParams {
    /// σ of the denoising blur. 1.1 is the σ of a 5×5 Gaussian kernel.
    pub blur_sigma: f32,
    /// Side of the neighbourhood used for the local threshold, in pixels.
    pub block_size: u32,
    /// Constant subtracted from the local mean.
    pub offset: f32,
    /// Chebyshev radius of the morphology kernel; 0 is a 1×1 kernel.
    pub morph_radius: u8,
    /// JPEG quality of the encoded result.
    pub jpeg_quality: u8,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            block_size: 15,
            offset: 4.0,
            morph_radius: 0,
            jpeg_quality: 95,
        }
    }
}

impl EnhanceParams {
    /// σ of the Gaussian window for a `block_size` neighbourhood, using the
    /// usual `0.3·((k−1)/2 − 1) + 0.8` rule. 2.6 for the default of 15.
    pub fn block_sigma(&self) -> f32 {
        let k = self.block_size.max(3) as f32;
        0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
    }
}

/// Decode `bytes`, enhance, and return JPEG bytes.
///
/// `origin` only labels the error when the bytes cannot be decoded.
pub fn enhance_image_bytes(
    bytes: &[u8],
    params: &EnhanceParams,
    origin: &str,
) -> Result<Vec<u8>, InvoiceError> {
    let img = image::load_from_memory(bytes).map_err(|e| InvoiceError::CorruptImage {
        origin: origin.to_string(),
        detail: e.to_string(),
    })?;
    let enhanced = enhance(&img, params);
    encode_jpeg(&enhanced, params.jpeg_quality).map_err(|e| InvoiceError::CorruptImage {
        origin: origin.to_string(),
        detail: format!("JPEG encoding failed: {e}"),
    })
}

/// Run the full filter on a decoded image.
pub fn enhance(img: &DynamicImage, params: &EnhanceParams) -> GrayImage {
    let gray = img.to_luma8();
    debug!("Enhancing {}x{} image", gray.width(), gray.height());

    let blurred = if params.blur_sigma > 0.0 {
        gaussian_blur_f32(&gray, params.blur_sigma)
    } else {
        gray
    };
    let binary = adaptive_threshold_inv(&blurred, params.block_sigma(), params.offset);
    let opened = open(&binary, Norm::LInf, params.morph_radius);
    let mut dilated = dilate(&opened, Norm::LInf, params.morph_radius);
    image::imageops::invert(&mut dilated);
    dilated
}

/// Inverted adaptive threshold with a Gaussian-weighted local mean.
///
/// A pixel brighter than `local_mean − offset` becomes 0, everything else
/// 255.
fn adaptive_threshold_inv(img: &GrayImage, sigma: f32, offset: f32) -> GrayImage {
    let local_mean = gaussian_blur_f32(img, sigma);
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, px) in img.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y).0[0] as f32 - offset;
        let v = if px.0[0] as f32 > threshold { 0u8 } else { 255u8 };
        out.put_pixel(x, y, Luma([v]));
    }
    out
}

/// Encode a grayscale image as baseline JPEG.
pub fn encode_jpeg(img: &GrayImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    Ok(buf)
}
