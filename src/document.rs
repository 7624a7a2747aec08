//! Documents and the document-to-image extractor.
//!
//! A [`Document`] owns the raw bytes of one invoice file together with where
//! it came from and its declared extension. [`extract_page_images`] turns it
//! into the ordered list of page images the vision model receives:
//!
//! | Extension | Handling |
//! |-----------|----------|
//! | `.jpg` `.jpeg` `.png` | verify, enhance, JPEG, one image |
//! | `.pdf` | text density for logging/branching, render every page |
//! | anything else | [`InvoiceError::UnsupportedFileType`] |

use crate::config::ExtractorConfig;
use crate::error::InvoiceError;
use crate::pipeline::density::{text_density, PdfClass};
use crate::pipeline::encode::{encode_page, PageImage};
use crate::pipeline::enhance::{encode_jpeg, enhance, enhance_image_bytes, EnhanceParams};
use crate::pipeline::{input, render};
pub use crate::pipeline::input::fetch;
use image::DynamicImage;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Where a document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Local(PathBuf),
    Remote(String),
    /// Bytes handed over directly by the caller.
    Memory,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local(p) => write!(f, "{}", p.display()),
            Origin::Remote(url) => f.write_str(url),
            Origin::Memory => f.write_str("<memory>"),
        }
    }
}

/// Supported document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Jpeg,
    Png,
}

impl DocumentKind {
    /// Map a lower-case extension (with leading dot) to a kind.
    pub fn from_extension(ext: &str) -> Result<Self, InvoiceError> {
        match ext {
            ".pdf" => Ok(DocumentKind::Pdf),
            ".jpg" | ".jpeg" => Ok(DocumentKind::Jpeg),
            ".png" => Ok(DocumentKind::Png),
            other => Err(InvoiceError::UnsupportedFileType {
                extension: other.to_string(),
            }),
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, DocumentKind::Jpeg | DocumentKind::Png)
    }
}

/// One invoice file held in memory.
#[derive(Clone)]
pub struct Document {
    bytes: Vec<u8>,
    extension: String,
    origin: Origin,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("origin", &self.origin)
            .field("extension", &self.extension)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Document {
    /// `extension` is normalised to lower case with a leading dot.
    pub fn new(bytes: Vec<u8>, extension: impl Into<String>, origin: Origin) -> Self {
        let ext = extension.into().to_ascii_lowercase();
        let extension = if ext.is_empty() || ext.starts_with('.') {
            ext
        } else {
            format!(".{ext}")
        };
        Self {
            bytes,
            extension,
            origin,
        }
    }

    /// A document built from bytes the caller already holds.
    pub fn from_bytes(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self::new(bytes, extension, Origin::Memory)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn kind(&self) -> Result<DocumentKind, InvoiceError> {
        DocumentKind::from_extension(&self.extension)
    }
}

/// Convert a document into its ordered page images.
pub async fn extract_page_images(
    document: Document,
    config: &ExtractorConfig,
) -> Result<Vec<PageImage>, InvoiceError> {
    let origin = document.origin().to_string();
    let kind = document.kind().inspect_err(|e| {
        warn!("Rejecting '{}': {}", origin, e);
    })?;

    let params = EnhanceParams {
        jpeg_quality: config.jpeg_quality,
        ..EnhanceParams::default()
    };

    let images = if kind.is_image() {
        info!("Processing image file...");
        let bytes = document.into_bytes();
        let label = origin.clone();
        // Decoding the source verifies it is well-formed.
        let enhanced = tokio::task::spawn_blocking(move || {
            enhance_image_bytes(&bytes, &params, &label)
        })
        .await
        .map_err(|e| InvoiceError::Internal(format!("Enhancement task panicked: {}", e)))??;
        vec![PageImage::from_encoded(1, &enhanced, &origin)?]
    } else {
        pdf_page_images(document.into_bytes(), &origin, config, params).await?
    };

    info!("Extracted and processed {} image(s) from '{}'", images.len(), origin);
    Ok(images)
}

async fn pdf_page_images(
    bytes: Vec<u8>,
    origin: &str,
    config: &ExtractorConfig,
    params: EnhanceParams,
) -> Result<Vec<PageImage>, InvoiceError> {
    let rendered = render::render_pdf(bytes, origin, config).await?;

    let density = text_density(&rendered.layouts);
    let class = PdfClass::classify(density, config.scanned_threshold);
    info!("Text percentage: {:.4} ({:?})", density, class);

    let enhance_pages = enhances_pages(class, config.enhance_scanned_pdfs);
    match class {
        PdfClass::Scanned => info!("Processing image-based PDF..."),
        PdfClass::Digital => info!("Processing text-based PDF..."),
    }

    let quality = config.jpeg_quality;
    tokio::task::spawn_blocking(move || {
        encode_pdf_pages(&rendered.pages, enhance_pages, &params, quality)
    })
    .await
    .map_err(|e| InvoiceError::Internal(format!("Encode task panicked: {}", e)))?
}

/// Whether pages of a PDF of `class` go through the enhancement filter.
pub fn enhances_pages(class: PdfClass, enhance_scanned_pdfs: bool) -> bool {
    class == PdfClass::Scanned && enhance_scanned_pdfs
}

/// Encode rendered pages in order, optionally enhancing each one first.
pub fn encode_pdf_pages(
    pages: &[DynamicImage],
    enhance_pages: bool,
    params: &EnhanceParams,
    quality: u8,
) -> Result<Vec<PageImage>, InvoiceError> {
    pages
        .iter()
        .enumerate()
        .map(|(idx, img)| {
            let page_num = idx + 1;
            if !enhance_pages {
                return encode_page(page_num, img, quality);
            }
            let gray = enhance(img, params);
            let bytes = encode_jpeg(&gray, quality).map_err(|e| {
                InvoiceError::RasterisationFailed {
                    page: page_num,
                    detail: format!("Image encoding failed: {e}"),
                }
            })?;
            PageImage::from_encoded(page_num, &bytes, &format!("page {page_num}"))
        })
        .collect()
}

/// Resolve `input` (path or URL) and return one base64 string per image.
pub async fn extract_images_base64(
    input_str: &str,
    config: &ExtractorConfig,
) -> Result<Vec<String>, InvoiceError> {
    let document = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let images = extract_page_images(document, config).await?;
    Ok(images.into_iter().map(|p| p.data).collect())
}

/// Page count and text density of a PDF, without rasterising it.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfSummary {
    pub page_count: usize,
    pub text_density: f32,
    pub class: PdfClass,
}

/// Analyse the text layer of a PDF document.
pub async fn inspect_pdf(
    document: Document,
    config: &ExtractorConfig,
) -> Result<PdfSummary, InvoiceError> {
    if document.kind()? != DocumentKind::Pdf {
        return Err(InvoiceError::UnsupportedFileType {
            extension: document.extension().to_string(),
        });
    }
    let origin = document.origin().to_string();
    let layouts = render::analyse_pdf(document.into_bytes(), &origin, config).await?;
    let density = text_density(&layouts);
    Ok(PdfSummary {
        page_count: layouts.len(),
        text_density: density,
        class: PdfClass::classify(density, config.scanned_threshold),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch() {
        assert_eq!(DocumentKind::from_extension(".pdf").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_extension(".jpg").unwrap(), DocumentKind::Jpeg);
        assert_eq!(DocumentKind::from_extension(".jpeg").unwrap(), DocumentKind::Jpeg);
        assert_eq!(DocumentKind::from_extension(".png").unwrap(), DocumentKind::Png);
        assert!(DocumentKind::from_extension(".txt").is_err());
        assert!(DocumentKind::from_extension("").is_err());
    }

    #[test]
    fn new_normalises_extension() {
        let d = Document::from_bytes(vec![1, 2, 3], "PNG");
        assert_eq!(d.extension(), ".png");
        assert_eq!(d.kind().unwrap(), DocumentKind::Png);
        assert_eq!(d.origin().to_string(), "<memory>");
    }

    #[tokio::test]
    async fn text_file_is_unsupported() {
        let doc = Document::from_bytes(b"hello".to_vec(), ".txt");
        let err = extract_page_images(doc, &ExtractorConfig::default())
            .await
            .unwrap_err();
        match err {
            InvoiceError::UnsupportedFileType { extension } => assert_eq!(extension, ".txt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Grey "paper" with darker bands; `shade` tells pages apart.
    fn grey_page(shade: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(64, 48, |x, y| {
            if (16..22).contains(&y) && (8..56).contains(&x) {
                image::Rgb([40, 40, 40])
            } else {
                let v = shade.saturating_sub((x / 8) as u8);
                image::Rgb([v, v, v])
            }
        }))
    }

    fn decode(page: &PageImage) -> image::GrayImage {
        use base64::Engine as _;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&page.data)
            .unwrap();
        image::load_from_memory(&bytes).unwrap().to_luma8()
    }

    #[test]
    fn only_scanned_pdfs_are_enhanced_when_enabled() {
        let scanned = PdfClass::classify(0.49, 0.5);
        let digital = PdfClass::classify(0.5, 0.5);
        assert_eq!(scanned, PdfClass::Scanned);
        assert_eq!(digital, PdfClass::Digital);

        assert!(enhances_pages(scanned, true));
        assert!(!enhances_pages(scanned, false));
        assert!(!enhances_pages(digital, true));
        assert!(!enhances_pages(digital, false));
    }

    #[test]
    fn pdf_pages_keep_order() {
        let pages = [grey_page(200), grey_page(150), grey_page(100)];
        let images = encode_pdf_pages(&pages, false, &EnhanceParams::default(), 95).unwrap();

        assert_eq!(images.len(), 3);
        for (idx, img) in images.iter().enumerate() {
            assert_eq!(img.page_num, idx + 1);
            assert_eq!((img.width, img.height), (64, 48));
            assert_eq!(img.mime_type, "image/jpeg");
        }
        // Paper brightness follows the source page.
        let corners: Vec<u8> = images.iter().map(|p| decode(p).get_pixel(2, 2).0[0]).collect();
        assert!(corners[0] > corners[1] && corners[1] > corners[2], "got {corners:?}");
    }

    #[test]
    fn plain_pages_keep_grey_levels() {
        let images = encode_pdf_pages(&[grey_page(180)], false, &EnhanceParams::default(), 95).unwrap();
        let gray = decode(&images[0]);
        let mid_tones = gray.pixels().filter(|p| (60..=200).contains(&p.0[0])).count();
        assert!(mid_tones > (gray.width() * gray.height()) as usize / 2, "only {mid_tones} mid-tone pixels");
    }

    #[test]
    fn enhanced_pages_are_near_binary() {
        let images = encode_pdf_pages(&[grey_page(180)], true, &EnhanceParams::default(), 95).unwrap();
        let gray = decode(&images[0]);
        let extremes = gray
            .pixels()
            .filter(|p| p.0[0] < 40 || p.0[0] > 215)
            .count();
        // JPEG ringing leaves a few in-between values around edges.
        let total = (gray.width() * gray.height()) as usize;
        assert!(
            extremes * 10 >= total * 9,
            "{extremes} of {total} pixels are black or white"
        );
    }

    #[tokio::test]
    async fn inspect_rejects_images() {
        let doc = Document::from_bytes(vec![0u8; 4], ".png");
        let err = inspect_pdf(doc, &ExtractorConfig::default()).await.unwrap_err();
        assert!(matches!(err, InvoiceError::UnsupportedFileType { .. }));
    }
}
