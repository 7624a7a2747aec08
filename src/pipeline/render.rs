//! PDF rasterisation and layout analysis via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which uses thread-local
//! state and blocks for the whole render. `tokio::task::spawn_blocking`
//! moves the work off the async worker threads.
//!
//! One pass over the document collects both the page layouts (for the
//! text-density estimate) and the rendered rasters, so the PDF is parsed
//! once per request.

use crate::config::ExtractorConfig;
use crate::error::InvoiceError;
use crate::pipeline::density::{PageLayout, TextBlock};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything learned from one pass over a PDF.
#[derive(Debug, Default)]
pub struct RenderedPdf {
    /// Per-page layout, in page order.
    pub layouts: Vec<PageLayout>,
    /// Per-page raster, in page order. Empty when only layouts were asked for.
    pub pages: Vec<DynamicImage>,
}

/// Rendering knobs copied out of [`ExtractorConfig`] for the blocking task.
#[derive(Debug, Clone)]
struct RenderSettings {
    dpi: u32,
    max_pixels: u32,
    lib_path: Option<PathBuf>,
    rasterise: bool,
}

/// Analyse and rasterise every page of the PDF held in `bytes`.
pub async fn render_pdf(
    bytes: Vec<u8>,
    origin: &str,
    config: &ExtractorConfig,
) -> Result<RenderedPdf, InvoiceError> {
    run_blocking(bytes, origin, settings(config, true)).await
}

/// Layout analysis only, for inspecting a PDF without rendering it.
pub async fn analyse_pdf(
    bytes: Vec<u8>,
    origin: &str,
    config: &ExtractorConfig,
) -> Result<Vec<PageLayout>, InvoiceError> {
    Ok(run_blocking(bytes, origin, settings(config, false))
        .await?
        .layouts)
}

fn settings(config: &ExtractorConfig, rasterise: bool) -> RenderSettings {
    RenderSettings {
        dpi: config.render_dpi,
        max_pixels: config.max_rendered_pixels,
        lib_path: config.pdfium_lib_path.clone(),
        rasterise,
    }
}

async fn run_blocking(
    bytes: Vec<u8>,
    origin: &str,
    settings: RenderSettings,
) -> Result<RenderedPdf, InvoiceError> {
    let origin = origin.to_string();
    tokio::task::spawn_blocking(move || render_pdf_blocking(bytes, &origin, &settings))
        .await
        .map_err(|e| InvoiceError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of layout analysis and rendering.
fn render_pdf_blocking(
    bytes: Vec<u8>,
    origin: &str,
    settings: &RenderSettings,
) -> Result<RenderedPdf, InvoiceError> {
    let pdfium = bind_pdfium(settings.lib_path.as_deref())?;

    let document = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(|e| InvoiceError::CorruptPdf {
            origin: origin.to_string(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    // 72 DPI is one pixel per PDF point.
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(settings.dpi as f32 / 72.0)
        .set_maximum_width(settings.max_pixels as i32)
        .set_maximum_height(settings.max_pixels as i32);

    let mut rendered = RenderedPdf {
        layouts: Vec::with_capacity(total_pages),
        pages: Vec::with_capacity(if settings.rasterise { total_pages } else { 0 }),
    };

    for (idx, page) in pages.iter().enumerate() {
        rendered.layouts.push(page_layout(&page, idx + 1));

        if !settings.rasterise {
            continue;
        }

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            InvoiceError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        rendered.pages.push(image);
    }

    Ok(rendered)
}

/// Page size and text-segment rectangles of one page.
fn page_layout(page: &PdfPage, page_num: usize) -> PageLayout {
    let text_blocks = match page.text() {
        Ok(text) => text
            .segments()
            .iter()
            .map(|segment| {
                let r = segment.bounds();
                TextBlock {
                    left: r.left().value,
                    bottom: r.bottom().value,
                    right: r.right().value,
                    top: r.top().value,
                }
            })
            .collect(),
        Err(e) => {
            warn!("Page {}: no text layer available ({:?})", page_num, e);
            Vec::new()
        }
    };

    PageLayout {
        width: page.width().value,
        height: page.height().value,
        text_blocks,
    }
}

/// Bind to a pdfium shared library.
///
/// Search order: the explicit path, `PDFIUM_LIB_PATH`, the working
/// directory, then the system library path.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, InvoiceError> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match configured {
        Some(path) => Pdfium::bind_to_library(&path).map_err(|e| {
            InvoiceError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e))
        })?,
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| InvoiceError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };

    Ok(Pdfium::new(bindings))
}
