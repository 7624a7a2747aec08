//! Text-density estimation: is a PDF scanned or digitally authored?
//!
//! A digitally authored PDF carries a text layer whose segments cover a good
//! share of each page. A scanned PDF is one big image per page with little or
//! no text layer. The ratio of text-block area to page area separates the two
//! cheaply, without rendering anything.
//!
//! The arithmetic here is independent of pdfium: [`crate::pipeline::render`]
//! turns each pdfium page into a [`PageLayout`] and this module does the rest.

use serde::{Deserialize, Serialize};

/// Bounding box of one text block, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBlock {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl TextBlock {
    pub fn area(&self) -> f64 {
        let w = (self.right - self.left).abs() as f64;
        let h = (self.top - self.bottom).abs() as f64;
        w * h
    }
}

/// Page size plus the text blocks found by layout analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub text_blocks: Vec<TextBlock>,
}

impl PageLayout {
    pub fn page_area(&self) -> f64 {
        (self.width.abs() as f64) * (self.height.abs() as f64)
    }

    pub fn text_area(&self) -> f64 {
        self.text_blocks.iter().map(TextBlock::area).sum()
    }
}

/// Ratio of total text-block area to total page area across all pages.
///
/// Returns 0 for an empty document or a zero total page area. Overlapping
/// blocks can push the raw sum past the page area, so the result is clamped
/// to 1.
pub fn text_density(pages: &[PageLayout]) -> f32 {
    let page_area: f64 = pages.iter().map(PageLayout::page_area).sum();
    if page_area <= 0.0 {
        return 0.0;
    }
    let text_area: f64 = pages.iter().map(PageLayout::text_area).sum();
    (text_area / page_area).clamp(0.0, 1.0) as f32
}

/// Scanned-vs-digital classification derived from the text density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfClass {
    /// Image-based: little or no text layer.
    Scanned,
    /// Text-based: searchable text covers the pages.
    Digital,
}

impl PdfClass {
    pub fn classify(density: f32, threshold: f32) -> Self {
        if density < threshold {
            PdfClass::Scanned
        } else {
            PdfClass::Digital
        }
    }
}
