//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use edgequake_invoice::{InvoiceError, ModelClient, ModelReply, ModelRequest};
use futures::future::BoxFuture;
use lopdf::{content::Content, content::Operation, dictionary, Dictionary, Document, Object, Stream};
use std::sync::{Arc, Mutex};

/// Model client that answers every request with the same text and records
/// what it was asked.
pub struct CannedModel {
    name: String,
    reply: String,
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl CannedModel {
    pub fn new(name: &str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ModelClient for CannedModel {
    fn model(&self) -> &str {
        &self.name
    }

    fn invoke<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> BoxFuture<'a, Result<ModelReply, InvoiceError>> {
        self.requests.lock().unwrap().push(request.clone());
        let content = self.reply.clone();
        Box::pin(async move {
            Ok(ModelReply {
                content,
                input_tokens: 100,
                output_tokens: 50,
            })
        })
    }
}

pub const DYNPRO_EXTRACTION: &str = r#"{
  "Invoice": {
    "InvoiceData": {"InvoiceNumber": "112233", "InvoiceDate": "02/15/2024"},
    "Product": [
      {"ProductDescription": "DYNPRO HTRH12 265/70R17", "Quantity": "4"}
    ],
    "CustomerInformation": {"FirstName": "Jane", "LastName": "Doe", "Address": "1 Main St"},
    "StoreInformation": {"StoreName": "Tire Town", "Address": "9 Oak Ave"}
  }
}"#;

pub const ALL_TRUE_VERDICT: &str =
    r#"{"Product description": "True", "purchase_date": "True", "quantity": "True"}"#;

pub const DYNPRO_RULES: &str = "Eligible products:\n- DYNPRO HTRH12\n\nPromotion dates: 01/01/2024 - 03/31/2024\nQuantity: 4 tires\n";

/// A small photographed-receipt lookalike encoded as JPEG.
pub fn receipt_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_fn(120, 80, |x, y| {
        if y % 10 < 2 && x > 10 && x < 110 {
            image::Rgb([20, 20, 20])
        } else {
            image::Rgb([235, 230, 220])
        }
    });
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

/// A US-letter PDF with one line of Helvetica text per page.
pub fn text_pdf(num_pages: u32) -> Vec<u8> {
    build_pdf(&vec![PdfPage::Text; num_pages as usize])
}

/// Text page, full-page grey image with no text layer, then another text page.
pub fn mixed_pdf() -> Vec<u8> {
    build_pdf(&[PdfPage::Text, PdfPage::Image, PdfPage::Text])
}

#[derive(Clone, Copy)]
enum PdfPage {
    Text,
    Image,
}

fn build_pdf(pages: &[PdfPage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let (width, height) = (64u32, 64u32);
    let pixels: Vec<u8> = (0..width * height).map(|i| (i % 251) as u8).collect();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        pixels,
    ));
    let text_resources = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let image_resources = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im1" => image_id },
    });

    let mut page_ids = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        let (operations, resources_id) = match page {
            PdfPage::Text => (
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![100.into(), 700.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Invoice page {}", i + 1))],
                    ),
                    Operation::new("ET", vec![]),
                ],
                text_resources,
            ),
            PdfPage::Image => (
                vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![612.into(), 0.into(), 0.into(), 792.into(), 0.into(), 0.into()],
                    ),
                    Operation::new("Do", vec!["Im1".into()]),
                    Operation::new("Q", vec![]),
                ],
                image_resources,
            ),
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => pages.len() as i64,
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Whether the pdfium shared library can be bound. Prints a SKIP line when
/// it cannot, so PDF tests can return early.
pub fn pdfium_available() -> bool {
    match edgequake_invoice::pipeline::render::bind_pdfium(None) {
        Ok(_) => true,
        Err(e) => {
            eprintln!("SKIP: pdfium not available ({e})");
            false
        }
    }
}
