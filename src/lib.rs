//! # edgequake-invoice
//!
//! Extract structured invoice data from PDFs and images using Vision
//! Language Models, then check it against a plain-text rules document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / JPEG / PNG (path or URL)
//!  │
//!  ├─ 1. Input     read the file or download it into memory
//!  ├─ 2. Density   text-block area / page area → scanned or digital
//!  ├─ 3. Render    rasterise PDF pages via pdfium (spawn_blocking)
//!  ├─ 4. Enhance   binarise photographed invoices (blur, threshold, open, dilate)
//!  ├─ 5. Encode    JPEG → base64 ImageData
//!  ├─ 6. Extract   one multimodal call → JSON record
//!  └─ 7. Validate  one text call → {"Product description", "purchase_date", "quantity"}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_invoice::{extract_and_validate, ExtractorConfig, InvoiceModels};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractorConfig::builder().rules_path("rules.txt").build()?;
//!     let models = InvoiceModels::from_config(&config)?;
//!     let report = extract_and_validate("invoice.pdf", &models, &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     eprintln!("eligible: {}", report.is_eligible());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `invoice2json` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//! | `server` | on      | Enables [`server`] (axum + tower-http) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod schema;
#[cfg(feature = "server")]
pub mod server;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorConfig, ExtractorConfigBuilder};
pub use document::{extract_images_base64, extract_page_images, Document, DocumentKind, Origin};
pub use error::{ErrorKind, InvoiceError};
pub use extract::{extract_from_document, extract_invoice};
pub use pipeline::encode::PageImage;
pub use pipeline::llm::{InvoiceModels, ModelClient, ModelReply, ModelRequest, ProviderClient};
pub use schema::{ExtractedRecord, InvoiceDocument, Verdict};
pub use validate::{
    extract_and_validate, extract_and_validate_document, extract_and_validate_sync,
    validate_record, InvoiceReport, RulesDocument,
};
