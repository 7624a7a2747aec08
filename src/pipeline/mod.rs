//! Pipeline stages for invoice extraction.
//!
//! Each submodule implements one transformation step, so each is testable on
//! its own and the PDF backend or model provider can change without touching
//! the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render/density ──▶ enhance ──▶ encode ──▶ llm ──▶ json
//! (URL/path) (pdfium)          (images)    (base64)   (VLM)   (parse)
//! ```
//!
//! 1. [`input`]  : load a local file or download a URL into memory
//! 2. [`render`] : rasterise PDF pages and collect their text layout
//! 3. [`density`]: text-block area / page area; scanned vs digital
//! 4. [`enhance`]: binarise photographed or scanned images
//! 5. [`encode`] : JPEG + base64 page images for the request body
//! 6. [`llm`]    : one model call per cycle, behind [`llm::ModelClient`]
//! 7. [`json`]   : pull the JSON object out of the model's text

pub mod density;
pub mod encode;
pub mod enhance;
pub mod input;
pub mod json;
pub mod llm;
pub mod render;
