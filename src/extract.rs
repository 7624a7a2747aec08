//! Extraction cycle: one document in, one [`ExtractedRecord`] out.
//!
//! The document's page images and the fixed extraction prompt travel to the
//! vision model in a single multimodal message. The model is called exactly
//! once; its text is handed to [`extract_json_object`] unchanged.

use crate::config::ExtractorConfig;
use crate::document::{extract_page_images, Document};
use crate::error::InvoiceError;
use crate::pipeline::input;
use crate::pipeline::json::extract_json_object;
use crate::pipeline::llm::{InvoiceModels, ModelRequest};
use crate::prompts::extraction_prompt;
use crate::schema::ExtractedRecord;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info};

/// Extract structured invoice data from exactly one local path or URL.
///
/// # Errors
/// - [`InvoiceError::InvalidArguments`] unless exactly one path is given
/// - [`InvoiceError::FileNotFound`] for a missing local path
/// - anything [`extract_from_document`] returns
pub async fn extract_invoice<S: AsRef<str>>(
    paths: &[S],
    models: &InvoiceModels,
    config: &ExtractorConfig,
) -> Result<ExtractedRecord, InvoiceError> {
    let [path] = paths else {
        error!("Expected exactly one document path, got {}", paths.len());
        return Err(InvoiceError::InvalidArguments { count: paths.len() });
    };

    let document = input::resolve_input(path.as_ref(), config.download_timeout_secs).await?;
    extract_from_document(document, models, config).await
}

/// Extract structured invoice data from a document already in memory.
pub async fn extract_from_document(
    document: Document,
    models: &InvoiceModels,
    config: &ExtractorConfig,
) -> Result<ExtractedRecord, InvoiceError> {
    let start = Instant::now();
    let origin = document.origin().to_string();
    info!("Starting extraction: {}", origin);

    let images = extract_page_images(document, config).await?;
    if images.is_empty() {
        error!("No images extracted from '{}'", origin);
        return Err(InvoiceError::NoImages { origin });
    }

    let request = ModelRequest::text(extraction_prompt())
        .with_images(images)
        .json_response(config.structured_output);

    let reply = models.extractor.invoke(&request).await?;
    debug!("Raw extraction response: {}", reply.content);

    let object = extract_json_object(&reply.content).inspect_err(|e| {
        error!("Could not parse extraction response: {}", e);
    })?;

    info!(
        "Extraction complete: {} in {:?} ({} in / {} out tokens)",
        origin,
        start.elapsed(),
        reply.input_tokens,
        reply.output_tokens
    );
    Ok(ExtractedRecord(Value::Object(object)))
}
