//! Validation cycle and the extract-then-validate entry points.
//!
//! The validation model receives the rules document and the extracted record
//! as plain text and answers with a three-key [`Verdict`]. The rules document
//! is re-read on every call so edits take effect without a restart.

use crate::config::ExtractorConfig;
use crate::document::Document;
use crate::error::InvoiceError;
use crate::extract::{extract_from_document, extract_invoice};
use crate::pipeline::json::extract_json_object;
use crate::pipeline::llm::{InvoiceModels, ModelRequest};
use crate::prompts::validation_prompt;
use crate::schema::{ExtractedRecord, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Plain-text description of eligible products, promotion dates and
/// quantity expectations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesDocument {
    pub path: PathBuf,
    pub text: String,
}

impl RulesDocument {
    /// Read a rules document.
    ///
    /// # Errors
    /// [`InvoiceError::RulesNotFound`] when the file does not exist and
    /// [`InvoiceError::RulesEmpty`] when it holds only whitespace.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, InvoiceError> {
        let path = path.as_ref().to_path_buf();
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                error!("Rules file not found: {}", path.display());
                InvoiceError::RulesNotFound { path: path.clone() }
            }
            std::io::ErrorKind::PermissionDenied => {
                InvoiceError::PermissionDenied { path: path.clone() }
            }
            _ => InvoiceError::Internal(format!(
                "Failed to read rules '{}': {}",
                path.display(),
                e
            )),
        })?;

        if text.trim().is_empty() {
            error!("Rules file is empty: {}", path.display());
            return Err(InvoiceError::RulesEmpty { path });
        }
        debug!("Loaded rules: {} ({} bytes)", path.display(), text.len());
        Ok(Self { path, text })
    }
}

/// Check an extracted record against the rules document at `rules_path`.
pub async fn validate_record(
    record: &ExtractedRecord,
    rules_path: &Path,
    models: &InvoiceModels,
    config: &ExtractorConfig,
) -> Result<Verdict, InvoiceError> {
    let rules = RulesDocument::load(rules_path).await?;
    info!("Validating extracted data against {}", rules.path.display());

    let prompt = validation_prompt(&rules.text, record, config.expected_quantity);
    let reply = models
        .validator
        .invoke(&ModelRequest::text(prompt).json_response(config.structured_output))
        .await?;
    debug!("Raw validation response: {}", reply.content);

    let object = extract_json_object(&reply.content).inspect_err(|e| {
        error!("Could not parse validation response: {}", e);
    })?;
    let verdict = Verdict::from_json(&Value::Object(object))?;
    info!(
        "Validation result: product={}, date={}, quantity={}",
        verdict.product_description, verdict.purchase_date, verdict.quantity
    );
    Ok(verdict)
}

/// Extraction result plus the verdict, when a rules document is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceReport {
    #[serde(rename = "Invoice Extraction")]
    pub extraction: ExtractedRecord,
    #[serde(rename = "Validation", skip_serializing_if = "Option::is_none", default)]
    pub validation: Option<Verdict>,
}

impl InvoiceReport {
    /// True when a verdict exists and every check passed.
    pub fn is_eligible(&self) -> bool {
        self.validation.as_ref().is_some_and(Verdict::is_eligible)
    }
}

/// Extract from a path or URL, then validate when `config.rules_path` is set.
pub async fn extract_and_validate(
    input: &str,
    models: &InvoiceModels,
    config: &ExtractorConfig,
) -> Result<InvoiceReport, InvoiceError> {
    let extraction = extract_invoice(&[input], models, config).await?;
    finish_report(extraction, models, config).await
}

/// [`extract_and_validate`] for a document already in memory.
pub async fn extract_and_validate_document(
    document: Document,
    models: &InvoiceModels,
    config: &ExtractorConfig,
) -> Result<InvoiceReport, InvoiceError> {
    let extraction = extract_from_document(document, models, config).await?;
    finish_report(extraction, models, config).await
}

async fn finish_report(
    extraction: ExtractedRecord,
    models: &InvoiceModels,
    config: &ExtractorConfig,
) -> Result<InvoiceReport, InvoiceError> {
    let validation = match &config.rules_path {
        Some(rules) => Some(validate_record(&extraction, rules, models, config).await?),
        None => {
            debug!("No rules document configured; skipping validation");
            None
        }
    };
    Ok(InvoiceReport {
        extraction,
        validation,
    })
}

/// Synchronous wrapper around [`extract_and_validate`].
///
/// Creates a temporary tokio runtime. Do not call from inside an existing
/// async runtime; use [`extract_and_validate`] there instead.
pub fn extract_and_validate_sync(
    input: &str,
    models: &InvoiceModels,
    config: &ExtractorConfig,
) -> Result<InvoiceReport, InvoiceError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| InvoiceError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    rt.block_on(extract_and_validate(input, models, config))
}
