//! Error types for the edgequake-invoice library.
//!
//! Every fallible operation returns [`InvoiceError`]. The variants are grouped
//! by [`ErrorKind`] so outer layers (the CLI exit path, the HTTP service) can
//! map a failure to "the caller sent something bad", "the file is missing",
//! or "the model side broke" without matching on every variant.
//!
//! Parsing failures carry the raw model text they choked on. Model output is
//! the one input we never control, and the raw text is the only useful clue
//! when a prompt regresses.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`InvoiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Download or URL problems: the caller supplied something unreachable.
    Transport,
    /// Unsupported, corrupt, or unparseable data.
    Value,
    /// A required local file does not exist or cannot be read.
    NotFound,
    /// The model provider, pdfium, or an internal step failed.
    Model,
}

/// All errors returned by the edgequake-invoice library.
#[derive(Debug, Error)]
pub enum InvoiceError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// Extraction was called with the wrong number of documents.
    #[error("Exactly one document path should be provided, got {count}")]
    InvalidArguments { count: usize },

    // ── Document errors ───────────────────────────────────────────────────
    /// The file extension is not one of pdf, jpg, jpeg, png.
    #[error("Unsupported file type: '{extension}'")]
    UnsupportedFileType { extension: String },

    /// Image bytes could not be decoded or encoded.
    #[error("Invalid image from '{origin}': {detail}")]
    CorruptImage { origin: String, detail: String },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{origin}' is corrupt: {detail}")]
    CorruptPdf { origin: String, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The document produced no page images at all.
    #[error("No images found in document '{origin}'")]
    NoImages { origin: String },

    // ── Rules errors ──────────────────────────────────────────────────────
    /// The rules document does not exist.
    #[error("Rules document not found: '{path}'")]
    RulesNotFound { path: PathBuf },

    /// The rules document exists but contains only whitespace.
    #[error("Rules document is empty: '{path}'")]
    RulesEmpty { path: PathBuf },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model call itself failed (network, quota, rejected request).
    #[error("Model '{model}' call failed: {detail}")]
    ModelCallFailed { model: String, detail: String },

    // ── Response parsing errors ───────────────────────────────────────────
    /// The model answered without any `{ … }` span.
    #[error("No JSON object found in model response:\n{raw}")]
    NoJsonFound { raw: String },

    /// A `{ … }` span was found but it is not valid JSON.
    #[error("Failed to parse JSON from model response: {detail}\nResponse was:\n{raw}")]
    InvalidJson { detail: String, raw: String },

    /// The validator answered with JSON missing one of the verdict keys.
    #[error("Key '{key}' missing in validator response JSON: {raw}")]
    MissingVerdictKey { key: String, raw: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library in the working directory."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InvoiceError {
    /// Classify the error for callers that only care about the broad category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvoiceError::InvalidInput { .. }
            | InvoiceError::DownloadFailed { .. }
            | InvoiceError::DownloadTimeout { .. } => ErrorKind::Transport,

            InvoiceError::FileNotFound { .. }
            | InvoiceError::PermissionDenied { .. }
            | InvoiceError::RulesNotFound { .. } => ErrorKind::NotFound,

            InvoiceError::ProviderNotConfigured { .. }
            | InvoiceError::ModelCallFailed { .. }
            | InvoiceError::PdfiumBindingFailed(_)
            | InvoiceError::Internal(_) => ErrorKind::Model,

            InvoiceError::InvalidArguments { .. }
            | InvoiceError::UnsupportedFileType { .. }
            | InvoiceError::CorruptImage { .. }
            | InvoiceError::CorruptPdf { .. }
            | InvoiceError::RasterisationFailed { .. }
            | InvoiceError::NoImages { .. }
            | InvoiceError::RulesEmpty { .. }
            | InvoiceError::NoJsonFound { .. }
            | InvoiceError::InvalidJson { .. }
            | InvoiceError::MissingVerdictKey { .. }
            | InvoiceError::InvalidConfig(_) => ErrorKind::Value,
        }
    }
}
