//! Configuration types for invoice extraction and validation.
//!
//! All behaviour is controlled through [`ExtractorConfig`], built via its
//! [`ExtractorConfigBuilder`] or read from the process environment with
//! [`ExtractorConfig::from_env`]. The config is plain data: it names models
//! and files but holds no clients. Clients are built from it once per process
//! (see [`crate::pipeline::llm::InvoiceModels`]) and passed explicitly.

use crate::error::InvoiceError;
use std::path::PathBuf;

/// Environment variable naming the rules document.
pub const RULES_PATH_ENV: &str = "INVOICE_RULES_PATH";

/// Configuration for an extract/validate run.
///
/// # Example
/// ```rust
/// use edgequake_invoice::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .extraction_model("gpt-4o")
///     .rules_path("rules/eligible_products.txt")
///     .expected_quantity(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.render_dpi, 72);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// LLM provider name passed to `ProviderFactory`. Default: "openai".
    pub provider_name: String,

    /// Vision model used for extraction. Default: "gpt-4o".
    pub extraction_model: String,

    /// Text model used for validation. Default: "gpt-4o-mini".
    pub validation_model: String,

    /// Sampling temperature. `None` keeps the provider default.
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Ask the extraction model for a JSON-object response. Default: true.
    ///
    /// Providers that do not support response formats ignore the hint; the
    /// brace-scanning parser handles their free-form answers.
    pub structured_output: bool,

    /// Rasterisation DPI for PDF pages. Range: 72–400. Default: 72 (one
    /// pixel per PDF point).
    pub render_dpi: u32,

    /// Maximum rendered image dimension in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Text-density ratio below which a PDF counts as scanned. Default: 0.5.
    pub scanned_threshold: f32,

    /// Run the enhancement filter on pages of PDFs classified as scanned.
    /// Default: false (scanned and digital PDFs render identically).
    pub enhance_scanned_pdfs: bool,

    /// JPEG quality for encoded page images. Range: 1–100. Default: 95.
    pub jpeg_quality: u8,

    /// Path to the rules document used by validation.
    pub rules_path: Option<PathBuf>,

    /// Quantity the validator expects on eligible invoices. Default: 4.
    pub expected_quantity: u32,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Explicit pdfium shared library. Falls back to `PDFIUM_LIB_PATH`, the
    /// working directory, then the system library path.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider_name: "openai".to_string(),
            extraction_model: "gpt-4o".to_string(),
            validation_model: "gpt-4o-mini".to_string(),
            temperature: None,
            max_tokens: 4096,
            structured_output: true,
            render_dpi: 72,
            max_rendered_pixels: 2000,
            scanned_threshold: 0.5,
            enhance_scanned_pdfs: false,
            jpeg_quality: 95,
            rules_path: None,
            expected_quantity: 4,
            download_timeout_secs: 120,
            pdfium_lib_path: None,
        }
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overlaid with the process environment.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `INVOICE_RULES_PATH` | `rules_path` |
    /// | `INVOICE_PROVIDER` | `provider_name` |
    /// | `INVOICE_EXTRACTION_MODEL` | `extraction_model` |
    /// | `INVOICE_VALIDATION_MODEL` | `validation_model` |
    /// | `PDFIUM_LIB_PATH` | `pdfium_lib_path` |
    pub fn from_env() -> Result<Self, InvoiceError> {
        let mut builder = Self::builder();
        if let Some(path) = env_non_empty(RULES_PATH_ENV) {
            builder = builder.rules_path(path);
        }
        if let Some(name) = env_non_empty("INVOICE_PROVIDER") {
            builder = builder.provider_name(name);
        }
        if let Some(model) = env_non_empty("INVOICE_EXTRACTION_MODEL") {
            builder = builder.extraction_model(model);
        }
        if let Some(model) = env_non_empty("INVOICE_VALIDATION_MODEL") {
            builder = builder.validation_model(model);
        }
        if let Some(path) = env_non_empty("PDFIUM_LIB_PATH") {
            builder = builder.pdfium_lib_path(path);
        }
        builder.build()
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn extraction_model(mut self, model: impl Into<String>) -> Self {
        self.config.extraction_model = model.into();
        self
    }

    pub fn validation_model(mut self, model: impl Into<String>) -> Self {
        self.config.validation_model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn structured_output(mut self, v: bool) -> Self {
        self.config.structured_output = v;
        self
    }

    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.config.render_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn scanned_threshold(mut self, ratio: f32) -> Self {
        self.config.scanned_threshold = ratio;
        self
    }

    pub fn enhance_scanned_pdfs(mut self, v: bool) -> Self {
        self.config.enhance_scanned_pdfs = v;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rules_path = Some(path.into());
        self
    }

    pub fn expected_quantity(mut self, n: u32) -> Self {
        self.config.expected_quantity = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, InvoiceError> {
        let c = &self.config;
        if !(0.0..=1.0).contains(&c.scanned_threshold) {
            return Err(InvoiceError::InvalidConfig(format!(
                "Scanned threshold must be within 0–1, got {}",
                c.scanned_threshold
            )));
        }
        if c.extraction_model.trim().is_empty() || c.validation_model.trim().is_empty() {
            return Err(InvoiceError::InvalidConfig(
                "Model names must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(InvoiceError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractorConfig::default();
        assert_eq!(c.extraction_model, "gpt-4o");
        assert_eq!(c.validation_model, "gpt-4o-mini");
        assert_eq!(c.expected_quantity, 4);
        assert_eq!(c.render_dpi, 72);
        assert!((c.scanned_threshold - 0.5).abs() < f32::EPSILON);
        assert!(!c.enhance_scanned_pdfs);
    }

    #[test]
    fn debug_lists_every_setting() {
        let c = ExtractorConfig::builder()
            .pdfium_lib_path("/opt/pdfium/libpdfium.so")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        for field in [
            "max_rendered_pixels",
            "jpeg_quality",
            "download_timeout_secs",
            "pdfium_lib_path",
            "/opt/pdfium/libpdfium.so",
        ] {
            assert!(dbg.contains(field), "missing {field} in {dbg}");
        }
    }

    #[test]
    fn builder_clamps_values() {
        let c = ExtractorConfig::builder()
            .render_dpi(10)
            .jpeg_quality(0)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.render_dpi, 72);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn builder_rejects_bad_threshold() {
        let err = ExtractorConfig::builder()
            .scanned_threshold(1.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_model() {
        assert!(ExtractorConfig::builder()
            .validation_model("  ")
            .build()
            .is_err());
    }
}
