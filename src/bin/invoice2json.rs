//! CLI binary for edgequake-invoice.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractorConfig` and prints JSON results on stdout.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Args, Parser, Subcommand};
use edgequake_invoice::{
    document, extract_and_validate, extract_invoice, ExtractorConfig, InvoiceModels,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract structured data from a PDF or image
  invoice2json extract invoice.pdf

  # Extract and check eligibility against a rules document
  invoice2json validate --rules rules.txt https://example.com/invoice.jpg

  # Dump the page images sent to the model (no API key needed)
  invoice2json images scan.pdf --output-dir pages/

  # Text density of a PDF (no API key needed)
  invoice2json density invoice.pdf

  # Run the HTTP service
  invoice2json serve --port 8000

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY            OpenAI API key (OPENAI_KEY is accepted too)
  INVOICE_PROVIDER          Provider name (openai, anthropic, gemini, ollama)
  INVOICE_EXTRACTION_MODEL  Vision model for extraction
  INVOICE_VALIDATION_MODEL  Text model for validation
  INVOICE_RULES_PATH        Rules document used by validate and serve
  PDFIUM_LIB_PATH           Path to libpdfium

A .env file in the working directory is loaded on start-up.
"#;

/// Extract and validate invoice data with Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "invoice2json",
    version,
    about = "Extract and validate invoice data from PDFs and images using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    opts: GlobalOpts,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(long, global = true, env = "INVOICE_PROVIDER", default_value = "openai")]
    provider: String,

    /// Vision model used for extraction.
    #[arg(long, global = true, env = "INVOICE_EXTRACTION_MODEL", default_value = "gpt-4o")]
    extraction_model: String,

    /// Text model used for validation.
    #[arg(long, global = true, env = "INVOICE_VALIDATION_MODEL", default_value = "gpt-4o-mini")]
    validation_model: String,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, global = true, env = "INVOICE_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Run the enhancement filter on pages of scanned PDFs.
    #[arg(long, global = true, env = "INVOICE_ENHANCE_SCANNED")]
    enhance_scanned: bool,

    /// Quantity the validator expects on eligible invoices.
    #[arg(long, global = true, env = "INVOICE_EXPECTED_QUANTITY", default_value_t = 4)]
    expected_quantity: u32,

    /// Max LLM output tokens per call.
    #[arg(long, global = true, env = "INVOICE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Do not request a JSON-object response format.
    #[arg(long, global = true)]
    no_structured_output: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "INVOICE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to libpdfium.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "INVOICE_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, global = true, env = "INVOICE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract structured invoice data as JSON.
    Extract {
        /// Local file path or HTTP/HTTPS URL (.pdf, .jpg, .jpeg, .png).
        input: String,
    },
    /// Extract, then check the result against a rules document.
    Validate {
        /// Local file path or HTTP/HTTPS URL.
        input: String,

        /// Rules document with eligible products and promotion dates.
        #[arg(long, env = "INVOICE_RULES_PATH")]
        rules: PathBuf,
    },
    /// Print the base64 page images, or write them as JPEG files.
    Images {
        /// Local file path or HTTP/HTTPS URL.
        input: String,

        /// Write page-N.jpg files here instead of printing base64.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Report page count and text density of a PDF.
    Density {
        /// Local PDF path or HTTP/HTTPS URL.
        input: String,
    },
    /// Run the HTTP service.
    #[cfg(feature = "server")]
    Serve {
        #[arg(long, env = "INVOICE_HOST", default_value = "0.0.0.0")]
        host: std::net::IpAddr,

        #[arg(long, env = "PORT", default_value_t = 8000)]
        port: u16,

        /// Rules document; responses include a verdict when set.
        #[arg(long, env = "INVOICE_RULES_PATH")]
        rules: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.opts.verbose {
        "debug"
    } else if cli.opts.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = build_config(&cli.opts)?;

    match cli.command {
        Command::Extract { input } => {
            let models = InvoiceModels::from_config(&config)?;
            let record = extract_invoice(&[input.as_str()], &models, &config)
                .await
                .with_context(|| format!("Extraction failed for {input}"))?;
            print_json(&record)?;
        }
        Command::Validate { input, rules } => {
            config.rules_path = Some(rules);
            let models = InvoiceModels::from_config(&config)?;
            let report = extract_and_validate(&input, &models, &config)
                .await
                .with_context(|| format!("Validation failed for {input}"))?;
            print_json(&report)?;
            if !report.is_eligible() {
                eprintln!("Invoice is not eligible");
            }
        }
        Command::Images { input, output_dir } => {
            let images = document::extract_images_base64(&input, &config)
                .await
                .with_context(|| format!("Image extraction failed for {input}"))?;
            match output_dir {
                Some(dir) => write_images(&dir, &images).await?,
                None => {
                    let stdout = io::stdout();
                    let mut handle = stdout.lock();
                    for img in &images {
                        writeln!(handle, "{img}")?;
                    }
                }
            }
        }
        Command::Density { input } => {
            let doc = edgequake_invoice::pipeline::input::resolve_input(
                &input,
                config.download_timeout_secs,
            )
            .await?;
            let summary = document::inspect_pdf(doc, &config)
                .await
                .with_context(|| format!("Could not analyse {input}"))?;
            println!("Pages:        {}", summary.page_count);
            println!("Text density: {:.4}", summary.text_density);
            println!("Class:        {:?}", summary.class);
        }
        #[cfg(feature = "server")]
        Command::Serve { host, port, rules } => {
            if rules.is_some() {
                config.rules_path = rules;
            }
            let models = InvoiceModels::from_config(&config)?;
            let state = std::sync::Arc::new(edgequake_invoice::server::AppState::new(config, models));
            edgequake_invoice::server::serve(std::net::SocketAddr::new(host, port), state)
                .await
                .context("HTTP server failed")?;
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractorConfig`.
fn build_config(opts: &GlobalOpts) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder()
        .provider_name(opts.provider.clone())
        .extraction_model(opts.extraction_model.clone())
        .validation_model(opts.validation_model.clone())
        .render_dpi(opts.dpi)
        .enhance_scanned_pdfs(opts.enhance_scanned)
        .expected_quantity(opts.expected_quantity)
        .max_tokens(opts.max_tokens)
        .structured_output(!opts.no_structured_output)
        .download_timeout_secs(opts.download_timeout);

    if let Some(ref path) = opts.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Ok(path) = std::env::var(edgequake_invoice::config::RULES_PATH_ENV) {
        if !path.trim().is_empty() {
            builder = builder.rules_path(path);
        }
    }

    builder.build().context("Invalid configuration")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise result")?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

async fn write_images(dir: &Path, images: &[String]) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {:?}", dir))?;
    for (idx, b64) in images.iter().enumerate() {
        let bytes = STANDARD
            .decode(b64)
            .context("Page image is not valid base64")?;
        let path = dir.join(format!("page-{}.jpg", idx + 1));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}
