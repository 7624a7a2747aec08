//! Input resolution: turn a user-supplied path or URL into an owned
//! [`Document`].
//!
//! Remote documents are downloaded straight into memory and handed on as a
//! byte buffer. pdfium loads PDFs from bytes and `image` decodes from bytes,
//! so nothing is spooled to disk and there is no temporary file to clean up
//! on any exit path.

use crate::document::{Document, Origin};
use crate::error::InvoiceError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    let lower = input.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve the input string to a loaded [`Document`].
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<Document, InvoiceError> {
    if is_url(input) {
        fetch(input.trim(), timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

/// Read a local file, mapping I/O failures onto the error taxonomy.
pub async fn load_local(path: &Path) -> Result<Document, InvoiceError> {
    let path: PathBuf = path.to_path_buf();
    if !path.exists() {
        error!("Document not found: {}", path.display());
        return Err(InvoiceError::FileNotFound { path });
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => InvoiceError::PermissionDenied { path: path.clone() },
        std::io::ErrorKind::NotFound => InvoiceError::FileNotFound { path: path.clone() },
        _ => InvoiceError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;

    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    let extension = extension_of(&path.to_string_lossy());
    Ok(Document::new(bytes, extension, Origin::Local(path)))
}

/// Download a URL into memory.
///
/// Non-2xx responses are transport errors. The document type is taken from
/// the extension of the URL path, query string excluded.
pub async fn fetch(url: &str, timeout_secs: u64) -> Result<Document, InvoiceError> {
    info!("Downloading file from URL: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| InvoiceError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InvoiceError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(parsed.clone()).send().await.map_err(|e| {
        error!("Error downloading file: {}", e);
        if e.is_timeout() {
            InvoiceError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            InvoiceError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        error!("Error downloading file: HTTP {}", response.status());
        return Err(InvoiceError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| InvoiceError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes from {}", bytes.len(), url);
    let extension = extension_of(parsed.path());
    Ok(Document::new(
        bytes.to_vec(),
        extension,
        Origin::Remote(url.to_string()),
    ))
}

/// Lower-cased extension including the leading dot, or "" when absent.
pub fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(is_url("HTTPS://EXAMPLE.COM/INVOICE.PDF"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/tmp/Invoice.PDF"), ".pdf");
        assert_eq!(extension_of("/files/scan.jpeg"), ".jpeg");
        assert_eq!(extension_of("/files/archive.tar.gz"), ".gz");
        assert_eq!(extension_of("/files/noext"), "");
        assert_eq!(extension_of(""), "");
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found() {
        let err = load_local(Path::new("/definitely/not/here/invoice.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::FileNotFound { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn local_file_keeps_bytes_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.PNG");
        std::fs::write(&path, b"not really a png").unwrap();

        let doc = load_local(&path).await.unwrap();
        assert_eq!(doc.bytes(), b"not really a png");
        assert_eq!(doc.extension(), ".png");
        assert!(matches!(doc.origin(), Origin::Local(p) if p == &path));
    }

    #[tokio::test]
    async fn unreachable_host_is_download_failure() {
        // Port 9 (discard) on localhost is closed in test environments.
        let err = fetch("http://127.0.0.1:9/invoice.pdf", 5).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Transport, "got: {err}");
    }
}
