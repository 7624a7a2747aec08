//! HTTP service exposing extraction and validation.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST | `/extract-validate` | `{"file_url", "rebate_program_number"}` | `{"Invoice Extraction": …, "Validation"?: …}` |
//! | POST | `/health-check` | none | `{"status": "OK", "message": "Service is running"}` |
//!
//! Failures answer `{"detail": "…"}`: 400 when the download fails, 500 when
//! extraction or validation fails, 422 for a `file_url` that is not an
//! http(s) URL.

use crate::config::ExtractorConfig;
use crate::error::InvoiceError;
use crate::pipeline::input;
use crate::pipeline::llm::InvoiceModels;
use crate::validate::{extract_and_validate_document, InvoiceReport};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared, read-only state for every request.
pub struct AppState {
    pub config: ExtractorConfig,
    pub models: InvoiceModels,
}

impl AppState {
    pub fn new(config: ExtractorConfig, models: InvoiceModels) -> Self {
        Self { config, models }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub file_url: String,
    pub rebate_program_number: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid file_url: {0}")]
    InvalidUrl(String),

    #[error("Error downloading file: {0}")]
    Download(InvoiceError),

    #[error("Extraction error: {0}")]
    Extraction(InvoiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidUrl(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Download(_) => StatusCode::BAD_REQUEST,
            ApiError::Extraction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("{}", self);
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/extract-validate", post(extract_validate))
        .route("/health-check", post(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting invoice service on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Service is running".to_string(),
    })
}

async fn extract_validate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<InvoiceReport>, ApiError> {
    info!(
        "Received extract request for program: {}",
        req.rebate_program_number
    );

    let url = req.file_url.trim();
    let scheme_ok = reqwest::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if !scheme_ok {
        return Err(ApiError::InvalidUrl(req.file_url.clone()));
    }

    let document = input::fetch(url, state.config.download_timeout_secs)
        .await
        .map_err(ApiError::Download)?;

    let report = extract_and_validate_document(document, &state.models, &state.config)
        .await
        .map_err(ApiError::Extraction)?;

    info!(
        "Extraction completed for Invoice: {}",
        req.rebate_program_number
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{ModelClient, ModelReply, ModelRequest};
    use axum::body::Body;
    use axum::http::Request;
    use futures::future::BoxFuture;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    struct Unused;

    impl ModelClient for Unused {
        fn model(&self) -> &str {
            "unused"
        }

        fn invoke<'a>(
            &'a self,
            _request: &'a ModelRequest,
        ) -> BoxFuture<'a, Result<ModelReply, InvoiceError>> {
            Box::pin(async { panic!("model must not be called") })
        }
    }

    fn app() -> Router {
        let models = InvoiceModels::new(Arc::new(Unused), Arc::new(Unused));
        router(Arc::new(AppState::new(ExtractorConfig::default(), models)))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_check_reports_ok() {
        let response = app()
            .oneshot(Request::post("/health-check").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            HealthResponse {
                status: "OK".into(),
                message: "Service is running".into()
            }
        );
    }

    #[tokio::test]
    async fn malformed_url_is_unprocessable() {
        let (status, body) = post_json(
            app(),
            "/extract-validate",
            json!({"file_url": "not a url", "rebate_program_number": "R-1"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("not a url"));
    }

    #[tokio::test]
    async fn missing_field_is_unprocessable() {
        let (status, _) = post_json(
            app(),
            "/extract-validate",
            json!({"file_url": "https://example.com/a.pdf"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn download_failure_is_bad_request() {
        let (status, body) = post_json(
            app(),
            "/extract-validate",
            json!({"file_url": "http://127.0.0.1:9/invoice.pdf", "rebate_program_number": "R-1"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Error downloading file:"));
    }
}
