//! Axum-based HTTP server for the gateway.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, MatchedPath, Multipart, Request, State,
    },
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use metrics_exporter_prometheus::PrometheusHandle;
use planview_core::{
    config::{AppConfig, ModelConfig},
    error::MIB,
    traits::{TransientStore, VisionModel},
    types::{TempHandle, UploadedImage},
    Error, Result,
};
use planview_model_gateway::{ErrorClassifier, GeminiErrorClassifier};

use crate::render::ViewGenerator;
use crate::validator::UploadValidator;
use crate::vision::VisionProcessor;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Room left in the request body for multipart framing around the file.
const MULTIPART_OVERHEAD: u64 = MIB;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Enable CORS.
    pub enable_cors: bool,
    /// Enable request tracing.
    pub enable_tracing: bool,
    /// Largest accepted image, in bytes.
    pub max_file_size: u64,
    /// Accepted image extensions.
    pub allowed_extensions: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let upload = planview_core::config::UploadConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
            enable_tracing: true,
            max_file_size: upload.max_file_size,
            allowed_extensions: upload.allowed_extensions,
        }
    }
}

impl GatewayConfig {
    /// Derive the gateway settings from the application configuration.
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            enable_cors: true,
            enable_tracing: true,
            max_file_size: config.upload.max_file_size,
            allowed_extensions: config.upload.allowed_extensions.clone(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub validator: UploadValidator,
    pub store: Arc<dyn TransientStore>,
    pub vision: VisionProcessor,
    pub generator: ViewGenerator,
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn TransientStore>,
        model: Arc<dyn VisionModel>,
        models: &ModelConfig,
    ) -> Self {
        let classifier: Arc<dyn ErrorClassifier> = Arc::new(GeminiErrorClassifier);
        let state = AppState {
            validator: UploadValidator::new(&config.allowed_extensions, config.max_file_size),
            store,
            vision: VisionProcessor::new(model.clone(), classifier.clone(), &models.model),
            generator: ViewGenerator::new(model, classifier, &models.image_model, &models.model),
        };
        Self {
            config,
            state: Arc::new(state),
            metrics_handle: None,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let body_limit = (self.config.max_file_size + MULTIPART_OVERHEAD) as usize;

        let mut router = Router::new()
            .route("/", get(index_handler))
            .route("/health", get(health_handler))
            .route("/analyze", post(analyze_handler))
            .route("/generate_3d", post(generate_handler))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        router = router
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(middleware::from_fn(track_metrics));

        if self.config.enable_cors {
            router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));
        }

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::internal(format!("Failed to bind: {}", e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Successful `/analyze` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    /// Bullet-point feedback from the vision model.
    pub feedback: String,
    /// The uploaded image, base64 encoded.
    pub image_data: String,
    /// Handle to pass to `/generate_3d`.
    pub temp_filename: TempHandle,
}

/// `/generate_3d` request.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub temp_filename: Option<String>,
}

/// Successful `/generate_3d` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    /// The 3D view, base64 encoded.
    pub image_data: String,
    pub mime_type: String,
    /// Set when the view is the normalized original rather than a render.
    pub degraded: bool,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error surfaced to HTTP callers as `{ "error": ... }`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "Request failed");
        } else {
            tracing::warn!(kind = self.0.kind(), error = %self.0, "Request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn multipart_error(err: MultipartError, limit: u64) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit }
    } else {
        Error::invalid_request(format!("Malformed upload: {}", err.body_text()))
    }
}

/// Pull the `file` field out of the form as (declared filename, bytes).
async fn read_file_field(
    mut multipart: Multipart,
    limit: u64,
) -> Result<(Option<String>, Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        return Ok((filename, bytes));
    }
    Err(Error::NoFile)
}

/// Validate, store, analyze, and hand back a temp handle for the 3D view.
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<AnalyzeResponse>, ApiError> {
    let outcome = match multipart {
        Ok(multipart) => analyze(&state, multipart).await,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Not a multipart upload");
            Err(Error::NoFile)
        }
    };
    planview_governance::track_upload(match &outcome {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    });
    Ok(Json(outcome?))
}

async fn analyze(state: &AppState, multipart: Multipart) -> Result<AnalyzeResponse> {
    let limit = state.validator.max_file_size();
    let (filename, bytes) = read_file_field(multipart, limit).await?;
    let extension = state.validator.validate(filename.as_deref(), bytes.len() as u64)?;
    let upload = UploadedImage {
        filename: filename.unwrap_or_default(),
        extension,
        bytes,
    };

    tracing::info!(
        filename = %upload.filename,
        extension = %upload.extension,
        size = upload.size(),
        "Upload accepted"
    );

    let stored = state.store.store(&upload.filename, upload.bytes.clone()).await?;

    let result = async {
        let feedback = state.vision.analyze(&upload.bytes).await?;
        let handle = state.store.duplicate(&stored).await?;
        Ok::<_, Error>((feedback, handle))
    }
    .await;

    // Only the temp copy outlives the request.
    state.store.delete(&stored.name).await;
    let (feedback, handle) = result?;

    Ok(AnalyzeResponse {
        success: true,
        feedback,
        image_data: base64::engine::general_purpose::STANDARD.encode(&upload.bytes),
        temp_filename: handle,
    })
}

/// Render the 3D view for a temp handle, consuming it.
async fn generate_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> std::result::Result<Json<GenerateResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| Error::invalid_request(format!("Invalid request body: {}", e.body_text())))?;

    let handle = match request.temp_filename {
        Some(name) if !name.is_empty() => TempHandle::new(name),
        _ => return Err(Error::invalid_request("No image file provided").into()),
    };

    let bytes = match state.store.resolve(&handle).await {
        Ok(bytes) => bytes,
        Err(e @ Error::NotFound(_)) => return Err(e.into()),
        Err(e) => {
            state.store.delete(handle.as_str()).await;
            return Err(e.into());
        }
    };

    let outcome = state.generator.generate(bytes).await;
    state.store.delete(handle.as_str()).await;
    let outcome = outcome?;

    planview_governance::track_render(outcome.path.as_str());
    tracing::info!(
        handle = %handle,
        path = outcome.path.as_str(),
        width = outcome.image.width,
        height = outcome.image.height,
        "3D view generated"
    );

    Ok(Json(GenerateResponse {
        success: true,
        image_data: base64::engine::general_purpose::STANDARD.encode(&outcome.image.bytes),
        mime_type: outcome.image.mime_type.to_string(),
        degraded: outcome.is_degraded(),
    }))
}

/// Record count and latency of every request.
async fn track_metrics(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    planview_governance::track_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_error_status_codes() {
        let response = ApiError(Error::not_found("temp_x.png")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError(Error::PayloadTooLarge { limit: 16 * MIB }).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = ApiError(Error::EmptyResponse).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_index_serves_html() {
        let Html(body) = index_handler().await;
        assert!(body.contains("<form"));
    }
}
