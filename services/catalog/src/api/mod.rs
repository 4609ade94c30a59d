//! HTTP surface of the catalog service.

mod festival_stocks;
mod festivals;
mod images;
mod posters;
mod sales;
mod stock_items;

use crate::asset_store::AssetStore;
use crate::config::ApiConfig;
use crate::error::{AssetError, ServiceError};
use crate::repository::Repository;
use crate::service::Catalog;
use anyhow::{Context, Result};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub assets: Arc<AssetStore>,
    pub repo: Arc<dyn Repository>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Handler failure rendered as an [`ErrorResponse`]
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "INVALID_REQUEST",
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: "Internal server error".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err.primary() {
            ServiceError::NotFound => Self::not_found("Resource not found"),
            ServiceError::AlreadyExists => Self {
                status: StatusCode::CONFLICT,
                code: "ALREADY_EXISTS",
                message: "Resource already exists".to_string(),
            },
            ServiceError::InvalidImage(reason) => Self {
                status: StatusCode::BAD_REQUEST,
                code: "INVALID_IMAGE",
                message: format!("Invalid image: {}", reason),
            },
            _ => {
                error!(error = %err, "Request failed");
                Self::internal()
            }
        }
    }
}

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::AssetNotFound(_) => Self::not_found("Image not found"),
            other => {
                error!(error = %other, "Image request failed");
                Self::internal()
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            code: "INVALID_MULTIPART",
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                code: self.code.to_string(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Path identifiers that do not parse cannot name an existing row
pub(crate) fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Resource not found"))
}

/// Check a text field's length in characters
pub(crate) fn check_len(field: &str, value: &str, min: usize, max: usize) -> ApiResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::bad_request(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

/// Text fields and the optional `image` part of a multipart form
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    fields: HashMap<String, String>,
    image: Option<Bytes>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == "image" {
                form.image = Some(field.bytes().await?);
            } else {
                form.fields.insert(name, field.text().await?);
            }
        }
        Ok(form)
    }

    /// Text field, empty when absent
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn take_image(&mut self) -> ApiResult<Bytes> {
        match self.image.take() {
            Some(image) if !image.is_empty() => Ok(image),
            _ => Err(ApiError::bad_request("image is required")),
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/api/v1/images/:id", get(images::get_image))
        .route(
            "/api/v1/festivals",
            get(festivals::list_festivals).post(festivals::create_festival),
        )
        .route(
            "/api/v1/festivals/:id",
            get(festivals::get_festival)
                .put(festivals::edit_festival)
                .delete(festivals::delete_festival),
        )
        .route(
            "/api/v1/festivals/:id/posters",
            get(posters::list_festival_posters),
        )
        .route(
            "/api/v1/festivals/:id/posters/:name",
            get(posters::get_poster_by_name),
        )
        .route("/api/v1/posters", post(posters::create_poster))
        .route(
            "/api/v1/posters/:id",
            get(posters::get_poster)
                .put(posters::edit_poster)
                .delete(posters::delete_poster),
        )
        .route("/api/v1/posters/:id/status", patch(posters::change_status))
        .route("/api/v1/posters/:id/image", put(posters::update_image))
        .route(
            "/api/v1/stock-items",
            get(stock_items::list_stock_items).post(stock_items::create_stock_item),
        )
        .route(
            "/api/v1/stock-items/:id",
            get(stock_items::get_stock_item)
                .put(stock_items::edit_stock_item)
                .delete(stock_items::delete_stock_item),
        )
        .route("/api/v1/stock-items/:id/image", put(stock_items::update_image))
        .route(
            "/api/v1/festivals/:id/stocks",
            get(festival_stocks::list_festival_stocks)
                .post(festival_stocks::register_festival_stock),
        )
        .route(
            "/api/v1/festival-stocks/:id",
            get(festival_stocks::get_festival_stock)
                .delete(festival_stocks::delete_festival_stock),
        )
        .route(
            "/api/v1/festival-stocks/:id/price",
            put(festival_stocks::update_price),
        )
        .route(
            "/api/v1/festival-stocks/:id/sales",
            get(sales::list_stock_sales),
        )
        .route("/api/v1/sales", get(sales::list_sales).post(sales::create_sale))
        .route(
            "/api/v1/sales/:id",
            get(sales::get_sale).delete(sales::delete_sale),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "catalog-service"
    }))
}

async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": "connected"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}

/// Serve the API until `shutdown` resolves
pub async fn start_api_server(
    state: AppState,
    config: &ApiConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting catalog API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;

    Ok(())
}
