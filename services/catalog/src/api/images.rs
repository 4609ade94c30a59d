use super::{ApiError, ApiResult, AppState};
use crate::asset::AssetId;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::instrument;

/// Identifiers never change content, so clients may cache forever
const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Stream an image, served from the local cache when possible
#[instrument(skip(state))]
pub(super) async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = AssetId::parse(&id).map_err(|_| ApiError::not_found("Image not found"))?;
    let asset = state.assets.get(&id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, asset.content_type),
            (header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL),
        ],
        Body::from_stream(asset.into_stream()),
    )
        .into_response())
}
