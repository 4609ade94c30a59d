use super::{check_len, parse_id, ApiResult, AppState};
use crate::service::Festival;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct FestivalRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl FestivalRequest {
    fn validate(&self) -> ApiResult<()> {
        check_len("name", &self.name, 1, 100)
    }
}

#[derive(Debug, Serialize)]
pub struct FestivalListResponse {
    pub festivals: Vec<Festival>,
}

#[instrument(skip(state))]
pub(super) async fn create_festival(
    State(state): State<AppState>,
    Json(request): Json<FestivalRequest>,
) -> ApiResult<(StatusCode, Json<Festival>)> {
    request.validate()?;
    let festival = state
        .catalog
        .festivals
        .create(request.name, request.description)
        .await?;
    Ok((StatusCode::CREATED, Json(festival)))
}

pub(super) async fn list_festivals(
    State(state): State<AppState>,
) -> ApiResult<Json<FestivalListResponse>> {
    let festivals = state.catalog.festivals.list().await?;
    Ok(Json(FestivalListResponse { festivals }))
}

pub(super) async fn get_festival(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Festival>> {
    let festival = state.catalog.festivals.get(parse_id(&id)?).await?;
    Ok(Json(festival))
}

#[instrument(skip(state))]
pub(super) async fn edit_festival(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<FestivalRequest>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    request.validate()?;
    state
        .catalog
        .festivals
        .edit(id, &request.name, &request.description)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deletes the festival together with every poster and poster image
#[instrument(skip(state))]
pub(super) async fn delete_festival(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.catalog.festivals.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
