use super::{check_len, parse_id, ApiError, ApiResult, AppState, UploadForm};
use crate::repository::PosterStatus;
use crate::service::{Poster, PosterDraft};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

const MAX_NAME_CHARS: usize = 64;
const MAX_DESCRIPTION_CHARS: usize = 1024;

fn validate_poster(name: &str, description: &str) -> ApiResult<()> {
    check_len("name", name, 1, MAX_NAME_CHARS)?;
    check_len("description", description, 0, MAX_DESCRIPTION_CHARS)
}

#[derive(Debug, Deserialize)]
pub struct EditPosterRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct PosterListResponse {
    pub posters: Vec<Poster>,
}

/// Multipart fields: `festival_id`, `name`, `description`, `image`
#[instrument(skip(state, multipart))]
pub(super) async fn create_poster(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Poster>)> {
    let mut form = UploadForm::read(multipart).await?;

    let festival_id = uuid::Uuid::parse_str(&form.text("festival_id"))
        .map_err(|_| ApiError::bad_request("festival_id must be a UUID"))?;
    let draft = PosterDraft {
        festival_id,
        name: form.text("name"),
        description: form.text("description"),
    };
    validate_poster(&draft.name, &draft.description)?;
    let image = form.take_image()?;

    let poster = state.catalog.posters.create(draft, image).await?;
    Ok((StatusCode::CREATED, Json(poster)))
}

pub(super) async fn get_poster(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Poster>> {
    let poster = state.catalog.posters.get(parse_id(&id)?).await?;
    Ok(Json(poster))
}

pub(super) async fn list_festival_posters(
    State(state): State<AppState>,
    Path(festival_id): Path<String>,
) -> ApiResult<Json<PosterListResponse>> {
    let posters = state
        .catalog
        .posters
        .get_by_festival(parse_id(&festival_id)?)
        .await?;
    Ok(Json(PosterListResponse { posters }))
}

pub(super) async fn get_poster_by_name(
    State(state): State<AppState>,
    Path((festival_id, name)): Path<(String, String)>,
) -> ApiResult<Json<Poster>> {
    let poster = state
        .catalog
        .posters
        .get_by_name(parse_id(&festival_id)?, &name)
        .await?;
    Ok(Json(poster))
}

#[instrument(skip(state))]
pub(super) async fn edit_poster(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<EditPosterRequest>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    validate_poster(&request.name, &request.description)?;
    state
        .catalog
        .posters
        .edit(id, &request.name, &request.description)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub(super) async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let status: PosterStatus = request
        .status
        .parse()
        .map_err(|e: crate::repository::UnknownPosterStatus| ApiError::bad_request(e.to_string()))?;
    state.catalog.posters.change_status(id, status).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Multipart field: `image`
#[instrument(skip(state, multipart))]
pub(super) async fn update_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let image = UploadForm::read(multipart).await?.take_image()?;
    state.catalog.posters.update_image(id, image).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub(super) async fn delete_poster(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.catalog.posters.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
