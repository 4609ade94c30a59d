use super::{check_len, parse_id, ApiResult, AppState, UploadForm};
use crate::repository::StockItemChanges;
use crate::service::StockItem;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

fn validate_item(changes: &StockItemChanges) -> ApiResult<()> {
    check_len("name", &changes.name, 1, 100)?;
    check_len("category", &changes.category, 1, 100)
}

#[derive(Debug, Deserialize)]
pub struct StockItemRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl From<StockItemRequest> for StockItemChanges {
    fn from(r: StockItemRequest) -> Self {
        Self {
            name: r.name,
            category: r.category,
            description: r.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StockItemQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockItemListResponse {
    pub items: Vec<StockItem>,
}

/// Multipart fields: `name`, `category`, `description`, `image`
#[instrument(skip(state, multipart))]
pub(super) async fn create_stock_item(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<StockItem>)> {
    let mut form = UploadForm::read(multipart).await?;
    let changes = StockItemChanges {
        name: form.text("name"),
        category: form.text("category"),
        description: form.text("description"),
    };
    validate_item(&changes)?;
    let image = form.take_image()?;

    let item = state.catalog.stock_items.create(changes, image).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state))]
pub(super) async fn list_stock_items(
    State(state): State<AppState>,
    Query(params): Query<StockItemQuery>,
) -> ApiResult<Json<StockItemListResponse>> {
    let category = params.category.filter(|c| !c.is_empty());
    let items = state.catalog.stock_items.query(category).await?;
    Ok(Json(StockItemListResponse { items }))
}

pub(super) async fn get_stock_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StockItem>> {
    let item = state.catalog.stock_items.get(parse_id(&id)?).await?;
    Ok(Json(item))
}

#[instrument(skip(state))]
pub(super) async fn edit_stock_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StockItemRequest>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let changes = StockItemChanges::from(request);
    validate_item(&changes)?;
    state.catalog.stock_items.edit(id, &changes).await?;
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
    state.catalog.stock_items.update_image(id, image).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub(super) async fn delete_stock_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.catalog.stock_items.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
