use super::{check_len, parse_id, ApiError, ApiResult, AppState};
use crate::service::FestivalStock;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Prices are whole currency units; free items are allowed
fn require_price(price: Option<i32>, field: &str) -> ApiResult<i32> {
    match price {
        Some(price) if price >= 0 => Ok(price),
        Some(_) => Err(ApiError::bad_request(format!("{} must not be negative", field))),
        None => Err(ApiError::bad_request(format!("{} is required", field))),
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterStockRequest {
    pub item_id: Option<String>,
    pub price: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePriceRequest {
    pub new_price: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct FestivalStockQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FestivalStockListResponse {
    pub stocks: Vec<FestivalStock>,
}

#[instrument(skip(state))]
pub(super) async fn register_festival_stock(
    State(state): State<AppState>,
    Path(festival_id): Path<String>,
    Json(request): Json<RegisterStockRequest>,
) -> ApiResult<(StatusCode, Json<FestivalStock>)> {
    let festival_id = parse_id(&festival_id)?;
    let item_id = match request.item_id.as_deref() {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ApiError::bad_request("item_id is required")),
    };
    let price = require_price(request.price, "price")?;
    let item_id = parse_id(item_id)?;

    let stock = state
        .catalog
        .festival_stocks
        .create(festival_id, item_id, price)
        .await?;
    Ok((StatusCode::CREATED, Json(stock)))
}

#[instrument(skip(state))]
pub(super) async fn list_festival_stocks(
    State(state): State<AppState>,
    Path(festival_id): Path<String>,
    Query(params): Query<FestivalStockQuery>,
) -> ApiResult<Json<FestivalStockListResponse>> {
    let festival_id = parse_id(&festival_id)?;
    let category = params.category.filter(|c| !c.is_empty());
    if let Some(category) = &category {
        check_len("category", category, 1, 100)?;
    }

    let stocks = state
        .catalog
        .festival_stocks
        .query(festival_id, category)
        .await?;
    Ok(Json(FestivalStockListResponse { stocks }))
}

pub(super) async fn get_festival_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FestivalStock>> {
    let stock = state.catalog.festival_stocks.get(parse_id(&id)?).await?;
    Ok(Json(stock))
}

#[instrument(skip(state))]
pub(super) async fn update_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePriceRequest>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let price = require_price(request.new_price, "new_price")?;
    state.catalog.festival_stocks.update_price(id, price).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deletes the entry and every sale recorded against it
#[instrument(skip(state))]
pub(super) async fn delete_festival_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.catalog.festival_stocks.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
