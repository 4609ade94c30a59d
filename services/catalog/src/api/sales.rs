use super::{parse_id, ApiError, ApiResult, AppState};
use crate::service::Sale;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub stock_id: Option<String>,
    pub quantity: Option<i32>,
}

impl CreateSaleRequest {
    /// Missing fields and non-positive quantities are bad requests; a
    /// malformed stock id cannot name an entry and is not found
    fn validate(&self) -> ApiResult<(Uuid, i32)> {
        let stock_id = match self.stock_id.as_deref() {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Err(ApiError::bad_request("stock_id is required")),
        };
        let quantity = match self.quantity {
            Some(quantity) if quantity > 0 => quantity,
            Some(_) => return Err(ApiError::bad_request("quantity must be positive")),
            None => return Err(ApiError::bad_request("quantity is required")),
        };
        Ok((parse_id(stock_id)?, quantity))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SaleQuery {
    pub festival_id: Option<String>,
    pub stock_item_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaleListResponse {
    pub sales: Vec<Sale>,
}

/// Filter value from the query string. `Err` marks a malformed id, which
/// matches no sale.
fn filter_id(raw: Option<&str>) -> Result<Option<Uuid>, ()> {
    match raw.filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|_| ()),
    }
}

#[instrument(skip(state))]
pub(super) async fn create_sale(
    State(state): State<AppState>,
    Json(request): Json<CreateSaleRequest>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    let (stock_id, quantity) = request.validate()?;
    let sale = state.catalog.sales.create(stock_id, quantity).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

#[instrument(skip(state))]
pub(super) async fn list_sales(
    State(state): State<AppState>,
    Query(params): Query<SaleQuery>,
) -> ApiResult<Json<SaleListResponse>> {
    let (Ok(festival_id), Ok(stock_item_id)) = (
        filter_id(params.festival_id.as_deref()),
        filter_id(params.stock_item_id.as_deref()),
    ) else {
        return Ok(Json(SaleListResponse { sales: Vec::new() }));
    };

    let sales = state.catalog.sales.query(festival_id, stock_item_id).await?;
    Ok(Json(SaleListResponse { sales }))
}

pub(super) async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Sale>> {
    let sale = state.catalog.sales.get(parse_id(&id)?).await?;
    Ok(Json(sale))
}

pub(super) async fn list_stock_sales(
    State(state): State<AppState>,
    Path(stock_id): Path<String>,
) -> ApiResult<Json<SaleListResponse>> {
    let sales = state.catalog.sales.get_by_stock(parse_id(&stock_id)?).await?;
    Ok(Json(SaleListResponse { sales }))
}

#[instrument(skip(state))]
pub(super) async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.catalog.sales.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(stock_id: Option<&str>, quantity: Option<i32>) -> CreateSaleRequest {
        CreateSaleRequest {
            stock_id: stock_id.map(str::to_string),
            quantity,
        }
    }

    #[test]
    fn test_create_sale_validation() {
        let id = "0190a5c4-7d2e-7000-8000-000000000000";
        assert!(request(Some(id), Some(2)).validate().is_ok());

        let status = |r: CreateSaleRequest| r.validate().unwrap_err().status();
        assert_eq!(status(request(None, Some(2))), StatusCode::BAD_REQUEST);
        assert_eq!(status(request(Some(id), None)), StatusCode::BAD_REQUEST);
        assert_eq!(status(request(Some(id), Some(0))), StatusCode::BAD_REQUEST);
        assert_eq!(status(request(Some(id), Some(-5))), StatusCode::BAD_REQUEST);
        assert_eq!(status(request(Some("invalid-uuid"), Some(2))), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_malformed_filter_ids_match_nothing() {
        assert_eq!(filter_id(None), Ok(None));
        assert_eq!(filter_id(Some("")), Ok(None));
        assert!(filter_id(Some("invalid-uuid")).is_err());
        assert!(matches!(
            filter_id(Some("0190a5c4-7d2e-7000-8000-000000000000")),
            Ok(Some(_))
        ));
    }
}
