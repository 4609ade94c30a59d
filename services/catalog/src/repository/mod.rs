//! Metadata rows for festivals, posters, stock items, festival stock and sales.
//!
//! Posters and stock items each reference exactly one asset through
//! `image_id`. Festival stock prices a stock item at one festival; sales
//! record quantities sold of a festival stock entry. All implementations
//! report missing rows (including a missing referenced parent) as
//! [`RepositoryError::NotFound`] and unique violations as
//! [`RepositoryError::AlreadyExists`].

mod postgres;

pub use postgres::PgRepository;

use crate::asset::AssetId;
use crate::error::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Stored festival
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FestivalRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Stored poster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PosterRecord {
    pub id: Uuid,
    pub festival_id: Uuid,
    pub name: String,
    pub description: String,
    pub image_id: String,
    pub status: PosterStatus,
    pub created_at: DateTime<Utc>,
}

/// Stored stock item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StockItemRecord {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: String,
    pub image_id: String,
    pub created_at: DateTime<Utc>,
}

/// A stock item offered at a festival, with its price there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FestivalStockRecord {
    pub id: Uuid,
    pub festival_id: Uuid,
    pub stock_item_id: Uuid,
    pub price: i32,
    pub created_at: DateTime<Utc>,
}

/// Stored sale of a festival stock entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SaleRecord {
    pub id: Uuid,
    pub festival_stock_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFestival {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewPoster {
    pub festival_id: Uuid,
    pub name: String,
    pub description: String,
    pub image_id: AssetId,
}

#[derive(Debug, Clone)]
pub struct NewStockItem {
    pub name: String,
    pub category: String,
    pub description: String,
    pub image_id: AssetId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFestivalStock {
    pub festival_id: Uuid,
    pub stock_item_id: Uuid,
    pub price: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSale {
    pub festival_stock_id: Uuid,
    pub quantity: i32,
}

/// Editable stock item fields
#[derive(Debug, Clone)]
pub struct StockItemChanges {
    pub name: String,
    pub category: String,
    pub description: String,
}

/// Collection state of a poster at the festival booth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PosterStatus {
    Uncollected,
    Collected,
    Lost,
}

impl PosterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PosterStatus::Uncollected => "uncollected",
            PosterStatus::Collected => "collected",
            PosterStatus::Lost => "lost",
        }
    }
}

impl Default for PosterStatus {
    fn default() -> Self {
        PosterStatus::Uncollected
    }
}

impl fmt::Display for PosterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown poster status: {0}")]
pub struct UnknownPosterStatus(pub String);

impl FromStr for PosterStatus {
    type Err = UnknownPosterStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uncollected" => Ok(PosterStatus::Uncollected),
            "collected" => Ok(PosterStatus::Collected),
            "lost" => Ok(PosterStatus::Lost),
            other => Err(UnknownPosterStatus(other.to_string())),
        }
    }
}

/// Metadata persistence used by the managers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> RepositoryResult<()>;

    async fn register_festival(&self, festival: &NewFestival) -> RepositoryResult<FestivalRecord>;
    async fn get_festival(&self, id: Uuid) -> RepositoryResult<FestivalRecord>;
    async fn list_festivals(&self) -> RepositoryResult<Vec<FestivalRecord>>;
    async fn update_festival(&self, id: Uuid, name: &str, description: &str)
        -> RepositoryResult<()>;
    /// Deletes the festival; the schema cascades to its poster rows
    async fn delete_festival(&self, id: Uuid) -> RepositoryResult<()>;

    /// Insert a poster. A duplicate `(festival_id, name)` is `AlreadyExists`,
    /// a missing festival is `NotFound`.
    async fn register_poster(&self, poster: &NewPoster) -> RepositoryResult<PosterRecord>;
    async fn get_poster(&self, id: Uuid) -> RepositoryResult<PosterRecord>;
    async fn get_posters_by_festival(&self, festival_id: Uuid)
        -> RepositoryResult<Vec<PosterRecord>>;
    async fn get_poster_by_name(&self, festival_id: Uuid, name: &str)
        -> RepositoryResult<PosterRecord>;
    async fn update_poster(&self, id: Uuid, name: &str, description: &str)
        -> RepositoryResult<()>;
    async fn update_poster_status(&self, id: Uuid, status: PosterStatus) -> RepositoryResult<()>;
    async fn update_poster_image(&self, id: Uuid, image_id: &AssetId) -> RepositoryResult<()>;
    async fn delete_poster(&self, id: Uuid) -> RepositoryResult<()>;

    async fn register_stock_item(&self, item: &NewStockItem) -> RepositoryResult<StockItemRecord>;
    async fn get_stock_item(&self, id: Uuid) -> RepositoryResult<StockItemRecord>;
    /// All stock items, optionally restricted to one category
    async fn query_stock_items(&self, category: Option<String>)
        -> RepositoryResult<Vec<StockItemRecord>>;
    async fn update_stock_item(&self, id: Uuid, changes: &StockItemChanges)
        -> RepositoryResult<()>;
    async fn update_stock_item_image(&self, id: Uuid, image_id: &AssetId)
        -> RepositoryResult<()>;
    /// Deletes the stock item; the schema cascades to its festival stock and sales
    async fn delete_stock_item(&self, id: Uuid) -> RepositoryResult<()>;

    /// A missing festival or stock item is `NotFound`
    async fn register_festival_stock(&self, stock: &NewFestivalStock)
        -> RepositoryResult<FestivalStockRecord>;
    async fn get_festival_stock(&self, id: Uuid) -> RepositoryResult<FestivalStockRecord>;
    /// Stock of one festival, optionally restricted to one item category
    async fn query_festival_stocks(&self, festival_id: Uuid, category: Option<String>)
        -> RepositoryResult<Vec<FestivalStockRecord>>;
    async fn update_festival_stock_price(&self, id: Uuid, price: i32) -> RepositoryResult<()>;
    async fn delete_festival_stock(&self, id: Uuid) -> RepositoryResult<()>;

    /// A missing festival stock entry is `NotFound`
    async fn register_sale(&self, sale: &NewSale) -> RepositoryResult<SaleRecord>;
    async fn get_sale(&self, id: Uuid) -> RepositoryResult<SaleRecord>;
    async fn get_sales_by_festival_stock(&self, festival_stock_id: Uuid)
        -> RepositoryResult<Vec<SaleRecord>>;
    /// Sales filtered by the festival and/or stock item of their stock entry
    async fn query_sales(&self, festival_id: Option<Uuid>, stock_item_id: Option<Uuid>)
        -> RepositoryResult<Vec<SaleRecord>>;
    async fn delete_sale(&self, id: Uuid) -> RepositoryResult<()>;
}
