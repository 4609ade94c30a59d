use crate::error::ServiceResult;
use crate::repository::{FestivalStockRecord, NewFestivalStock, Repository};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// A stock item offered at one festival, priced for that festival
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FestivalStock {
    pub id: Uuid,
    pub festival_id: Uuid,
    pub stock_item_id: Uuid,
    pub price: i32,
    pub created_at: DateTime<Utc>,
}

impl From<FestivalStockRecord> for FestivalStock {
    fn from(record: FestivalStockRecord) -> Self {
        Self {
            id: record.id,
            festival_id: record.festival_id,
            stock_item_id: record.stock_item_id,
            price: record.price,
            created_at: record.created_at,
        }
    }
}

#[derive(Clone)]
pub struct FestivalStockManager {
    repo: Arc<dyn Repository>,
}

impl FestivalStockManager {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Offer a stock item at a festival. Either parent missing is `NotFound`.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        festival_id: Uuid,
        stock_item_id: Uuid,
        price: i32,
    ) -> ServiceResult<FestivalStock> {
        let record = self
            .repo
            .register_festival_stock(&NewFestivalStock {
                festival_id,
                stock_item_id,
                price,
            })
            .await?;
        info!(festival_stock_id = %record.id, price, "Festival stock registered");
        Ok(record.into())
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<FestivalStock> {
        Ok(self.repo.get_festival_stock(id).await?.into())
    }

    pub async fn query(
        &self,
        festival_id: Uuid,
        category: Option<String>,
    ) -> ServiceResult<Vec<FestivalStock>> {
        let records = self.repo.query_festival_stocks(festival_id, category).await?;
        Ok(records.into_iter().map(FestivalStock::from).collect())
    }

    pub async fn update_price(&self, id: Uuid, price: i32) -> ServiceResult<()> {
        self.repo.update_festival_stock_price(id, price).await?;
        info!(festival_stock_id = %id, price, "Festival stock price updated");
        Ok(())
    }

    /// Delete the entry; its sales go with it
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.repo.delete_festival_stock(id).await?;
        info!(festival_stock_id = %id, "Festival stock deleted");
        Ok(())
    }
}
