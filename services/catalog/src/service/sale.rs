use crate::error::ServiceResult;
use crate::repository::{NewSale, Repository, SaleRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Quantity sold of one festival stock entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sale {
    pub id: Uuid,
    /// Festival stock entry the sale was made from
    pub stock_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl From<SaleRecord> for Sale {
    fn from(record: SaleRecord) -> Self {
        Self {
            id: record.id,
            stock_id: record.festival_stock_id,
            quantity: record.quantity,
            created_at: record.created_at,
        }
    }
}

#[derive(Clone)]
pub struct SaleManager {
    repo: Arc<dyn Repository>,
}

impl SaleManager {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Record a sale against an existing festival stock entry
    #[instrument(skip(self))]
    pub async fn create(&self, stock_id: Uuid, quantity: i32) -> ServiceResult<Sale> {
        self.repo.get_festival_stock(stock_id).await?;

        let record = self
            .repo
            .register_sale(&NewSale {
                festival_stock_id: stock_id,
                quantity,
            })
            .await?;

        metrics::counter!("catalog.sales.recorded").increment(1);
        metrics::counter!("catalog.sales.units").increment(u64::try_from(quantity).unwrap_or(0));
        info!(sale_id = %record.id, quantity, "Sale recorded");
        Ok(record.into())
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Sale> {
        Ok(self.repo.get_sale(id).await?.into())
    }

    /// Sales of one festival stock entry; `NotFound` when the entry does not exist
    pub async fn get_by_stock(&self, stock_id: Uuid) -> ServiceResult<Vec<Sale>> {
        self.repo.get_festival_stock(stock_id).await?;
        let records = self.repo.get_sales_by_festival_stock(stock_id).await?;
        Ok(records.into_iter().map(Sale::from).collect())
    }

    pub async fn query(
        &self,
        festival_id: Option<Uuid>,
        stock_item_id: Option<Uuid>,
    ) -> ServiceResult<Vec<Sale>> {
        let records = self.repo.query_sales(festival_id, stock_item_id).await?;
        Ok(records.into_iter().map(Sale::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.repo.delete_sale(id).await?;
        info!(sale_id = %id, "Sale deleted");
        Ok(())
    }
}
