use super::compensation::compensate;
use super::row_image::RowImage;
use crate::asset::AssetId;
use crate::asset_store::AssetStore;
use crate::error::{RepositoryError, ServiceError, ServiceResult};
use crate::repository::{NewStockItem, Repository, StockItemChanges, StockItemRecord};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Vendor stock item with a client-facing image link
#[derive(Debug, Clone, Serialize)]
pub struct StockItem {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: String,
    pub image_id: Option<AssetId>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct StockItemManager {
    repo: Arc<dyn Repository>,
    assets: Arc<AssetStore>,
}

impl StockItemManager {
    pub fn new(repo: Arc<dyn Repository>, assets: Arc<AssetStore>) -> Self {
        Self { repo, assets }
    }

    fn hydrate(&self, row: StockItemRecord) -> StockItem {
        let image_id = AssetId::from_row(&row.image_id);
        let image_url = image_id.as_ref().map(|id| self.assets.resolve_url(id));
        StockItem {
            id: row.id,
            name: row.name,
            category: row.category,
            description: row.description,
            image_id,
            image_url,
            created_at: row.created_at,
        }
    }

    /// Upload the image, then insert the row; a failed insert deletes the image.
    #[instrument(skip(self, details, image), fields(name = %details.name))]
    pub async fn create(&self, details: StockItemChanges, image: Bytes) -> ServiceResult<StockItem> {
        let image_id = self.assets.upload(image).await?;

        let new_item = NewStockItem {
            name: details.name,
            category: details.category,
            description: details.description,
            image_id: image_id.clone(),
        };
        let row = match self.repo.register_stock_item(&new_item).await {
            Ok(row) => row,
            Err(e) => return Err(compensate(&self.assets, &image_id, e.into()).await),
        };

        info!(stock_item_id = %row.id, asset_id = %image_id, "Stock item created");
        Ok(self.hydrate(row))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<StockItem> {
        let row = self.repo.get_stock_item(id).await?;
        Ok(self.hydrate(row))
    }

    pub async fn query(&self, category: Option<String>) -> ServiceResult<Vec<StockItem>> {
        let rows = self.repo.query_stock_items(category).await?;
        Ok(rows.into_iter().map(|row| self.hydrate(row)).collect())
    }

    pub async fn edit(&self, id: Uuid, changes: &StockItemChanges) -> ServiceResult<()> {
        self.repo.update_stock_item(id, changes).await?;
        Ok(())
    }

    /// Replace the image: delete the old one, upload, then point the row at it
    #[instrument(skip(self, image))]
    pub async fn update_image(&self, id: Uuid, image: Bytes) -> ServiceResult<AssetId> {
        let row = self.repo.get_stock_item(id).await?;

        RowImage::from_row(&row.image_id).delete(&self.assets).await?;

        let image_id = self.assets.upload(image).await?;
        if let Err(e) = self.repo.update_stock_item_image(id, &image_id).await {
            return Err(compensate(&self.assets, &image_id, e.into()).await);
        }

        info!(stock_item_id = %id, asset_id = %image_id, "Stock item image replaced");
        Ok(image_id)
    }

    /// Delete the image, then the row. A failed image delete keeps the row.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let row = self.repo.get_stock_item(id).await?;
        let image = RowImage::from_row(&row.image_id);
        image.delete(&self.assets).await?;

        match (self.repo.delete_stock_item(id).await, image) {
            (Ok(()), _) => {}
            (Err(RepositoryError::NotFound), _) => return Err(ServiceError::NotFound),
            (Err(source), RowImage::Asset(asset_id)) => {
                return Err(ServiceError::InternalInconsistency { asset_id, source })
            }
            (Err(source), _) => return Err(source.into()),
        }

        info!(stock_item_id = %id, image_id = %row.image_id, "Stock item deleted");
        Ok(())
    }
}
