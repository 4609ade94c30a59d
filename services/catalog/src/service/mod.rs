//! Catalog operations that touch both metadata rows and stored images, plus
//! the row-only festival stock and sale bookkeeping.
//!
//! Each create uploads first and inserts second. Each delete removes the image
//! first and the row second. Failures in between are undone by deleting the
//! uploaded image again (see [`compensation`]).

mod compensation;
pub mod festival;
pub mod festival_stock;
pub mod poster;
mod row_image;
pub mod sale;
pub mod stock_item;

pub use festival::{Festival, FestivalManager};
pub use festival_stock::{FestivalStock, FestivalStockManager};
pub use poster::{Poster, PosterDraft, PosterManager};
pub use sale::{Sale, SaleManager};
pub use stock_item::{StockItem, StockItemManager};

use crate::asset_store::AssetStore;
use crate::repository::Repository;
use std::sync::Arc;

/// All managers, sharing one repository and one asset store
#[derive(Clone)]
pub struct Catalog {
    pub festivals: FestivalManager,
    pub posters: PosterManager,
    pub stock_items: StockItemManager,
    pub festival_stocks: FestivalStockManager,
    pub sales: SaleManager,
}

impl Catalog {
    pub fn new(repo: Arc<dyn Repository>, assets: Arc<AssetStore>) -> Self {
        let posters = PosterManager::new(repo.clone(), assets.clone());
        Self {
            festivals: FestivalManager::new(repo.clone(), posters.clone()),
            stock_items: StockItemManager::new(repo.clone(), assets),
            festival_stocks: FestivalStockManager::new(repo.clone()),
            sales: SaleManager::new(repo),
            posters,
        }
    }
}
