//! In-process stand-ins for PostgreSQL and S3.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use catalog_service::repository::{
    FestivalRecord, FestivalStockRecord, NewFestival, NewFestivalStock, NewPoster, NewSale,
    NewStockItem, PosterRecord, PosterStatus, Repository, RepositoryResult, SaleRecord,
    StockItemChanges, StockItemRecord,
};
use catalog_service::{
    AssetId, AssetStore, Catalog, DiskCache, MemoryObjectStore, ObjectStore, RepositoryError,
    UrlResolver,
};
use catalog_service::object_store::ObjectStoreError;
use chrono::Utc;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Barrier;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    festivals: HashMap<Uuid, FestivalRecord>,
    posters: HashMap<Uuid, PosterRecord>,
    stock_items: HashMap<Uuid, StockItemRecord>,
    festival_stocks: HashMap<Uuid, FestivalStockRecord>,
    sales: HashMap<Uuid, SaleRecord>,
}

impl Tables {
    /// Drop festival stock matching `doomed` together with its sales
    fn cascade_festival_stocks(&mut self, doomed: impl Fn(&FestivalStockRecord) -> bool) {
        let removed: Vec<Uuid> = self
            .festival_stocks
            .values()
            .filter(|fs| doomed(fs))
            .map(|fs| fs.id)
            .collect();
        for id in &removed {
            self.festival_stocks.remove(id);
        }
        self.sales.retain(|_, s| !removed.contains(&s.festival_stock_id));
    }
}

/// Repository over hash maps with the same constraints as the SQL schema:
/// unique `(festival_id, name)` on posters, foreign keys, and cascading
/// deletes.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    fail_row_deletes: AtomicBool,
    name_check_gate: Mutex<Option<Arc<Barrier>>>,
    poster_inserts: AtomicUsize,
}

impl MemoryRepository {
    /// Hold every poster name lookup until `parties` lookups are waiting,
    /// so concurrent creates all pass the name check before any insert.
    pub fn gate_name_checks(&self, parties: usize) {
        *self.name_check_gate.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    /// Attempted poster inserts, including rejected ones
    pub fn poster_inserts(&self) -> usize {
        self.poster_inserts.load(Ordering::SeqCst)
    }

    pub fn festival_stock_count(&self) -> usize {
        self.tables.lock().unwrap().festival_stocks.len()
    }

    pub fn sale_count(&self) -> usize {
        self.tables.lock().unwrap().sales.len()
    }

    pub fn fail_row_deletes(&self, fail: bool) {
        self.fail_row_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn poster_count(&self) -> usize {
        self.tables.lock().unwrap().posters.len()
    }

    /// Every non-empty image identifier referenced by a row
    pub fn referenced_images(&self) -> Vec<String> {
        let tables = self.tables.lock().unwrap();
        tables
            .posters
            .values()
            .map(|p| p.image_id.clone())
            .chain(tables.stock_items.values().map(|s| s.image_id.clone()))
            .filter(|id| !id.is_empty())
            .collect()
    }

    fn check_delete(&self) -> RepositoryResult<()> {
        if self.fail_row_deletes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }

    async fn register_festival(&self, festival: &NewFestival) -> RepositoryResult<FestivalRecord> {
        let record = FestivalRecord {
            id: Uuid::now_v7(),
            name: festival.name.clone(),
            description: festival.description.clone(),
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .festivals
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_festival(&self, id: Uuid) -> RepositoryResult<FestivalRecord> {
        self.tables
            .lock()
            .unwrap()
            .festivals
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_festivals(&self) -> RepositoryResult<Vec<FestivalRecord>> {
        Ok(self.tables.lock().unwrap().festivals.values().cloned().collect())
    }

    async fn update_festival(&self, id: Uuid, name: &str, description: &str) -> RepositoryResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let festival = tables.festivals.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        festival.name = name.to_string();
        festival.description = description.to_string();
        Ok(())
    }

    async fn delete_festival(&self, id: Uuid) -> RepositoryResult<()> {
        self.check_delete()?;
        let mut tables = self.tables.lock().unwrap();
        tables.festivals.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.posters.retain(|_, p| p.festival_id != id);
        tables.cascade_festival_stocks(|fs| fs.festival_id == id);
        Ok(())
    }

    async fn register_poster(&self, poster: &NewPoster) -> RepositoryResult<PosterRecord> {
        self.poster_inserts.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock().unwrap();
        if !tables.festivals.contains_key(&poster.festival_id) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .posters
            .values()
            .any(|p| p.festival_id == poster.festival_id && p.name == poster.name)
        {
            return Err(RepositoryError::AlreadyExists);
        }
        let record = PosterRecord {
            id: Uuid::now_v7(),
            festival_id: poster.festival_id,
            name: poster.name.clone(),
            description: poster.description.clone(),
            image_id: poster.image_id.to_string(),
            status: PosterStatus::Uncollected,
            created_at: Utc::now(),
        };
        tables.posters.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_poster(&self, id: Uuid) -> RepositoryResult<PosterRecord> {
        self.tables
            .lock()
            .unwrap()
            .posters
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_posters_by_festival(&self, festival_id: Uuid) -> RepositoryResult<Vec<PosterRecord>> {
        let tables = self.tables.lock().unwrap();
        let mut posters: Vec<_> = tables
            .posters
            .values()
            .filter(|p| p.festival_id == festival_id)
            .cloned()
            .collect();
        posters.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(posters)
    }

    async fn get_poster_by_name(&self, festival_id: Uuid, name: &str) -> RepositoryResult<PosterRecord> {
        let gate = self.name_check_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        self.tables
            .lock()
            .unwrap()
            .posters
            .values()
            .find(|p| p.festival_id == festival_id && p.name == name)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_poster(&self, id: Uuid, name: &str, description: &str) -> RepositoryResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let festival_id = tables
            .posters
            .get(&id)
            .map(|p| p.festival_id)
            .ok_or(RepositoryError::NotFound)?;
        if tables
            .posters
            .values()
            .any(|p| p.id != id && p.festival_id == festival_id && p.name == name)
        {
            return Err(RepositoryError::AlreadyExists);
        }
        if let Some(poster) = tables.posters.get_mut(&id) {
            poster.name = name.to_string();
            poster.description = description.to_string();
        }
        Ok(())
    }

    async fn update_poster_status(&self, id: Uuid, status: PosterStatus) -> RepositoryResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let poster = tables.posters.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        poster.status = status;
        Ok(())
    }

    async fn update_poster_image(&self, id: Uuid, image_id: &AssetId) -> RepositoryResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let poster = tables.posters.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        poster.image_id = image_id.to_string();
        Ok(())
    }

    async fn delete_poster(&self, id: Uuid) -> RepositoryResult<()> {
        self.check_delete()?;
        self.tables
            .lock()
            .unwrap()
            .posters
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn register_stock_item(&self, item: &NewStockItem) -> RepositoryResult<StockItemRecord> {
        let record = StockItemRecord {
            id: Uuid::now_v7(),
            name: item.name.clone(),
            category: item.category.clone(),
            description: item.description.clone(),
            image_id: item.image_id.to_string(),
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .stock_items
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_stock_item(&self, id: Uuid) -> RepositoryResult<StockItemRecord> {
        self.tables
            .lock()
            .unwrap()
            .stock_items
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn query_stock_items(&self, category: Option<String>) -> RepositoryResult<Vec<StockItemRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .stock_items
            .values()
            .filter(|s| category.as_deref().map_or(true, |c| s.category == c))
            .cloned()
            .collect())
    }

    async fn update_stock_item(&self, id: Uuid, changes: &StockItemChanges) -> RepositoryResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let item = tables.stock_items.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        item.name = changes.name.clone();
        item.category = changes.category.clone();
        item.description = changes.description.clone();
        Ok(())
    }

    async fn update_stock_item_image(&self, id: Uuid, image_id: &AssetId) -> RepositoryResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let item = tables.stock_items.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        item.image_id = image_id.to_string();
        Ok(())
    }

    async fn delete_stock_item(&self, id: Uuid) -> RepositoryResult<()> {
        self.check_delete()?;
        let mut tables = self.tables.lock().unwrap();
        tables.stock_items.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.cascade_festival_stocks(|fs| fs.stock_item_id == id);
        Ok(())
    }

    async fn register_festival_stock(&self, stock: &NewFestivalStock) -> RepositoryResult<FestivalStockRecord> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.festivals.contains_key(&stock.festival_id)
            || !tables.stock_items.contains_key(&stock.stock_item_id)
        {
            return Err(RepositoryError::NotFound);
        }
        let record = FestivalStockRecord {
            id: Uuid::now_v7(),
            festival_id: stock.festival_id,
            stock_item_id: stock.stock_item_id,
            price: stock.price,
            created_at: Utc::now(),
        };
        tables.festival_stocks.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_festival_stock(&self, id: Uuid) -> RepositoryResult<FestivalStockRecord> {
        self.tables
            .lock()
            .unwrap()
            .festival_stocks
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn query_festival_stocks(
        &self,
        festival_id: Uuid,
        category: Option<String>,
    ) -> RepositoryResult<Vec<FestivalStockRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .festival_stocks
            .values()
            .filter(|fs| fs.festival_id == festival_id)
            .filter(|fs| {
                category.as_deref().map_or(true, |c| {
                    tables
                        .stock_items
                        .get(&fs.stock_item_id)
                        .is_some_and(|item| item.category == c)
                })
            })
            .cloned()
            .collect())
    }

    async fn update_festival_stock_price(&self, id: Uuid, price: i32) -> RepositoryResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let stock = tables.festival_stocks.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stock.price = price;
        Ok(())
    }

    async fn delete_festival_stock(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.festival_stocks.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        tables.cascade_festival_stocks(|fs| fs.id == id);
        Ok(())
    }

    async fn register_sale(&self, sale: &NewSale) -> RepositoryResult<SaleRecord> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.festival_stocks.contains_key(&sale.festival_stock_id) {
            return Err(RepositoryError::NotFound);
        }
        let record = SaleRecord {
            id: Uuid::now_v7(),
            festival_stock_id: sale.festival_stock_id,
            quantity: sale.quantity,
            created_at: Utc::now(),
        };
        tables.sales.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_sale(&self, id: Uuid) -> RepositoryResult<SaleRecord> {
        self.tables
            .lock()
            .unwrap()
            .sales
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_sales_by_festival_stock(&self, festival_stock_id: Uuid) -> RepositoryResult<Vec<SaleRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .sales
            .values()
            .filter(|s| s.festival_stock_id == festival_stock_id)
            .cloned()
            .collect())
    }

    async fn query_sales(
        &self,
        festival_id: Option<Uuid>,
        stock_item_id: Option<Uuid>,
    ) -> RepositoryResult<Vec<SaleRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .sales
            .values()
            .filter(|s| {
                tables.festival_stocks.get(&s.festival_stock_id).is_some_and(|fs| {
                    festival_id.map_or(true, |id| fs.festival_id == id)
                        && stock_item_id.map_or(true, |id| fs.stock_item_id == id)
                })
            })
            .cloned()
            .collect())
    }

    async fn delete_sale(&self, id: Uuid) -> RepositoryResult<()> {
        self.tables
            .lock()
            .unwrap()
            .sales
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// Memory object store that can be told to refuse deletes
#[derive(Default)]
pub struct RemoteStore {
    pub objects: MemoryObjectStore,
    fail_deletes: AtomicBool,
}

impl RemoteStore {
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.objects.object_exists(id).await.unwrap()
    }
}

#[async_trait]
impl ObjectStore for RemoteStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), ObjectStoreError> {
        self.objects.put_object(key, body, content_type).await
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        self.objects.get_object(key).await
    }

    async fn delete_object(&self, key: &str) -> Result<(), ObjectStoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("delete refused".to_string()));
        }
        self.objects.delete_object(key).await
    }

    async fn object_exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        self.objects.object_exists(key).await
    }
}

/// A catalog wired to in-memory backends
pub struct Harness {
    pub catalog: Catalog,
    pub assets: Arc<AssetStore>,
    pub repo: Arc<MemoryRepository>,
    pub remote: Arc<RemoteStore>,
    _cache_dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(cache_dir.path()).await.unwrap();
        let remote = Arc::new(RemoteStore::default());
        let assets = Arc::new(AssetStore::new(
            remote.clone(),
            cache,
            UrlResolver::proxy("http://catalog.test"),
        ));
        let repo = Arc::new(MemoryRepository::default());
        let catalog = Catalog::new(repo.clone(), assets.clone());

        Self {
            catalog,
            assets,
            repo,
            remote,
            _cache_dir: cache_dir,
        }
    }

    pub async fn festival(&self) -> Uuid {
        self.catalog
            .festivals
            .create("Rock in Japan".to_string(), "Hitachinaka".to_string())
            .await
            .unwrap()
            .id
    }

    /// Every row's image must exist remotely
    pub async fn assert_no_dangling_references(&self) {
        for id in self.repo.referenced_images() {
            assert!(self.remote.contains(&id).await, "row references missing image {}", id);
        }
    }

    /// Every stored image must be referenced by a row
    pub fn assert_no_orphans(&self) {
        assert_eq!(
            self.remote.objects.len(),
            self.repo.referenced_images().len(),
            "stored images and referencing rows differ"
        );
    }
}

pub fn png(width: u32, height: u32) -> Bytes {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([250, 200, 0]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    Bytes::from(out)
}
