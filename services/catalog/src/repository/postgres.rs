use super::{
    FestivalRecord, FestivalStockRecord, NewFestival, NewFestivalStock, NewPoster, NewSale,
    NewStockItem, PosterRecord, PosterStatus, Repository, RepositoryResult, SaleRecord,
    StockItemChanges, StockItemRecord,
};
use crate::asset::AssetId;
use crate::config::DatabaseConfig;
use crate::error::RepositoryError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgPool, PgPoolOptions, PgQueryResult, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Postgres, Type};
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const POSTER_COLUMNS: &str =
    "id, festival_id, name, description, image_id, status, created_at";
const STOCK_ITEM_COLUMNS: &str = "id, name, category, description, image_id, created_at";
const FESTIVAL_STOCK_COLUMNS: &str = "id, festival_id, stock_item_id, price, created_at";
const SALE_COLUMNS: &str = "id, festival_stock_id, quantity, created_at";

/// Translate driver errors into the repository sentinels
fn map_db_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            RepositoryError::AlreadyExists
        }
        // The referenced festival, stock item or festival stock is gone
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
            RepositoryError::NotFound
        }
        other => RepositoryError::Database(other),
    }
}

fn expect_one(result: PgQueryResult) -> RepositoryResult<()> {
    if result.rows_affected() == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

// Statuses are stored as constrained TEXT rather than a Postgres enum
impl Type<Postgres> for PosterStatus {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for PosterStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <&str as Decode<Postgres>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Connect with a pooled client
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
            .connect(&config.url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn ping(&self) -> RepositoryResult<()> {
        tokio::time::timeout(
            Duration::from_secs(2),
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await
        .map_err(|_| RepositoryError::Database(sqlx::Error::PoolTimedOut))?
        .map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self, festival), fields(name = %festival.name))]
    async fn register_festival(&self, festival: &NewFestival) -> RepositoryResult<FestivalRecord> {
        let record = sqlx::query_as::<_, FestivalRecord>(
            r#"
            INSERT INTO festivals (id, name, description, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&festival.name)
        .bind(&festival.description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        debug!(festival_id = %record.id, "Festival registered");
        Ok(record)
    }

    async fn get_festival(&self, id: Uuid) -> RepositoryResult<FestivalRecord> {
        sqlx::query_as::<_, FestivalRecord>(
            "SELECT id, name, description, created_at FROM festivals WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_festivals(&self) -> RepositoryResult<Vec<FestivalRecord>> {
        sqlx::query_as::<_, FestivalRecord>(
            "SELECT id, name, description, created_at FROM festivals ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update_festival(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
    ) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE festivals SET name = $2, description = $3 WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    #[instrument(skip(self))]
    async fn delete_festival(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM festivals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    #[instrument(skip(self, poster), fields(festival_id = %poster.festival_id, name = %poster.name))]
    async fn register_poster(&self, poster: &NewPoster) -> RepositoryResult<PosterRecord> {
        let sql = format!(
            r#"
            INSERT INTO posters (id, festival_id, name, description, image_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING {}
            "#,
            POSTER_COLUMNS
        );

        let record = sqlx::query_as::<_, PosterRecord>(&sql)
            .bind(Uuid::now_v7())
            .bind(poster.festival_id)
            .bind(&poster.name)
            .bind(&poster.description)
            .bind(poster.image_id.as_str())
            .bind(PosterStatus::default().as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        debug!(poster_id = %record.id, "Poster registered");
        Ok(record)
    }

    async fn get_poster(&self, id: Uuid) -> RepositoryResult<PosterRecord> {
        let sql = format!("SELECT {} FROM posters WHERE id = $1", POSTER_COLUMNS);
        sqlx::query_as::<_, PosterRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_posters_by_festival(
        &self,
        festival_id: Uuid,
    ) -> RepositoryResult<Vec<PosterRecord>> {
        let sql = format!(
            "SELECT {} FROM posters WHERE festival_id = $1 ORDER BY name ASC",
            POSTER_COLUMNS
        );
        sqlx::query_as::<_, PosterRecord>(&sql)
            .bind(festival_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_poster_by_name(
        &self,
        festival_id: Uuid,
        name: &str,
    ) -> RepositoryResult<PosterRecord> {
        let sql = format!(
            "SELECT {} FROM posters WHERE festival_id = $1 AND name = $2",
            POSTER_COLUMNS
        );
        sqlx::query_as::<_, PosterRecord>(&sql)
            .bind(festival_id)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_poster(&self, id: Uuid, name: &str, description: &str) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE posters SET name = $2, description = $3 WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    async fn update_poster_status(&self, id: Uuid, status: PosterStatus) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE posters SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    async fn update_poster_image(&self, id: Uuid, image_id: &AssetId) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE posters SET image_id = $2 WHERE id = $1")
            .bind(id)
            .bind(image_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    #[instrument(skip(self))]
    async fn delete_poster(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM posters WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    #[instrument(skip(self, item), fields(name = %item.name))]
    async fn register_stock_item(&self, item: &NewStockItem) -> RepositoryResult<StockItemRecord> {
        let sql = format!(
            r#"
            INSERT INTO stock_items (id, name, category, description, image_id, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING {}
            "#,
            STOCK_ITEM_COLUMNS
        );

        let record = sqlx::query_as::<_, StockItemRecord>(&sql)
            .bind(Uuid::now_v7())
            .bind(&item.name)
            .bind(&item.category)
            .bind(&item.description)
            .bind(item.image_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        debug!(stock_item_id = %record.id, "Stock item registered");
        Ok(record)
    }

    async fn get_stock_item(&self, id: Uuid) -> RepositoryResult<StockItemRecord> {
        let sql = format!("SELECT {} FROM stock_items WHERE id = $1", STOCK_ITEM_COLUMNS);
        sqlx::query_as::<_, StockItemRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn query_stock_items(
        &self,
        category: Option<String>,
    ) -> RepositoryResult<Vec<StockItemRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM stock_items
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY created_at DESC
            "#,
            STOCK_ITEM_COLUMNS
        );
        sqlx::query_as::<_, StockItemRecord>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update_stock_item(
        &self,
        id: Uuid,
        changes: &StockItemChanges,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE stock_items SET name = $2, category = $3, description = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.category)
        .bind(&changes.description)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        expect_one(result)
    }

    async fn update_stock_item_image(&self, id: Uuid, image_id: &AssetId) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE stock_items SET image_id = $2 WHERE id = $1")
            .bind(id)
            .bind(image_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    #[instrument(skip(self))]
    async fn delete_stock_item(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM stock_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    #[instrument(skip(self, stock), fields(festival_id = %stock.festival_id, stock_item_id = %stock.stock_item_id))]
    async fn register_festival_stock(
        &self,
        stock: &NewFestivalStock,
    ) -> RepositoryResult<FestivalStockRecord> {
        let sql = format!(
            r#"
            INSERT INTO festival_stocks (id, festival_id, stock_item_id, price, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING {}
            "#,
            FESTIVAL_STOCK_COLUMNS
        );

        let record = sqlx::query_as::<_, FestivalStockRecord>(&sql)
            .bind(Uuid::now_v7())
            .bind(stock.festival_id)
            .bind(stock.stock_item_id)
            .bind(stock.price)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        debug!(festival_stock_id = %record.id, "Festival stock registered");
        Ok(record)
    }

    async fn get_festival_stock(&self, id: Uuid) -> RepositoryResult<FestivalStockRecord> {
        let sql = format!(
            "SELECT {} FROM festival_stocks WHERE id = $1",
            FESTIVAL_STOCK_COLUMNS
        );
        sqlx::query_as::<_, FestivalStockRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn query_festival_stocks(
        &self,
        festival_id: Uuid,
        category: Option<String>,
    ) -> RepositoryResult<Vec<FestivalStockRecord>> {
        sqlx::query_as::<_, FestivalStockRecord>(
            r#"
            SELECT fs.id, fs.festival_id, fs.stock_item_id, fs.price, fs.created_at
            FROM festival_stocks fs
            JOIN stock_items si ON si.id = fs.stock_item_id
            WHERE fs.festival_id = $1
              AND ($2::text IS NULL OR si.category = $2)
            ORDER BY fs.created_at ASC
            "#,
        )
        .bind(festival_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update_festival_stock_price(&self, id: Uuid, price: i32) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE festival_stocks SET price = $2 WHERE id = $1")
            .bind(id)
            .bind(price)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    #[instrument(skip(self))]
    async fn delete_festival_stock(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM festival_stocks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }

    #[instrument(skip(self, sale), fields(festival_stock_id = %sale.festival_stock_id))]
    async fn register_sale(&self, sale: &NewSale) -> RepositoryResult<SaleRecord> {
        let sql = format!(
            r#"
            INSERT INTO sales (id, festival_stock_id, quantity, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING {}
            "#,
            SALE_COLUMNS
        );

        let record = sqlx::query_as::<_, SaleRecord>(&sql)
            .bind(Uuid::now_v7())
            .bind(sale.festival_stock_id)
            .bind(sale.quantity)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        debug!(sale_id = %record.id, "Sale registered");
        Ok(record)
    }

    async fn get_sale(&self, id: Uuid) -> RepositoryResult<SaleRecord> {
        let sql = format!("SELECT {} FROM sales WHERE id = $1", SALE_COLUMNS);
        sqlx::query_as::<_, SaleRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_sales_by_festival_stock(
        &self,
        festival_stock_id: Uuid,
    ) -> RepositoryResult<Vec<SaleRecord>> {
        let sql = format!(
            "SELECT {} FROM sales WHERE festival_stock_id = $1 ORDER BY created_at ASC",
            SALE_COLUMNS
        );
        sqlx::query_as::<_, SaleRecord>(&sql)
            .bind(festival_stock_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn query_sales(
        &self,
        festival_id: Option<Uuid>,
        stock_item_id: Option<Uuid>,
    ) -> RepositoryResult<Vec<SaleRecord>> {
        sqlx::query_as::<_, SaleRecord>(
            r#"
            SELECT s.id, s.festival_stock_id, s.quantity, s.created_at
            FROM sales s
            JOIN festival_stocks fs ON fs.id = s.festival_stock_id
            WHERE ($1::uuid IS NULL OR fs.festival_id = $1)
              AND ($2::uuid IS NULL OR fs.stock_item_id = $2)
            ORDER BY s.created_at ASC
            "#,
        )
        .bind(festival_id)
        .bind(stock_item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn delete_sale(&self, id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        expect_one(result)
    }
}
