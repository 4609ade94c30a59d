use super::poster::PosterManager;
use crate::error::ServiceResult;
use crate::repository::{FestivalRecord, NewFestival, Repository};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Festival {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<FestivalRecord> for Festival {
    fn from(record: FestivalRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            created_at: record.created_at,
        }
    }
}

#[derive(Clone)]
pub struct FestivalManager {
    repo: Arc<dyn Repository>,
    posters: PosterManager,
}

impl FestivalManager {
    pub fn new(repo: Arc<dyn Repository>, posters: PosterManager) -> Self {
        Self { repo, posters }
    }

    pub async fn create(&self, name: String, description: String) -> ServiceResult<Festival> {
        let record = self
            .repo
            .register_festival(&NewFestival { name, description })
            .await?;
        info!(festival_id = %record.id, "Festival created");
        Ok(record.into())
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Festival> {
        Ok(self.repo.get_festival(id).await?.into())
    }

    pub async fn list(&self) -> ServiceResult<Vec<Festival>> {
        let records = self.repo.list_festivals().await?;
        Ok(records.into_iter().map(Festival::from).collect())
    }

    pub async fn edit(&self, id: Uuid, name: &str, description: &str) -> ServiceResult<()> {
        self.repo.update_festival(id, name, description).await?;
        Ok(())
    }

    /// Delete a festival with all of its posters.
    ///
    /// Posters go one by one through the poster delete so their images are
    /// removed first; the first failure stops the delete with the festival
    /// row still present.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.repo.get_festival(id).await?;

        let posters = self.repo.get_posters_by_festival(id).await?;
        let count = posters.len();
        for poster in &posters {
            self.posters.delete_record(poster).await?;
        }

        self.repo.delete_festival(id).await?;
        info!(festival_id = %id, posters_deleted = count, "Festival deleted");
        Ok(())
    }
}
