use super::compensation::compensate;
use super::festival::Festival;
use super::row_image::RowImage;
use crate::asset::AssetId;
use crate::asset_store::AssetStore;
use crate::error::{RepositoryError, ServiceError, ServiceResult};
use crate::repository::{FestivalRecord, NewPoster, PosterRecord, PosterStatus, Repository};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Poster with its festival and a client-facing image link
#[derive(Debug, Clone, Serialize)]
pub struct Poster {
    pub id: Uuid,
    pub festival: Festival,
    pub name: String,
    pub description: String,
    pub status: PosterStatus,
    pub image_id: Option<AssetId>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new poster; the image travels separately
#[derive(Debug, Clone)]
pub struct PosterDraft {
    pub festival_id: Uuid,
    pub name: String,
    pub description: String,
}

/// Poster lifecycle, keeping rows and their images consistent
#[derive(Clone)]
pub struct PosterManager {
    repo: Arc<dyn Repository>,
    assets: Arc<AssetStore>,
}

impl PosterManager {
    pub fn new(repo: Arc<dyn Repository>, assets: Arc<AssetStore>) -> Self {
        Self { repo, assets }
    }

    fn hydrate(&self, row: PosterRecord, festival: FestivalRecord) -> Poster {
        let image_id = AssetId::from_row(&row.image_id);
        let image_url = image_id.as_ref().map(|id| self.assets.resolve_url(id));
        Poster {
            id: row.id,
            festival: festival.into(),
            name: row.name,
            description: row.description,
            status: row.status,
            image_id,
            image_url,
            created_at: row.created_at,
        }
    }

    /// Upload the image, then insert the row.
    ///
    /// Any rejection after the upload deletes the image again before
    /// returning, so a failed create never leaves a stored image behind.
    #[instrument(skip(self, draft, image), fields(festival_id = %draft.festival_id, name = %draft.name))]
    pub async fn create(&self, draft: PosterDraft, image: Bytes) -> ServiceResult<Poster> {
        let image_id = self.assets.upload(image).await?;

        match self.repo.get_poster_by_name(draft.festival_id, &draft.name).await {
            Ok(_) => {
                return Err(compensate(&self.assets, &image_id, ServiceError::AlreadyExists).await)
            }
            Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(compensate(&self.assets, &image_id, e.into()).await),
        }

        let festival = match self.repo.get_festival(draft.festival_id).await {
            Ok(festival) => festival,
            Err(e) => return Err(compensate(&self.assets, &image_id, e.into()).await),
        };

        let new_poster = NewPoster {
            festival_id: draft.festival_id,
            name: draft.name,
            description: draft.description,
            image_id: image_id.clone(),
        };
        // A concurrent create with the same name surfaces here as AlreadyExists
        let row = match self.repo.register_poster(&new_poster).await {
            Ok(row) => row,
            Err(e) => return Err(compensate(&self.assets, &image_id, e.into()).await),
        };

        info!(poster_id = %row.id, asset_id = %image_id, "Poster created");
        Ok(self.hydrate(row, festival))
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Poster> {
        let row = self.repo.get_poster(id).await?;
        let festival = self.repo.get_festival(row.festival_id).await?;
        Ok(self.hydrate(row, festival))
    }

    pub async fn get_by_festival(&self, festival_id: Uuid) -> ServiceResult<Vec<Poster>> {
        let festival = self.repo.get_festival(festival_id).await?;
        let rows = self.repo.get_posters_by_festival(festival_id).await?;
        Ok(rows
            .into_iter()
            .map(|row| self.hydrate(row, festival.clone()))
            .collect())
    }

    pub async fn get_by_name(&self, festival_id: Uuid, name: &str) -> ServiceResult<Poster> {
        let row = self.repo.get_poster_by_name(festival_id, name).await?;
        let festival = self.repo.get_festival(festival_id).await?;
        Ok(self.hydrate(row, festival))
    }

    pub async fn edit(&self, id: Uuid, name: &str, description: &str) -> ServiceResult<()> {
        self.repo.update_poster(id, name, description).await?;
        Ok(())
    }

    pub async fn change_status(&self, id: Uuid, status: PosterStatus) -> ServiceResult<()> {
        self.repo.update_poster_status(id, status).await?;
        info!(poster_id = %id, status = %status, "Poster status changed");
        Ok(())
    }

    /// Replace the poster image.
    ///
    /// The old image is deleted before the new one is uploaded. If the upload
    /// or the row update then fails, the row keeps pointing at the deleted
    /// image until the next successful update.
    #[instrument(skip(self, image))]
    pub async fn update_image(&self, id: Uuid, image: Bytes) -> ServiceResult<AssetId> {
        let row = self.repo.get_poster(id).await?;

        RowImage::from_row(&row.image_id).delete(&self.assets).await?;

        let image_id = self.assets.upload(image).await?;
        if let Err(e) = self.repo.update_poster_image(id, &image_id).await {
            return Err(compensate(&self.assets, &image_id, e.into()).await);
        }

        info!(poster_id = %id, asset_id = %image_id, "Poster image replaced");
        Ok(image_id)
    }

    /// Delete the image, then the row. A failed image delete keeps the row.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let row = self.repo.get_poster(id).await?;
        self.delete_record(&row).await
    }

    pub(crate) async fn delete_record(&self, row: &PosterRecord) -> ServiceResult<()> {
        let image = RowImage::from_row(&row.image_id);
        image.delete(&self.assets).await?;

        match (self.repo.delete_poster(row.id).await, image) {
            (Ok(()), _) => {}
            (Err(RepositoryError::NotFound), _) => return Err(ServiceError::NotFound),
            (Err(source), RowImage::Asset(asset_id)) => {
                return Err(ServiceError::InternalInconsistency { asset_id, source })
            }
            (Err(source), _) => return Err(source.into()),
        }

        info!(poster_id = %row.id, image_id = %row.image_id, "Poster deleted");
        Ok(())
    }
}
