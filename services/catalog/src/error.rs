//! Error types shared by the asset store, repository and managers.

use crate::asset::AssetId;
use thiserror::Error;

/// Errors raised by the transcoder and the tiered asset store.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Upload could not be decoded as an image
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Remote object store I/O failed
    #[error("object store unavailable: {0}")]
    StoreUnavailable(String),

    /// Identifier absent from both the cache and the remote store
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// Temporary staging of transcoded output failed
    #[error("failed to stage transcoded image: {0}")]
    Staging(#[from] std::io::Error),
}

/// Errors raised by the metadata repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors surfaced by the festival, poster and stock item managers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("asset storage failed: {0}")]
    Storage(#[source] AssetError),

    #[error("repository failed: {0}")]
    Repository(#[source] RepositoryError),

    /// The asset was removed but its row could not be; retrying the delete removes the row
    #[error("asset {asset_id} deleted but row delete failed: {source}")]
    InternalInconsistency {
        asset_id: AssetId,
        #[source]
        source: RepositoryError,
    },

    /// The compensating delete failed too, so `asset_id` is a leaked blob
    #[error("{cause}; compensating delete of asset {asset_id} failed: {compensation}")]
    CompensationFailed {
        asset_id: AssetId,
        cause: Box<ServiceError>,
        #[source]
        compensation: AssetError,
    },
}

impl ServiceError {
    /// The error a client should see, looking through a failed compensation.
    pub fn primary(&self) -> &ServiceError {
        match self {
            ServiceError::CompensationFailed { cause, .. } => cause.primary(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.primary(), ServiceError::NotFound)
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self.primary(), ServiceError::AlreadyExists)
    }
}

impl From<AssetError> for ServiceError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::InvalidImage(reason) => ServiceError::InvalidImage(reason),
            other => ServiceError::Storage(other),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::NotFound,
            RepositoryError::AlreadyExists => ServiceError::AlreadyExists,
            other => ServiceError::Repository(other),
        }
    }
}

pub type AssetResult<T> = Result<T, AssetError>;
pub type ServiceResult<T> = Result<T, ServiceError>;
