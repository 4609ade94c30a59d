//! Bazaar Catalog Service
//!
//! Festival vendor catalog: festivals, their posters, and the vendor's stock
//! items, each poster and stock item carrying one product image.
//!
//! ## Features
//!
//! - **Image Normalization**: Every upload is decoded and re-encoded to one
//!   lossy format at a fixed quality before it is stored
//! - **Tiered Asset Storage**: S3-compatible object storage as the source of
//!   truth, mirrored by a best-effort local disk cache
//! - **Consistent Metadata**: PostgreSQL rows and stored images are kept in
//!   step by compensating actions, so failed requests leave neither orphaned
//!   images nor rows pointing at missing ones
//! - **Image URLs**: Direct bucket links or a proxy route served from the
//!   local cache, chosen by deployment
//!
//! ## Architecture
//!
//! ```text
//!   HTTP (axum)
//!       │
//!       ▼
//! ┌──────────────┐  rows   ┌──────────────┐
//! │ Managers     │────────▶│ PostgreSQL   │
//! │ (service)    │         └──────────────┘
//! └──────────────┘
//!       │ upload / delete
//!       ▼
//! ┌──────────────┐         ┌──────────────┐
//! │ Transcoder   │         │ URL Resolver │
//! └──────────────┘         └──────────────┘
//!       │                         ▲
//!       ▼                         │
//! ┌──────────────────────────────────────┐
//! │ Asset Store                          │
//! │   remote (S3)  ──▶  disk cache       │
//! └──────────────────────────────────────┘
//! ```

pub mod api;
pub mod asset;
pub mod asset_store;
pub mod cache;
pub mod config;
pub mod error;
pub mod object_store;
pub mod repository;
pub mod service;
pub mod transcoder;
pub mod url_resolver;

#[cfg(test)]
mod testing;

pub use asset::{AssetFormat, AssetId};
pub use asset_store::{AssetSource, AssetStore, StoredAsset};
pub use cache::DiskCache;
pub use config::Config;
pub use error::{AssetError, RepositoryError, ServiceError};
pub use object_store::{MemoryObjectStore, ObjectStore, S3ObjectStore};
pub use repository::{PgRepository, Repository};
pub use service::Catalog;
pub use transcoder::Transcoder;
pub use url_resolver::UrlResolver;
