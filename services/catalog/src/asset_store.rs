//! Tiered asset storage.
//!
//! The remote object store is authoritative; the local [`DiskCache`] mirrors it
//! on a best-effort basis. Cache failures are logged and counted but never
//! change the outcome of an operation.

use crate::asset::{AssetFormat, AssetId};
use crate::cache::DiskCache;
use crate::error::{AssetError, AssetResult};
use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::transcoder::Transcoder;
use crate::url_resolver::UrlResolver;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::io;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument, warn};

/// Streamed asset body
pub type AssetStream = BoxStream<'static, io::Result<Bytes>>;

/// Which tier served a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Cache,
    Remote,
}

/// An asset opened for reading
pub struct StoredAsset {
    pub id: AssetId,
    pub content_type: &'static str,
    pub source: AssetSource,
    body: AssetStream,
}

impl StoredAsset {
    pub fn into_stream(self) -> AssetStream {
        self.body
    }

    /// Collect the whole body into memory
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        let buf = self
            .body
            .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?;
        Ok(buf.freeze())
    }
}

impl std::fmt::Debug for StoredAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredAsset")
            .field("id", &self.id)
            .field("content_type", &self.content_type)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Remote object store plus local disk cache behind one interface
pub struct AssetStore {
    remote: Arc<dyn ObjectStore>,
    cache: DiskCache,
    transcoder: Transcoder,
    resolver: UrlResolver,
}

impl AssetStore {
    pub fn new(remote: Arc<dyn ObjectStore>, cache: DiskCache, resolver: UrlResolver) -> Self {
        Self {
            remote,
            cache,
            transcoder: Transcoder::new(),
            resolver,
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Transcode a raw upload and store the normalized image.
    ///
    /// The staged transcoder output lives until the end of this call.
    #[instrument(skip(self, raw), fields(input_bytes = raw.len()))]
    pub async fn upload(&self, raw: Bytes) -> AssetResult<AssetId> {
        let transcoded = self.transcoder.transcode(raw).await?;
        let data = transcoded.read_all().await?;
        self.put(data, transcoded.format()).await
    }

    /// Store normalized bytes under a fresh identifier.
    ///
    /// The identifier is only returned once the remote write succeeded. A
    /// failed cache write does not fail the put.
    #[instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn put(&self, data: Bytes, format: AssetFormat) -> AssetResult<AssetId> {
        let id = AssetId::generate(format);
        let timer = std::time::Instant::now();

        self.remote
            .put_object(id.as_str(), data.clone(), format.content_type())
            .await
            .map_err(|e| AssetError::StoreUnavailable(e.to_string()))?;

        metrics::histogram!("catalog.assets.upload_seconds").record(timer.elapsed().as_secs_f64());
        metrics::counter!("catalog.assets.uploaded").increment(1);

        if let Err(e) = self.cache.store(&id, &data).await {
            warn!(asset_id = %id, error = %e, "Failed to cache uploaded asset");
            metrics::counter!("catalog.cache.errors").increment(1);
        }

        info!(asset_id = %id, size_bytes = data.len(), "Asset stored");
        Ok(id)
    }

    /// Open an asset, preferring the local cache
    #[instrument(skip(self, id), fields(asset_id = %id))]
    pub async fn get(&self, id: &AssetId) -> AssetResult<StoredAsset> {
        match self.cache.open_entry(id).await {
            Ok(Some(file)) => {
                debug!("Serving asset from cache");
                metrics::counter!("catalog.cache.hits").increment(1);
                return Ok(StoredAsset {
                    id: id.clone(),
                    content_type: id.content_type(),
                    source: AssetSource::Cache,
                    body: ReaderStream::new(file).boxed(),
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Failed to open cache entry, falling back to remote");
                metrics::counter!("catalog.cache.errors").increment(1);
            }
        }

        metrics::counter!("catalog.cache.misses").increment(1);
        debug!("Fetching asset from remote store");

        let data = self.remote.get_object(id.as_str()).await.map_err(|e| match e {
            ObjectStoreError::NotFound(key) => AssetError::AssetNotFound(key),
            ObjectStoreError::Backend(msg) => AssetError::StoreUnavailable(msg),
        })?;

        if let Err(e) = self.cache.store(id, &data).await {
            warn!(error = %e, "Failed to cache fetched asset");
            metrics::counter!("catalog.cache.errors").increment(1);
        }

        Ok(StoredAsset {
            id: id.clone(),
            content_type: id.content_type(),
            source: AssetSource::Remote,
            body: stream::once(async move { Ok::<_, io::Error>(data) }).boxed(),
        })
    }

    /// Delete an asset from both tiers.
    ///
    /// The cache entry is removed even when the remote delete fails; the remote
    /// failure is still returned.
    #[instrument(skip(self, id), fields(asset_id = %id))]
    pub async fn delete(&self, id: &AssetId) -> AssetResult<()> {
        let remote_result = self.remote.delete_object(id.as_str()).await;

        if let Err(e) = self.cache.remove(id).await {
            warn!(error = %e, "Failed to remove cache entry");
            metrics::counter!("catalog.cache.errors").increment(1);
        }

        remote_result.map_err(|e| AssetError::StoreUnavailable(e.to_string()))?;

        metrics::counter!("catalog.assets.deleted").increment(1);
        info!("Asset deleted");
        Ok(())
    }

    /// Delete a remote object by a stored key that is not a valid identifier.
    ///
    /// Such keys are never cached, so only the remote tier is touched.
    #[instrument(skip(self))]
    pub async fn delete_raw_key(&self, key: &str) -> AssetResult<()> {
        warn!("Deleting asset stored under an unrecognized key");
        self.remote
            .delete_object(key)
            .await
            .map_err(|e| AssetError::StoreUnavailable(e.to_string()))?;

        metrics::counter!("catalog.assets.deleted").increment(1);
        Ok(())
    }

    /// Client-facing URL for an identifier; no I/O
    pub fn resolve_url(&self, id: &AssetId) -> String {
        self.resolver.resolve(id)
    }
}
