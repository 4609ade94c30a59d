//! Fixtures shared by unit tests.

use crate::asset_store::AssetStore;
use crate::cache::DiskCache;
use crate::object_store::{MemoryObjectStore, ObjectStore, ObjectStoreError};
use crate::url_resolver::UrlResolver;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Memory store whose operations can be switched to fail
#[derive(Default)]
pub(crate) struct FlakyObjectStore {
    pub inner: MemoryObjectStore,
    pub fail_puts: AtomicBool,
    pub fail_gets: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl FlakyObjectStore {
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for FlakyObjectStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("put refused".to_string()));
        }
        self.inner.put_object(key, body, content_type).await
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("get refused".to_string()));
        }
        self.inner.get_object(key).await
    }

    async fn delete_object(&self, key: &str) -> Result<(), ObjectStoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("delete refused".to_string()));
        }
        self.inner.delete_object(key).await
    }

    async fn object_exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        self.inner.object_exists(key).await
    }
}

/// Asset store over `remote` with a throwaway cache directory.
/// Keep the returned directory alive for the duration of the test.
pub(crate) async fn asset_store(remote: Arc<FlakyObjectStore>) -> (Arc<AssetStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::open(dir.path()).await.unwrap();
    let store = AssetStore::new(remote, cache, UrlResolver::proxy("http://localhost:8080"));
    (Arc::new(store), dir)
}

pub(crate) fn png_fixture(width: u32, height: u32) -> Bytes {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([30, 144, 255, 255]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    Bytes::from(out)
}
