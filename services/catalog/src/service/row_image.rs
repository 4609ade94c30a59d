use crate::asset::AssetId;
use crate::asset_store::AssetStore;
use crate::error::ServiceResult;
use tracing::warn;

/// Image reference held by a poster or stock item row
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RowImage {
    None,
    Asset(AssetId),
    /// Non-empty key that does not parse as an identifier
    Unrecognized(String),
}

impl RowImage {
    pub(crate) fn from_row(raw: &str) -> Self {
        if raw.is_empty() {
            return RowImage::None;
        }
        match AssetId::parse(raw) {
            Ok(id) => RowImage::Asset(id),
            Err(e) => {
                warn!(image_id = %raw, error = %e, "Row references an unrecognized image key");
                RowImage::Unrecognized(raw.to_string())
            }
        }
    }

    /// Delete the referenced image, if any
    pub(crate) async fn delete(&self, assets: &AssetStore) -> ServiceResult<()> {
        match self {
            RowImage::None => {}
            RowImage::Asset(id) => assets.delete(id).await?,
            RowImage::Unrecognized(key) => assets.delete_raw_key(key).await?,
        }
        Ok(())
    }
}
