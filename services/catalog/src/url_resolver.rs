use crate::asset::AssetId;
use crate::config::{AssetsConfig, S3Config, UrlMode};

/// Maps asset identifiers to client-facing URLs.
///
/// The choice between linking the object store directly and routing through
/// the image download endpoint belongs to the deployment, not the asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlResolver {
    /// `{base}/{id}` on a publicly readable bucket
    Direct { base: String },
    /// `{api_base}/api/v1/images/{id}` served by this service
    Proxy { api_base: String },
}

impl UrlResolver {
    pub fn direct(base: impl Into<String>) -> Self {
        Self::Direct {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn proxy(api_base: impl Into<String>) -> Self {
        Self::Proxy {
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build from configuration; direct mode without a public bucket URL
    /// falls back to the proxy route
    pub fn from_config(assets: &AssetsConfig, s3: &S3Config) -> Self {
        match (assets.url_mode, &s3.public_base_url) {
            (UrlMode::Direct, Some(base)) => Self::direct(base.as_str()),
            _ => Self::proxy(assets.public_api_url.as_str()),
        }
    }

    pub fn resolve(&self, id: &AssetId) -> String {
        match self {
            UrlResolver::Direct { base } => format!("{}/{}", base, id),
            UrlResolver::Proxy { api_base } => format!("{}/api/v1/images/{}", api_base, id),
        }
    }
}
