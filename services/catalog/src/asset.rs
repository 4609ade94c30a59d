//! Asset identifiers and formats.
//!
//! An asset identifier is `{uuid-v7}.{extension}`: time-ordered, random, never
//! derived from content. Identifiers double as object keys and cache file
//! names, so anything accepted from outside the process goes through
//! [`AssetId::parse`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const MAX_ID_LEN: usize = 128;

/// Encoded image format of a stored asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    Jpeg,
    Png,
    Webp,
}

impl AssetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AssetFormat::Jpeg => "jpeg",
            AssetFormat::Png => "png",
            AssetFormat::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AssetFormat::Jpeg => "image/jpeg",
            AssetFormat::Png => "image/png",
            AssetFormat::Webp => "image/webp",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(AssetFormat::Jpeg),
            "png" => Some(AssetFormat::Png),
            "webp" => Some(AssetFormat::Webp),
            _ => None,
        }
    }
}

/// Opaque identifier of a stored asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

/// Why an untrusted string was rejected as an asset identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAssetId {
    #[error("asset id is empty")]
    Empty,
    #[error("asset id exceeds {MAX_ID_LEN} characters")]
    TooLong,
    #[error("asset id contains a disallowed character or sequence")]
    Disallowed,
}

impl AssetId {
    /// Generate a fresh identifier for the given format
    pub fn generate(format: AssetFormat) -> Self {
        Self(format!("{}.{}", Uuid::now_v7(), format.extension()))
    }

    /// Validate an identifier received from outside the process.
    ///
    /// Only `[A-Za-z0-9._-]` is accepted, with no leading dot, no `..` and no
    /// `.tmp` suffix. Identifiers are then safe as URL segments and can never
    /// name a cache staging file.
    pub fn parse(raw: &str) -> Result<Self, InvalidAssetId> {
        if raw.is_empty() {
            return Err(InvalidAssetId::Empty);
        }
        if raw.len() > MAX_ID_LEN {
            return Err(InvalidAssetId::TooLong);
        }
        let allowed = raw
            .chars()
            .all(|c| matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.'));
        if !allowed || raw.starts_with('.') || raw.contains("..") || raw.ends_with(".tmp") {
            return Err(InvalidAssetId::Disallowed);
        }
        Ok(Self(raw.to_string()))
    }

    /// Parse the identifier stored on a metadata row; empty means "no asset"
    pub fn from_row(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Self::parse(raw).ok()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format implied by the identifier's suffix
    pub fn format(&self) -> Option<AssetFormat> {
        self.0
            .rsplit_once('.')
            .and_then(|(_, ext)| AssetFormat::from_extension(ext))
    }

    /// Content type for serving, falling back to a generic binary type
    pub fn content_type(&self) -> &'static str {
        self.format()
            .map(|f| f.content_type())
            .unwrap_or("application/octet-stream")
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
