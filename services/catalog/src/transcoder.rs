//! Image normalization.
//!
//! Every upload is decoded and re-encoded to a single lossy format at a fixed
//! quality, so callers never choose encoding parameters. The encoded output is
//! staged in a temporary file owned by [`Transcoded`]; dropping it removes the
//! file whether or not the caller got as far as reading it.

use crate::asset::AssetFormat;
use crate::error::{AssetError, AssetResult};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageReader};
use std::io::{BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Output format for every stored image
pub const TARGET_FORMAT: AssetFormat = AssetFormat::Jpeg;

/// Encoder quality (0-100) for every stored image
pub const TARGET_QUALITY: u8 = 75;

/// Transcoded image staged on disk
#[derive(Debug)]
pub struct Transcoded {
    file: NamedTempFile,
    format: AssetFormat,
    len: u64,
}

impl Transcoded {
    pub fn format(&self) -> AssetFormat {
        self.format
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the whole staged output from its start
    pub async fn read_all(&self) -> AssetResult<Bytes> {
        let data = tokio::fs::read(self.file.path()).await?;
        Ok(Bytes::from(data))
    }
}

/// Decodes arbitrary uploads and re-encodes them to [`TARGET_FORMAT`]
#[derive(Debug, Clone, Default)]
pub struct Transcoder;

impl Transcoder {
    pub fn new() -> Self {
        Self
    }

    /// Normalize raw upload bytes.
    ///
    /// Decoding and encoding are CPU-bound and run on the blocking pool.
    #[instrument(skip(self, raw), fields(input_bytes = raw.len()))]
    pub async fn transcode(&self, raw: Bytes) -> AssetResult<Transcoded> {
        tokio::task::spawn_blocking(move || transcode_blocking(&raw))
            .await
            .map_err(|e| AssetError::Staging(std::io::Error::other(e)))?
    }
}

fn transcode_blocking(raw: &[u8]) -> AssetResult<Transcoded> {
    let image = decode(raw)?;

    // JPEG has no alpha channel
    let rgb = image.to_rgb8();

    let mut file = NamedTempFile::new()?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        JpegEncoder::new_with_quality(&mut writer, TARGET_QUALITY)
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| AssetError::Staging(std::io::Error::other(e)))?;
        writer.flush()?;
    }
    let len = file.as_file_mut().seek(SeekFrom::End(0))?;
    file.as_file_mut().seek(SeekFrom::Start(0))?;

    debug!(
        width = rgb.width(),
        height = rgb.height(),
        output_bytes = len,
        "Image transcoded"
    );

    Ok(Transcoded {
        file,
        format: TARGET_FORMAT,
        len,
    })
}

fn decode(raw: &[u8]) -> AssetResult<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| AssetError::InvalidImage(e.to_string()))?;

    if reader.format().is_none() {
        return Err(AssetError::InvalidImage("unrecognized image format".to_string()));
    }

    reader
        .decode()
        .map_err(|e| AssetError::InvalidImage(e.to_string()))
}
