//! Store photo uploads.
//!
//! Photos are decoded, resized to a fixed width with the height scaled to
//! keep the aspect ratio, re-encoded in their original format and written
//! to the uploads directory under a random file name.

use std::io::Cursor;
use std::path::Path;

use image::ImageFormat;
use image::imageops::FilterType;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Width every stored photo is resized to, in pixels.
pub const PHOTO_WIDTH: u32 = 800;

/// Errors that can occur while storing a photo.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The declared content type is not an image.
    #[error("That filetype isn't allowed!")]
    UnsupportedType,

    /// The bytes could not be decoded or re-encoded.
    #[error("could not process image: {0}")]
    Image(#[from] image::ImageError),

    /// Writing the file failed.
    #[error("could not write photo: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking resize task panicked or was cancelled.
    #[error("image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl UploadError {
    /// Whether the error is caused by the submitted file rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedType | Self::Image(_))
    }
}

/// A photo received from the store form.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Declared MIME type of the part.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Whether a declared MIME type is accepted for store photos.
#[must_use]
pub fn is_image_type(content_type: &str) -> bool {
    content_type.trim().to_ascii_lowercase().starts_with("image/")
}

/// Height that keeps `width x height` in proportion at `target_width`.
#[must_use]
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return height.max(1);
    }
    let scaled = (u64::from(height) * u64::from(target_width) + u64::from(width) / 2)
        / u64::from(width);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Validate, resize and store a photo, returning its file name.
///
/// # Errors
///
/// Returns `UploadError::UnsupportedType` for non-image content types,
/// `UploadError::Image` for undecodable files and `UploadError::Io` if the
/// file cannot be written.
#[instrument(skip(upload), fields(content_type = %upload.content_type, size = upload.bytes.len()))]
pub async fn save_photo(uploads_dir: &Path, upload: PhotoUpload) -> Result<String, UploadError> {
    if !is_image_type(&upload.content_type) {
        return Err(UploadError::UnsupportedType);
    }

    let (encoded, format) =
        tokio::task::spawn_blocking(move || resize_photo(&upload.bytes)).await??;

    let extension = format.extensions_str().first().copied().unwrap_or("img");
    let file_name = format!("{}.{extension}", Uuid::new_v4());

    tokio::fs::create_dir_all(uploads_dir).await?;
    tokio::fs::write(uploads_dir.join(&file_name), encoded).await?;

    tracing::info!(file_name = %file_name, "Stored store photo");
    Ok(file_name)
}

/// Delete a stored photo that never ended up attached to a store.
///
/// Failures are logged rather than returned; a leftover file is harmless.
#[instrument]
pub async fn remove_photo(uploads_dir: &Path, file_name: &str) {
    match tokio::fs::remove_file(uploads_dir.join(file_name)).await {
        Ok(()) => tracing::info!(file_name = %file_name, "Removed unused store photo"),
        Err(e) => tracing::warn!(file_name = %file_name, error = %e, "Could not remove store photo"),
    }
}

/// Decode, resize to [`PHOTO_WIDTH`] and re-encode in the source format.
fn resize_photo(bytes: &[u8]) -> Result<(Vec<u8>, ImageFormat), UploadError> {
    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;

    let height = scaled_height(img.width(), img.height(), PHOTO_WIDTH);
    let resized = img.resize_exact(PHOTO_WIDTH, height, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, format)?;
    Ok((out.into_inner(), format))
}
