//! Image intake: hash an evidence image and embed it as a data URI.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::hashing::sha256_file;

/// Extensions accepted as evidence images.
pub(crate) const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// A selected image, ready to become an evidence record.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageSelection {
    pub(crate) path: String,
    pub(crate) hash: String,
    pub(crate) base64: String,
    pub(crate) file_name: String,
}

/// Hash an image file and build its `data:image/<ext>;base64,` URI.
pub(crate) fn inspect_image(path: &Path) -> Result<ImageSelection> {
    let ext = image_extension(path)?;
    let hash = sha256_file(path).with_context(|| format!("hash image {}", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!(path = %path.display(), bytes = bytes.len(), %hash, "image inspected");
    Ok(ImageSelection {
        path: path.display().to_string(),
        hash,
        base64: format!("data:image/{ext};base64,{}", BASE64.encode(&bytes)),
        file_name,
    })
}

fn image_extension(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| anyhow!("file has no extension: {}", path.display()))?;
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(anyhow!(
            "unsupported image type .{ext} (expected one of {})",
            IMAGE_EXTENSIONS.join(", ")
        ));
    }
    Ok(ext)
}
