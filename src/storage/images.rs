//! Out-of-band blob storage for note images.
//!
//! Images are written to a flat directory under generated file names; a note
//! only ever stores the public URL of its image.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;

const FALLBACK_EXTENSION: &str = "bin";

/// Where an image landed and how clients should refer to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    url_prefix: String,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into();
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name)
    }

    /// Write `bytes` under a freshly generated file name
    pub async fn save(
        &self,
        bytes: &[u8],
        original_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<StoredImage> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = generate_file_name(original_name, content_type);
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        Ok(StoredImage {
            url: self.url_for(&file_name),
            file_name,
        })
    }

    /// Remove a previously stored image. Missing files are not an error.
    pub async fn remove(&self, file_name: &str) -> Result<()> {
        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `<unix millis>-<8 hex>-<slug>.<ext>`
fn generate_file_name(original_name: Option<&str>, content_type: Option<&str>) -> String {
    let stem = original_name
        .map(Path::new)
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let unique = Uuid::new_v4().simple().to_string();

    format!(
        "{}-{}-{}.{}",
        Utc::now().timestamp_millis(),
        &unique[..8],
        slugify(stem),
        extension_for(original_name, content_type)
    )
}

fn extension_for(original_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = original_name
        .map(Path::new)
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase());

    if let Some(ext) = from_name {
        return ext;
    }

    content_type
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|exts| exts.first())
        .map(|e| e.to_string())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Lowercase ASCII slug, hyphen separated, never empty
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    if slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        slug = "image".to_string();
    }

    slug
}
