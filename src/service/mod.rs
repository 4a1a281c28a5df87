//! Note Service: validation and orchestration between the HTTP surface and
//! the stores.
//!
//! Every operation is a single round trip with no state kept between calls.
//! The SQLite connection is shared behind an async mutex; blob writes happen
//! outside the lock.

pub mod validation;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entity::{CreateNote, Note, NoteUpdate};
use crate::error::{MurmurError, Result};
use crate::storage::{ImageStore, NoteStore};

/// An image as received from a client, before it is stored
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl ImageUpload {
    /// Read an image from disk, guessing its content type from the extension
    pub async fn from_path(path: &std::path::Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());

        Ok(Self {
            bytes,
            file_name,
            content_type,
        })
    }
}

#[derive(Clone)]
pub struct NoteService {
    store: Arc<Mutex<NoteStore>>,
    images: Arc<ImageStore>,
}

impl NoteService {
    pub fn new(store: NoteStore, images: ImageStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            images: Arc::new(images),
        }
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub async fn create(&self, req: CreateNote) -> Result<Note> {
        let new = validation::validate_create(req)?;
        let note = self.store.lock().await.insert(new)?;
        info!(id = %note.id, note_type = %note.note_type, "Created note");
        Ok(note)
    }

    /// All notes, newest first
    pub async fn list(&self) -> Result<Vec<Note>> {
        self.store.lock().await.list_recent()
    }

    pub async fn get(&self, id: &str) -> Result<Note> {
        let uuid = parse_id(id)?;
        self.store
            .lock()
            .await
            .get(&uuid)?
            .ok_or_else(|| not_found(id))
    }

    /// Overwrite title and/or content. An empty update returns the note as is.
    pub async fn update(&self, id: &str, update: NoteUpdate) -> Result<Note> {
        validation::validate_update(&update)?;
        let uuid = parse_id(id)?;
        let store = self.store.lock().await;

        let note = if update.is_empty() {
            store.get(&uuid)?
        } else {
            store.update(&uuid, &update)?
        };

        let note = note.ok_or_else(|| not_found(id))?;
        debug!(id = %note.id, "Updated note");
        Ok(note)
    }

    /// Delete is idempotent: an unknown or malformed id is still a success.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            debug!(id, "Delete of malformed id treated as no-op");
            return Ok(());
        };

        if self.store.lock().await.delete(&uuid)? {
            info!(%uuid, "Deleted note");
        } else {
            debug!(%uuid, "Delete of missing note treated as no-op");
        }
        Ok(())
    }

    pub async fn toggle_favorite(&self, id: &str) -> Result<Note> {
        let uuid = parse_id(id)?;
        let note = self
            .store
            .lock()
            .await
            .toggle_favorite(&uuid)?
            .ok_or_else(|| not_found(id))?;
        debug!(id = %note.id, is_favorite = note.is_favorite, "Toggled favorite");
        Ok(note)
    }

    /// Store the image blob, then point the note at it.
    ///
    /// The note is only touched after the blob write succeeded. If the note
    /// disappears between the existence check and the update, the blob is
    /// removed again.
    pub async fn attach_image(&self, id: &str, upload: ImageUpload) -> Result<Note> {
        validation::validate_image_payload(&upload.bytes, upload.content_type.as_deref())?;
        let uuid = parse_id(id)?;

        if self.store.lock().await.get(&uuid)?.is_none() {
            return Err(not_found(id));
        }

        let stored = self
            .images
            .save(
                &upload.bytes,
                upload.file_name.as_deref(),
                upload.content_type.as_deref(),
            )
            .await
            .map_err(|e| MurmurError::Storage(format!("Failed to store image: {}", e)))?;

        let updated = self.store.lock().await.set_image_url(&uuid, &stored.url);
        match updated {
            Ok(Some(note)) => {
                info!(id = %note.id, url = %stored.url, bytes = upload.bytes.len(), "Attached image");
                Ok(note)
            }
            Ok(None) => {
                self.discard_blob(&stored.file_name).await;
                Err(not_found(id))
            }
            Err(e) => {
                self.discard_blob(&stored.file_name).await;
                Err(e)
            }
        }
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.lock().await.count()
    }

    async fn discard_blob(&self, file_name: &str) {
        if let Err(e) = self.images.remove(file_name).await {
            warn!(file_name, error = %e, "Failed to remove orphaned image");
        }
    }
}

/// A malformed id can never name a stored note, so it reads as not found.
fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| not_found(id))
}

fn not_found(id: &str) -> MurmurError {
    MurmurError::NotFound(id.to_string())
}
