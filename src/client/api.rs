use std::future::Future;

use uuid::Uuid;

use crate::entity::{CreateNote, Note, NoteUpdate};
use crate::error::Result;
use crate::service::{ImageUpload, NoteService};

/// The note operations a client can ask of a server.
///
/// Implemented over HTTP by [`super::HttpNoteApi`] and directly by
/// [`NoteService`] for in-process use.
pub trait NoteApi {
    fn list(&self) -> impl Future<Output = Result<Vec<Note>>> + Send;

    fn get(&self, id: Uuid) -> impl Future<Output = Result<Note>> + Send;

    fn create(&self, draft: CreateNote) -> impl Future<Output = Result<Note>> + Send;

    fn update(&self, id: Uuid, update: NoteUpdate)
        -> impl Future<Output = Result<Note>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send;

    fn toggle_favorite(&self, id: Uuid) -> impl Future<Output = Result<Note>> + Send;

    fn attach_image(
        &self,
        id: Uuid,
        upload: ImageUpload,
    ) -> impl Future<Output = Result<Note>> + Send;
}

impl NoteApi for NoteService {
    async fn list(&self) -> Result<Vec<Note>> {
        NoteService::list(self).await
    }

    async fn get(&self, id: Uuid) -> Result<Note> {
        NoteService::get(self, &id.to_string()).await
    }

    async fn create(&self, draft: CreateNote) -> Result<Note> {
        NoteService::create(self, draft).await
    }

    async fn update(&self, id: Uuid, update: NoteUpdate) -> Result<Note> {
        NoteService::update(self, &id.to_string(), update).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        NoteService::delete(self, &id.to_string()).await
    }

    async fn toggle_favorite(&self, id: Uuid) -> Result<Note> {
        NoteService::toggle_favorite(self, &id.to_string()).await
    }

    async fn attach_image(&self, id: Uuid, upload: ImageUpload) -> Result<Note> {
        NoteService::attach_image(self, &id.to_string(), upload).await
    }
}
