//! HTTP transport for the note API.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;
use uuid::Uuid;

use super::api::NoteApi;
use crate::entity::{CreateNote, Note, NoteUpdate};
use crate::error::{MurmurError, Result};
use crate::server::error::ErrorBody;
use crate::server::routes::IMAGE_FIELD;
use crate::service::ImageUpload;

#[derive(Clone)]
pub struct HttpNoteApi {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpNoteApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/notes{}", self.base_url, path)
    }

    fn note_url(&self, id: Uuid, suffix: &str) -> String {
        self.url(&format!("/{}{}", id, suffix))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Note API response");

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let fallback = status.canonical_reason().unwrap_or("Request failed").to_string();
        let message = match response.json::<ErrorBody>().await {
            Ok(ErrorBody {
                message,
                error: Some(detail),
            }) => format!("{}: {}", message, detail),
            Ok(ErrorBody { message, .. }) => message,
            Err(_) => fallback,
        };

        Err(MurmurError::from_status(status.as_u16(), message))
    }
}

impl NoteApi for HttpNoteApi {
    async fn list(&self) -> Result<Vec<Note>> {
        self.send(self.http.get(self.url(""))).await
    }

    async fn get(&self, id: Uuid) -> Result<Note> {
        self.send(self.http.get(self.note_url(id, ""))).await
    }

    async fn create(&self, draft: CreateNote) -> Result<Note> {
        self.send(self.http.post(self.url("")).json(&draft)).await
    }

    async fn update(&self, id: Uuid, update: NoteUpdate) -> Result<Note> {
        self.send(self.http.put(self.note_url(id, "")).json(&update))
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let _: IgnoredAny = self.send(self.http.delete(self.note_url(id, ""))).await?;
        Ok(())
    }

    async fn toggle_favorite(&self, id: Uuid) -> Result<Note> {
        self.send(self.http.patch(self.note_url(id, "/favorite")))
            .await
    }

    async fn attach_image(&self, id: Uuid, upload: ImageUpload) -> Result<Note> {
        let file_name = upload.file_name.unwrap_or_else(|| "image".to_string());
        let mut part = Part::bytes(upload.bytes).file_name(file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let form = Form::new().part(IMAGE_FIELD, part);
        self.send(self.http.patch(self.note_url(id, "/image")).multipart(form))
            .await
    }
}
