use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use super::auth::AuthUser;
use super::error::ApiJson;
use super::AppState;
use crate::entity::{CreateNote, Note, NoteUpdate};
use crate::error::{MurmurError, Result};
use crate::service::ImageUpload;

/// Multipart field that carries the image
pub const IMAGE_FIELD: &str = "image";

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateNote>,
) -> Result<(StatusCode, Json<Note>)> {
    debug!(subject = %user.subject, "Create note request");
    let note = state.service.create(req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>> {
    Ok(Json(state.service.list().await?))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>> {
    Ok(Json(state.service.get(&id).await?))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<NoteUpdate>,
) -> Result<Json<Note>> {
    Ok(Json(state.service.update(&id, update).await?))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.service.delete(&id).await?;
    Ok(Json(MessageResponse {
        message: "Note deleted successfully".to_string(),
    }))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>> {
    Ok(Json(state.service.toggle_favorite(&id).await?))
}

pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Note>> {
    let mut multipart = multipart.map_err(|_| {
        MurmurError::validation(format!(
            "Expected a multipart/form-data body with an '{}' field",
            IMAGE_FIELD
        ))
    })?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        upload = Some(ImageUpload {
            bytes: bytes.to_vec(),
            file_name,
            content_type,
        });
        break;
    }

    let upload = upload.ok_or_else(|| MurmurError::validation("No image uploaded"))?;
    Ok(Json(state.service.attach_image(&id, upload).await?))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                notes: Some(count),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "error".to_string(),
                notes: None,
                error: Some(e.to_string()),
            }),
        ),
    }
}

fn multipart_error(e: MultipartError) -> MurmurError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        MurmurError::PayloadTooLarge(e.body_text())
    } else {
        MurmurError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    }
}
