// src/entity/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    #[default]
    Text,
    Audio,
}

impl std::fmt::Display for NoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteType::Text => write!(f, "text"),
            NoteType::Audio => write!(f, "audio"),
        }
    }
}

impl std::str::FromStr for NoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(NoteType::Text),
            "audio" => Ok(NoteType::Audio),
            _ => Err(format!("Invalid note type: {}", s)),
        }
    }
}

/// A persisted note as the store and the wire see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    /// Seconds of recorded audio; always 0 for text notes.
    pub recorded_time: u64,
    pub timestamp: DateTime<Utc>,
    pub is_favorite: bool,
    pub image_url: Option<String>,
}

/// Validated fields for a note that does not exist yet.
///
/// The store assigns `id` and `timestamp` when it persists one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub note_type: NoteType,
    pub recorded_time: u64,
}

impl NewNote {
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            note_type: NoteType::Text,
            recorded_time: 0,
        }
    }

    pub fn audio(title: impl Into<String>, content: impl Into<String>, recorded_time: u64) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            note_type: NoteType::Audio,
            recorded_time,
        }
    }
}

/// Body of a create request. Every field is optional on the wire so that
/// missing fields surface as validation errors rather than parse failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub note_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_time: Option<i64>,
}

impl CreateNote {
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            note_type: Some(NoteType::Text.to_string()),
            recorded_time: None,
        }
    }

    pub fn audio(title: impl Into<String>, content: impl Into<String>, recorded_time: u64) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            note_type: Some(NoteType::Audio.to_string()),
            recorded_time: Some(recorded_time as i64),
        }
    }
}

/// Fields a general update may touch. Anything else in the body is rejected;
/// favorites and images have their own operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl NoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}
