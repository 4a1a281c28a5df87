//! Field rules for incoming note requests.

use crate::entity::{CreateNote, NewNote, NoteType, NoteUpdate};
use crate::error::{MurmurError, Result};

pub const MAX_TITLE_LENGTH: usize = 500;
pub const MAX_CONTENT_SIZE: usize = 102_400; // 100KB

/// Turn a raw create request into a storable note.
///
/// `recordedTime` is required for audio notes and forced to 0 for text notes,
/// whatever the caller sent.
pub fn validate_create(req: CreateNote) -> Result<NewNote> {
    let title = required_text("title", req.title)?;
    validate_title(&title)?;

    let content = required_text("content", req.content)?;
    validate_content(&content)?;

    let note_type: NoteType = required_text("type", req.note_type)?
        .parse()
        .map_err(|_| MurmurError::validation("Type must be one of: text, audio"))?;

    let recorded_time = match note_type {
        NoteType::Audio => {
            let secs = req.recorded_time.ok_or_else(|| {
                MurmurError::validation("Recorded time is required for audio notes")
            })?;
            if secs < 0 {
                return Err(MurmurError::validation(
                    "Recorded time must be a non-negative number of seconds",
                ));
            }
            secs as u64
        }
        NoteType::Text => 0,
    };

    Ok(NewNote {
        title,
        content,
        note_type,
        recorded_time,
    })
}

/// Both fields are optional, but a provided one may not be blank.
pub fn validate_update(update: &NoteUpdate) -> Result<()> {
    if let Some(ref title) = update.title {
        if title.trim().is_empty() {
            return Err(MurmurError::validation("Title cannot be empty"));
        }
        validate_title(title)?;
    }
    if let Some(ref content) = update.content {
        if content.trim().is_empty() {
            return Err(MurmurError::validation("Content cannot be empty"));
        }
        validate_content(content)?;
    }
    Ok(())
}

pub fn validate_image_payload(bytes: &[u8], content_type: Option<&str>) -> Result<()> {
    if bytes.is_empty() {
        return Err(MurmurError::validation("No image uploaded"));
    }
    if let Some(ct) = content_type {
        if !ct.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(MurmurError::validation(format!(
                "Unsupported content type '{}': expected an image",
                ct
            )));
        }
    }
    Ok(())
}

fn required_text(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MurmurError::validation(format!("{} is required", capitalize(field)))),
    }
}

fn validate_title(title: &str) -> Result<()> {
    let len = title.trim().chars().count();
    if len > MAX_TITLE_LENGTH {
        return Err(MurmurError::validation(format!(
            "Title too long: {} characters (max {})",
            len, MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<()> {
    if content.len() > MAX_CONTENT_SIZE {
        return Err(MurmurError::validation(format!(
            "Content too large: {} bytes (max {})",
            content.len(),
            MAX_CONTENT_SIZE
        )));
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
