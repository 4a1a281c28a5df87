use thiserror::Error;

#[derive(Error, Debug)]
pub enum MurmurError {
    #[error("{0}")]
    Validation(String),

    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded {status}: {message}")]
    Api { status: u16, message: String },
}

impl MurmurError {
    pub fn validation(message: impl Into<String>) -> Self {
        MurmurError::Validation(message.into())
    }

    /// Rebuild a server-side error from a response status and its `message` body.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => MurmurError::Validation(message),
            401 => MurmurError::Unauthorized,
            404 => MurmurError::NotFound(
                message
                    .strip_prefix("Note not found: ")
                    .unwrap_or(&message)
                    .to_string(),
            ),
            413 => MurmurError::PayloadTooLarge(message),
            _ => MurmurError::Api { status, message },
        }
    }
}

impl From<rusqlite::Error> for MurmurError {
    fn from(e: rusqlite::Error) -> Self {
        MurmurError::Storage(format!("SQLite error: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            MurmurError::from_status(400, "bad".to_string()),
            MurmurError::Validation(m) if m == "bad"
        ));
        assert!(matches!(
            MurmurError::from_status(401, String::new()),
            MurmurError::Unauthorized
        ));
        assert!(matches!(
            MurmurError::from_status(404, "Note not found: abc".to_string()),
            MurmurError::NotFound(id) if id == "abc"
        ));
        assert!(matches!(
            MurmurError::from_status(503, "down".to_string()),
            MurmurError::Api { status: 503, .. }
        ));
    }

    #[test]
    fn test_sqlite_error_becomes_storage() {
        let err: MurmurError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, MurmurError::Storage(ref m) if m.starts_with("SQLite error")));
    }
}
