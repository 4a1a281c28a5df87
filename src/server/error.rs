//! Handler-boundary error mapping.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::MurmurError;

/// JSON error body: `{message, error?}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MurmurError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MurmurError::Validation(_) => StatusCode::BAD_REQUEST,
            MurmurError::NotFound(_) => StatusCode::NOT_FOUND,
            MurmurError::Unauthorized => StatusCode::UNAUTHORIZED,
            MurmurError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            MurmurError::Storage(_)
            | MurmurError::Io(_)
            | MurmurError::Json(_)
            | MurmurError::Config(_)
            | MurmurError::Http(_)
            | MurmurError::Api { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MurmurError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server faults keep a generic message; the detail goes in `error`.
        let body = if status.is_server_error() {
            error!(error = %self, "Request failed");
            ErrorBody {
                message: "Server Error".to_string(),
                error: Some(self.to_string()),
            }
        } else {
            ErrorBody {
                message: self.to_string(),
                error: None,
            }
        };

        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections use the same `{message}` body as every
/// other client error.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = MurmurError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(MurmurError::Validation(rejection.body_text())),
        }
    }
}
