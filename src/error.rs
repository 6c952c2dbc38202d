use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

/// Failures raised while talking to the language-model API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{message}")]
    Request { message: String },

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse model response: {message}")]
    Decode { message: String },

    #[error("Response blocked by the model: {reason}")]
    Blocked { reason: String },

    #[error("Model returned no answer")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

/// Error returned by the HTTP handlers, always serialized as `{"message": ...}`.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Maps a service failure onto its HTTP status. Failures that carry no
    /// message of their own are reported with `fallback`.
    pub fn from_search_error(err: SearchError, fallback: &str) -> Self {
        let status = match &err {
            SearchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SearchError::NotFound(_) => StatusCode::NOT_FOUND,
            SearchError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = err.to_string();
        if message.trim().is_empty() {
            Self::new(status, fallback)
        } else {
            Self::new(status, message)
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(ErrorBody {
            message: &self.message,
        })
    }
}
