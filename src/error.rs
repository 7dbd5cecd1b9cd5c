use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// Missing, or present but hidden from this viewer.
    #[error("not found")] NotFound,
    #[error("bad request: {0}")] BadRequest(String),
    #[error("invalid credentials")] InvalidCredentials,
    /// Write attempted without an identity; rendered as a redirect to login.
    #[error("authentication required")] Unauthenticated { login_url: String },
    #[error("forbidden")] Forbidden,
    #[error("conflict")] Conflict,
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(msg) => {
                tracing::error!("store failure: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Unauthenticated { .. } => StatusCode::FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Unauthenticated { login_url } = self {
            return HttpResponse::Found()
                .insert_header((header::LOCATION, login_url.as_str()))
                .finish();
        }
        HttpResponse::build(self.status_code()).json(ApiErrorBody { error: self.to_string() })
    }
}
