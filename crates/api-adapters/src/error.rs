//! Maps domain failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domains::{DomainError, ForumError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
#[error(transparent)]
pub struct ApiError(#[from] DomainError);

impl From<ForumError> for ApiError {
    fn from(err: ForumError) -> Self {
        ApiError(DomainError::Rule(err))
    }
}

#[derive(Debug, Serialize)]
struct ErrorItem {
    name: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter: Option<String>,
}

impl From<&ForumError> for ErrorItem {
    fn from(err: &ForumError) -> Self {
        Self {
            name: err.name(),
            message: err.to_string(),
            parameter: err.parameter().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    errors: Vec<ErrorItem>,
}

fn status_for(err: &ForumError) -> StatusCode {
    match err {
        ForumError::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        err if err.is_auth() => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errors) = match &self.0 {
            DomainError::Validation(errors) => (StatusCode::BAD_REQUEST, errors.iter().map(ErrorItem::from).collect()),
            DomainError::Rule(err) => (status_for(err), vec![ErrorItem::from(err)]),
            DomainError::Repository(err) => {
                // Store details stay in the logs.
                error!(%err, "request failed in the storage layer");
                (StatusCode::INTERNAL_SERVER_ERROR, vec![ErrorItem::from(&ForumError::Unknown)])
            }
        };
        (status, Json(ErrorBody { errors })).into_response()
    }
}
