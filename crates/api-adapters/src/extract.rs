//! Request extractors: bearer sessions and lenient JSON bodies.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
};
use domains::{ForumError, Session};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// The caller's session, if a bearer token was sent. A token that fails
/// verification is rejected rather than treated as anonymous.
pub struct MaybeSession(pub Option<Session>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(MaybeSession(None)),
            Some(token) => Ok(MaybeSession(Some(state.sessions.verify(token)?))),
        }
    }
}

/// A signed-in caller.
pub struct RequireSession(pub Session);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeSession(session) = MaybeSession::from_request_parts(parts, state).await?;
        session.map(RequireSession).ok_or_else(|| ForumError::RequestNotAuthorized.into())
    }
}

/// A signed-in administrator.
pub struct RequireAdmin(pub Session);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireSession(session) = RequireSession::from_request_parts(parts, state).await?;
        if session.admin {
            Ok(RequireAdmin(session))
        } else {
            Err(ForumError::RequestNotAuthorized.into())
        }
    }
}

/// A request body read as JSON. Anything unparseable becomes `null`, so the
/// service reports the missing fields instead of a transport error.
pub struct JsonBody(pub Value);

impl<S: Send + Sync> FromRequest<S> for JsonBody {
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|_| ApiError::from(ForumError::Unknown))?;
        Ok(JsonBody(serde_json::from_slice(&bytes).unwrap_or(Value::Null)))
    }
}
