//! # Handlers
//!
//! Each handler extracts its inputs, calls one service and serializes the
//! result. Errors flow out through `ApiError`.

use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    Json,
};
use domains::{Category, LogEntry, PageParams, ThreadListing, ThreadViews};
use serde::Deserialize;
use serde_json::{json, Value};
use services::{CategoryFeed, CategoryOverview, CreatedPost, ThreadPage, UserPage, UserView};
use tracing::error;

use crate::error::ApiError;
use crate::extract::{JsonBody, MaybeSession, RequireAdmin, RequireSession};
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// `GET /api/v1/category`
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryOverview>> {
    Ok(Json(state.services.categories.overview().await?))
}

/// `GET /api/v1/category/{category}`: one page of a category, or of every
/// category when the path is `ALL`.
pub async fn category_feed(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<CategoryFeed> {
    Ok(Json(state.services.categories.feed(&category, &params).await?))
}

/// `POST /api/v1/category` (admin)
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    JsonBody(body): JsonBody,
) -> ApiResult<Category> {
    Ok(Json(state.services.categories.create(&body).await?))
}

/// `POST /api/v1/thread`
pub async fn create_thread(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    JsonBody(body): JsonBody,
) -> ApiResult<ThreadListing> {
    Ok(Json(state.services.threads.create(&session, &body).await?))
}

/// `GET /api/v1/thread/{id}`
pub async fn view_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<ThreadPage> {
    Ok(Json(state.services.threads.page(&id, &params).await?))
}

/// `POST /api/v1/post`
pub async fn create_post(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    JsonBody(body): JsonBody,
) -> ApiResult<CreatedPost> {
    Ok(Json(state.services.posts.create(&session, &body).await?))
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    posts: Option<String>,
    threads: Option<String>,
    #[serde(flatten)]
    page: PageParams,
}

impl UserQuery {
    fn view(&self) -> UserView {
        if self.posts.as_deref() == Some("true") {
            UserView::Posts
        } else if self.threads.as_deref() == Some("true") {
            UserView::Threads
        } else {
            UserView::Profile
        }
    }
}

/// `GET /api/v1/user/{username}`, optionally with `posts=true` or
/// `threads=true` and a `lastId` cursor.
pub async fn view_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<UserPage> {
    Ok(Json(state.services.users.page(&username, query.view(), &query.page).await?))
}

/// `POST /api/v1/log`
pub async fn record_view(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    JsonBody(body): JsonBody,
) -> ApiResult<LogEntry> {
    Ok(Json(state.services.logs.record(session.as_ref(), &body).await?))
}

/// `GET /api/v1/log/top-threads` (admin)
pub async fn top_threads(State(state): State<AppState>, RequireAdmin(_): RequireAdmin) -> ApiResult<Vec<ThreadViews>> {
    Ok(Json(state.services.logs.top_threads().await?))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(%err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
