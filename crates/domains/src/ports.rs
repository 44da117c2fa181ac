//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::{ForumError, RepoResult};
use crate::models::{
    Category, LogEntry, LogRoute, NewCategory, NewLogEntry, NewPost, NewThread, NewUser, Post,
    Session, Thread, ThreadListing, User,
};
use crate::pagination::{ListingScope, PageWindow, PostEdge, PostFilter, ThreadFilter};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Fails with `RepoError::Conflict` when the name or value is taken.
    async fn create(&self, category: NewCategory) -> RepoResult<Category>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>>;
    /// Matches either the display name or the derived value.
    async fn find_by_key(&self, key: &str) -> RepoResult<Option<Category>>;
    /// All categories in ascending id order.
    async fn list(&self) -> RepoResult<Vec<Category>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Inserts the thread and, when `opening_post` is given, its first post
    /// authored by the same user. Both rows are written or neither is.
    async fn create(
        &self,
        thread: NewThread,
        opening_post: Option<String>,
    ) -> RepoResult<(Thread, Option<Post>)>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Thread>>;
    async fn find_many(&self, ids: &[i64]) -> RepoResult<Vec<Thread>>;
    /// Threads matching `filter` inside `window`, ascending by id, each
    /// carrying at most one post: the one at `edge`.
    async fn list_with_edge_post(
        &self,
        filter: &ThreadFilter,
        window: &PageWindow,
        edge: PostEdge,
    ) -> RepoResult<Vec<ThreadListing>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: NewPost) -> RepoResult<Post>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Post>>;
    /// Posts matching `filter` inside `window`, ascending by id.
    async fn list(&self, filter: &PostFilter, window: &PageWindow) -> RepoResult<Vec<Post>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> RepoResult<User>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn append(&self, entry: NewLogEntry) -> RepoResult<LogEntry>;
    /// Entries of `route` with `from <= created_at <= to`, ascending by id.
    async fn entries_between(
        &self,
        route: LogRoute,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<Vec<LogEntry>>;
}

/// Id lookups the cursor paginator needs, answered for any listing scope.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CursorIndex: Send + Sync {
    /// Smallest matching id strictly greater than `after`.
    async fn first_id_after(&self, scope: &ListingScope, after: i64) -> RepoResult<Option<i64>>;
    /// Up to `limit` matching ids strictly less than `before`, descending.
    async fn ids_before(&self, scope: &ListingScope, before: i64, limit: u32) -> RepoResult<Vec<i64>>;
    /// Number of matching ids strictly greater than `after`, counting no
    /// further than `cap`.
    async fn count_after(&self, scope: &ListingScope, after: i64, cap: u32) -> RepoResult<u64>;
}

/// Resolves a bearer token issued by the external account system.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Session, ForumError>;
}
