use std::sync::Arc;

use domains::{
    DomainError, ForumError, ListingScope, PageParams, Post, PostEdge, PostFilter, PostRepository,
    Result, ThreadFilter, ThreadListing, ThreadRepository, User, UserRepository,
};
use serde::Serialize;
use tracing::instrument;

use crate::pagination::{derive_window, page_url, CursorPaginator};

/// Which slice of a profile was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserView {
    Profile,
    Posts,
    Threads,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMeta {
    #[serde(rename = "nextURL")]
    pub next_url: Option<String>,
    #[serde(rename = "nextPostsCount", skip_serializing_if = "Option::is_none")]
    pub next_posts_count: Option<u64>,
    #[serde(rename = "nextThreadsCount", skip_serializing_if = "Option::is_none")]
    pub next_threads_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<Post>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<Vec<ThreadListing>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<UserMeta>,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    paginator: CursorPaginator,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        threads: Arc<dyn ThreadRepository>,
        posts: Arc<dyn PostRepository>,
        paginator: CursorPaginator,
    ) -> Self {
        Self { users, threads, posts, paginator }
    }

    #[instrument(skip(self, params))]
    pub async fn page(&self, username: &str, view: UserView, params: &PageParams) -> Result<UserPage> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(DomainError::Rule(ForumError::AccountDoesNotExist))?;
        let window = derive_window(params);
        let path = format!("/api/v1/user/{}", urlencoding::encode(&user.username));

        match view {
            UserView::Profile => Ok(UserPage { user, posts: None, threads: None, meta: None }),
            UserView::Posts => {
                let filter = PostFilter { thread_id: None, user_id: Some(user.id) };
                let posts = self.posts.list(&filter, &window).await?;
                let ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
                let scope = ListingScope::Posts(filter);
                let (next, remaining) = tokio::try_join!(
                    self.paginator.next_cursor(&scope, &ids),
                    self.paginator.remaining_count(&scope, &ids, window.limit),
                )?;
                let meta = UserMeta {
                    next_url: next.map(|cursor| page_url(&path, &[("posts", "true")], "lastId", window.limit, cursor)),
                    next_posts_count: Some(if next.is_some() { remaining } else { 0 }),
                    next_threads_count: None,
                };
                Ok(UserPage { user, posts: Some(posts), threads: None, meta: Some(meta) })
            }
            UserView::Threads => {
                let filter = ThreadFilter { category_id: None, user_id: Some(user.id) };
                let threads = self.threads.list_with_edge_post(&filter, &window, PostEdge::First).await?;
                let ids: Vec<i64> = threads.iter().map(|listing| listing.thread.id).collect();
                let scope = ListingScope::Threads(filter);
                let (next, remaining) = tokio::try_join!(
                    self.paginator.next_cursor(&scope, &ids),
                    self.paginator.remaining_count(&scope, &ids, window.limit),
                )?;
                let meta = UserMeta {
                    next_url: next.map(|cursor| page_url(&path, &[("threads", "true")], "lastId", window.limit, cursor)),
                    next_posts_count: None,
                    next_threads_count: Some(if next.is_some() { remaining } else { 0 }),
                };
                Ok(UserPage { user, posts: None, threads: Some(threads), meta: Some(meta) })
            }
        }
    }
}
