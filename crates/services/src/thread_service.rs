use std::sync::Arc;

use chrono::Utc;
use domains::{
    Category, CategoryRepository, DomainError, ForumError, ListingScope, NewThread, PageParams,
    Post, PostFilter, PostRepository, Result, Session, Thread, ThreadListing, ThreadRepository,
    UserRepository,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::feed::user_filter;
use crate::pagination::{derive_window, page_url, CursorPaginator};
use crate::post_service::MAX_POST_CONTENT_LENGTH;
use crate::validation::BodyReader;

pub const MAX_THREAD_TITLE_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostsMeta {
    #[serde(rename = "nextURL")]
    pub next_url: Option<String>,
    #[serde(rename = "nextPostsCount")]
    pub next_posts_count: u64,
    #[serde(rename = "previousURL")]
    pub previous_url: Option<String>,
}

/// A thread with one page of its posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPage {
    #[serde(flatten)]
    pub thread: Thread,
    pub category: Category,
    pub posts: Vec<Post>,
    pub meta: PostsMeta,
}

#[derive(Clone)]
pub struct ThreadService {
    categories: Arc<dyn CategoryRepository>,
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    paginator: CursorPaginator,
}

impl ThreadService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        threads: Arc<dyn ThreadRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        paginator: CursorPaginator,
    ) -> Self {
        Self { categories, threads, posts, users, paginator }
    }

    /// Creates a thread in an existing category, optionally with its opening
    /// post in the same write.
    #[instrument(skip(self, session, body), fields(user_id = session.user_id))]
    pub async fn create(&self, session: &Session, body: &Value) -> Result<ThreadListing> {
        let mut reader = BodyReader::new(body);
        let title = reader.required_text("name", MAX_THREAD_TITLE_LENGTH);
        let category = reader.required_string("category");
        let content = reader.optional_text("content", MAX_POST_CONTENT_LENGTH);
        let (title, category) = reader.finish(title.zip(category))?;

        let category = self
            .categories
            .find_by_key(&category)
            .await?
            .ok_or(DomainError::Rule(ForumError::InvalidCategory))?;

        let draft = NewThread {
            title,
            category_id: category.id,
            user_id: session.user_id,
            created_at: Utc::now(),
        };
        let (thread, opening) = self.threads.create(draft, content).await?;
        info!(thread_id = thread.id, category_id = category.id, "thread created");

        Ok(ThreadListing { thread, posts: opening.into_iter().collect() })
    }

    /// One page of a thread's posts, oldest first.
    #[instrument(skip(self, params))]
    pub async fn page(&self, raw_id: &str, params: &PageParams) -> Result<ThreadPage> {
        let id = raw_id.trim().parse::<i64>().map_err(|_| {
            DomainError::Validation(vec![ForumError::invalid_parameter_type("id", "integer")])
        })?;
        let window = derive_window(params);
        let user_id = user_filter(self.users.as_ref(), params.username.as_deref()).await?;

        let thread = self
            .threads
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::Rule(ForumError::invalid_parameter("id", "thread does not exist")))?;
        let category = self
            .categories
            .find_by_id(thread.category_id)
            .await?
            .ok_or_else(|| DomainError::Rule(ForumError::InvalidCategory))?;

        let filter = PostFilter { thread_id: Some(thread.id), user_id };
        let posts = self.posts.list(&filter, &window).await?;
        let ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
        let cursors = self.paginator.cursors(&ListingScope::Posts(filter), &window, &ids).await?;

        let path = format!("/api/v1/thread/{}", thread.id);
        let extra: Vec<(&str, &str)> = params
            .username
            .as_deref()
            .map(|username| vec![("username", username)])
            .unwrap_or_default();
        let meta = PostsMeta {
            next_url: cursors
                .next
                .map(|cursor| page_url(&path, &extra, "from", window.limit, cursor)),
            next_posts_count: if cursors.next.is_some() { cursors.remaining } else { 0 },
            previous_url: cursors
                .previous
                .map(|cursor| page_url(&path, &extra, "from", window.limit, cursor)),
        };

        Ok(ThreadPage { thread, category, posts, meta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{
        MockCategoryRepository, MockCursorIndex, MockPostRepository, MockThreadRepository,
        MockUserRepository,
    };
    use serde_json::json;

    fn session() -> Session {
        Session { user_id: 4, username: "poster".into(), admin: false }
    }

    fn service(categories: MockCategoryRepository, threads: MockThreadRepository) -> ThreadService {
        ThreadService::new(
            Arc::new(categories),
            Arc::new(threads),
            Arc::new(MockPostRepository::new()),
            Arc::new(MockUserRepository::new()),
            CursorPaginator::new(Arc::new(MockCursorIndex::new())),
        )
    }

    #[tokio::test]
    async fn unknown_category_yields_invalid_category() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_find_by_key().returning(|_| Ok(None));

        let err = service(categories, MockThreadRepository::new())
            .create(&session(), &json!({ "name": "hello", "category": "nope" }))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Rule(ForumError::InvalidCategory));
    }

    #[tokio::test]
    async fn missing_fields_are_reported_together() {
        let err = service(MockCategoryRepository::new(), MockThreadRepository::new())
            .create(&session(), &json!({ "content": 3 }))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation(vec![
                ForumError::missing_parameter("name"),
                ForumError::missing_parameter("category"),
                ForumError::invalid_parameter_type("content", "string"),
            ])
        );
    }

    #[tokio::test]
    async fn opening_post_is_written_with_the_thread() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_find_by_key().returning(|key| {
            Ok(Some(Category {
                id: 2,
                name: key.to_string(),
                value: domains::category_value(key),
                color: "#fff".into(),
                created_at: Utc::now(),
            }))
        });
        let mut threads = MockThreadRepository::new();
        threads
            .expect_create()
            .withf(|draft, content| {
                draft.category_id == 2 && draft.user_id == 4 && content.as_deref() == Some("first!")
            })
            .returning(|draft, content| {
                let thread = Thread {
                    id: 1,
                    title: draft.title,
                    category_id: draft.category_id,
                    user_id: draft.user_id,
                    created_at: draft.created_at,
                };
                let post = content.map(|content| Post {
                    id: 1,
                    content,
                    thread_id: 1,
                    user_id: draft.user_id,
                    replying_to_id: None,
                    created_at: draft.created_at,
                });
                Ok((thread, post))
            });

        let listing = service(categories, threads)
            .create(&session(), &json!({ "name": "hello", "category": "general", "content": "first!" }))
            .await
            .unwrap();
        assert_eq!(listing.thread.title, "hello");
        assert_eq!(listing.posts.len(), 1);
    }

    #[tokio::test]
    async fn non_numeric_id_is_a_type_error() {
        let err = service(MockCategoryRepository::new(), MockThreadRepository::new())
            .page("abc", &PageParams::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation(vec![ForumError::invalid_parameter_type("id", "integer")])
        );
    }
}
