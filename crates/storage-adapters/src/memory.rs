//! # In-memory store
//!
//! Every port over a single set of ordered maps behind one `RwLock`. Ids come
//! from per-table sequences, so id order is insertion order just like a
//! serial column. A write that touches several tables holds the lock for the
//! whole operation and is therefore atomic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Category, CategoryRepository, CursorIndex, ListingScope, LogEntry, LogRepository, LogRoute,
    NewCategory, NewLogEntry, NewPost, NewThread, NewUser, PageWindow, Post, PostEdge, PostFilter,
    PostRepository, RepoError, RepoResult, Thread, ThreadFilter, ThreadListing, ThreadRepository,
    User, UserRepository,
};
use tokio::sync::RwLock;
use tracing::debug;

struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: BTreeMap::new(), last_id: 0 }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
struct Tables {
    categories: Table<Category>,
    threads: Table<Thread>,
    posts: Table<Post>,
    users: Table<User>,
    logs: Table<LogEntry>,
}

impl Tables {
    fn thread_ids<'a>(&'a self, filter: &'a ThreadFilter) -> impl DoubleEndedIterator<Item = i64> + 'a {
        self.threads
            .rows
            .values()
            .filter(move |thread| filter.matches(thread.category_id, thread.user_id))
            .map(|thread| thread.id)
    }

    fn post_ids<'a>(&'a self, filter: &'a PostFilter) -> impl DoubleEndedIterator<Item = i64> + 'a {
        self.posts
            .rows
            .values()
            .filter(move |post| filter.matches(post.thread_id, post.user_id))
            .map(|post| post.id)
    }

    /// Matching ids of `scope`, ascending.
    fn scope_ids(&self, scope: &ListingScope) -> Vec<i64> {
        match scope {
            ListingScope::Threads(filter) => self.thread_ids(filter).collect(),
            ListingScope::Posts(filter) => self.post_ids(filter).collect(),
        }
    }

    fn edge_post(&self, thread_id: i64, edge: PostEdge) -> Option<Post> {
        let mut posts = self.posts.rows.values().filter(|post| post.thread_id == thread_id);
        match edge {
            PostEdge::First => posts.next().cloned(),
            PostEdge::Latest => posts.next_back().cloned(),
        }
    }

    fn insert_post(&mut self, post: NewPost) -> RepoResult<Post> {
        if !self.threads.rows.contains_key(&post.thread_id) {
            return Err(RepoError::Backend(format!("thread {} does not exist", post.thread_id)));
        }
        let id = self.posts.next_id();
        let post = Post {
            id,
            content: post.content,
            thread_id: post.thread_id,
            user_id: post.user_id,
            replying_to_id: post.replying_to_id,
            created_at: post.created_at,
        };
        self.posts.rows.insert(id, post.clone());
        Ok(post)
    }
}

/// Volatile store implementing every repository port.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, category: NewCategory) -> RepoResult<Category> {
        let mut tables = self.tables.write().await;
        let value = category.value();
        let taken = tables
            .categories
            .rows
            .values()
            .any(|existing| existing.name == category.name || existing.value == value);
        if taken {
            return Err(RepoError::Conflict(format!("category {value} already exists")));
        }

        let id = tables.categories.next_id();
        let category = Category {
            id,
            name: category.name,
            value,
            color: category.color,
            created_at: Utc::now(),
        };
        tables.categories.rows.insert(id, category.clone());
        debug!(category_id = id, "category stored");
        Ok(category)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(self.tables.read().await.categories.rows.get(&id).cloned())
    }

    async fn find_by_key(&self, key: &str) -> RepoResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .rows
            .values()
            .find(|category| category.value == key || category.name == key)
            .cloned())
    }

    async fn list(&self) -> RepoResult<Vec<Category>> {
        Ok(self.tables.read().await.categories.rows.values().cloned().collect())
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn create(&self, thread: NewThread, opening_post: Option<String>) -> RepoResult<(Thread, Option<Post>)> {
        let mut tables = self.tables.write().await;
        if !tables.categories.rows.contains_key(&thread.category_id) {
            return Err(RepoError::Backend(format!("category {} does not exist", thread.category_id)));
        }

        let id = tables.threads.next_id();
        let stored = Thread {
            id,
            title: thread.title,
            category_id: thread.category_id,
            user_id: thread.user_id,
            created_at: thread.created_at,
        };
        tables.threads.rows.insert(id, stored.clone());

        let post = opening_post
            .map(|content| {
                tables.insert_post(NewPost {
                    content,
                    thread_id: id,
                    user_id: stored.user_id,
                    replying_to_id: None,
                    created_at: stored.created_at,
                })
            })
            .transpose()?;
        Ok((stored, post))
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Thread>> {
        Ok(self.tables.read().await.threads.rows.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[i64]) -> RepoResult<Vec<Thread>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.threads.rows.get(id).cloned()).collect())
    }

    async fn list_with_edge_post(
        &self,
        filter: &ThreadFilter,
        window: &PageWindow,
        edge: PostEdge,
    ) -> RepoResult<Vec<ThreadListing>> {
        let tables = self.tables.read().await;
        Ok(tables
            .threads
            .rows
            .range(window.cursor.unwrap_or(i64::MIN)..)
            .map(|(_, thread)| thread)
            .filter(|thread| filter.matches(thread.category_id, thread.user_id))
            .take(window.limit as usize)
            .map(|thread| ThreadListing {
                thread: thread.clone(),
                posts: tables.edge_post(thread.id, edge).into_iter().collect(),
            })
            .collect())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, post: NewPost) -> RepoResult<Post> {
        self.tables.write().await.insert_post(post)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Post>> {
        Ok(self.tables.read().await.posts.rows.get(&id).cloned())
    }

    async fn list(&self, filter: &PostFilter, window: &PageWindow) -> RepoResult<Vec<Post>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .rows
            .range(window.cursor.unwrap_or(i64::MIN)..)
            .map(|(_, post)| post)
            .filter(|post| filter.matches(post.thread_id, post.user_id))
            .take(window.limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.rows.values().any(|existing| existing.username == user.username) {
            return Err(RepoError::Conflict(format!("username {} is taken", user.username)));
        }
        let id = tables.users.next_id();
        let user = User {
            id,
            username: user.username,
            color: user.color,
            admin: user.admin,
            created_at: Utc::now(),
        };
        tables.users.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.tables.read().await.users.rows.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.rows.values().find(|user| user.username == username).cloned())
    }
}

#[async_trait]
impl LogRepository for MemoryStore {
    async fn append(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        let mut tables = self.tables.write().await;
        let id = tables.logs.next_id();
        let entry = LogEntry {
            id,
            route: entry.route,
            thread_id: entry.thread_id,
            user_id: entry.user_id,
            session_user_id: entry.session_user_id,
            created_at: entry.created_at,
        };
        tables.logs.rows.insert(id, entry.clone());
        Ok(entry)
    }

    async fn entries_between(
        &self,
        route: LogRoute,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<Vec<LogEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .logs
            .rows
            .values()
            .filter(|entry| entry.route == route && entry.created_at >= from && entry.created_at <= to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CursorIndex for MemoryStore {
    async fn first_id_after(&self, scope: &ListingScope, after: i64) -> RepoResult<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables.scope_ids(scope).into_iter().find(|id| *id > after))
    }

    async fn ids_before(&self, scope: &ListingScope, before: i64, limit: u32) -> RepoResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .scope_ids(scope)
            .into_iter()
            .rev()
            .filter(|id| *id < before)
            .take(limit as usize)
            .collect())
    }

    async fn count_after(&self, scope: &ListingScope, after: i64, cap: u32) -> RepoResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .scope_ids(scope)
            .into_iter()
            .filter(|id| *id > after)
            .take(cap as usize)
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        CategoryRepository::create(&store, NewCategory { name: "general".into(), color: "#fff".into() })
            .await
            .unwrap();
        UserRepository::create(&store, NewUser { username: "alice".into(), color: "#000".into(), admin: false })
            .await
            .unwrap();
        store
    }

    fn draft_thread(title: &str) -> NewThread {
        NewThread { title: title.into(), category_id: 1, user_id: 1, created_at: Utc::now() }
    }

    #[tokio::test]
    async fn duplicate_category_value_conflicts() {
        let store = seeded().await;
        let err = CategoryRepository::create(&store, NewCategory { name: "General".into(), color: "#fff".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn category_is_found_by_name_or_value() {
        let store = MemoryStore::new();
        CategoryRepository::create(&store, NewCategory { name: "off topic".into(), color: "#fff".into() })
            .await
            .unwrap();
        assert!(store.find_by_key("OFF_TOPIC").await.unwrap().is_some());
        assert!(store.find_by_key("off topic").await.unwrap().is_some());
        assert!(store.find_by_key("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn thread_and_opening_post_are_written_together() {
        let store = seeded().await;
        let (thread, post) = ThreadRepository::create(&store, draft_thread("hello"), Some("first".into()))
            .await
            .unwrap();
        let post = post.unwrap();
        assert_eq!(post.thread_id, thread.id);
        assert_eq!(post.user_id, thread.user_id);

        let err = ThreadRepository::create(
            &store,
            NewThread { category_id: 42, ..draft_thread("orphan") },
            Some("never".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Backend(_)));
        assert!(PostRepository::find_by_id(&store, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn edge_post_picks_first_or_latest() {
        let store = seeded().await;
        let (thread, _) = ThreadRepository::create(&store, draft_thread("t"), Some("op".into())).await.unwrap();
        for content in ["a", "b"] {
            PostRepository::create(
                &store,
                NewPost {
                    content: content.into(),
                    thread_id: thread.id,
                    user_id: 1,
                    replying_to_id: None,
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        }

        let filter = ThreadFilter::default();
        let window = PageWindow::default();
        let first = store.list_with_edge_post(&filter, &window, PostEdge::First).await.unwrap();
        let latest = store.list_with_edge_post(&filter, &window, PostEdge::Latest).await.unwrap();
        assert_eq!(first[0].posts[0].content, "op");
        assert_eq!(latest[0].posts[0].content, "b");
    }

    #[tokio::test]
    async fn windows_are_inclusive_and_ascending() {
        let store = seeded().await;
        let (thread, _) = ThreadRepository::create(&store, draft_thread("t"), None).await.unwrap();
        for n in 0..30 {
            PostRepository::create(
                &store,
                NewPost {
                    content: format!("post {n}"),
                    thread_id: thread.id,
                    user_id: 1,
                    replying_to_id: None,
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        }

        let filter = PostFilter { thread_id: Some(thread.id), user_id: None };
        let page = PostRepository::list(&store, &filter, &PageWindow { cursor: Some(11), limit: 10 }).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|post| post.id).collect();
        assert_eq!(ids, (11..=20).collect::<Vec<_>>());

        let scope = ListingScope::Posts(filter);
        assert_eq!(store.first_id_after(&scope, 20).await.unwrap(), Some(21));
        assert_eq!(store.first_id_after(&scope, 30).await.unwrap(), None);
        assert_eq!(store.ids_before(&scope, 11, 10).await.unwrap(), (1..=10).rev().collect::<Vec<_>>());
        assert_eq!(store.count_after(&scope, 20, 5).await.unwrap(), 5);
        assert_eq!(store.count_after(&scope, 25, 10).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn log_window_is_inclusive_and_route_scoped() {
        let store = seeded().await;
        let now = Utc::now();
        for (route, age) in [(LogRoute::Thread, 1), (LogRoute::Thread, 30), (LogRoute::Index, 1)] {
            store
                .append(NewLogEntry {
                    route,
                    thread_id: None,
                    user_id: None,
                    session_user_id: None,
                    created_at: now - Duration::hours(age),
                })
                .await
                .unwrap();
        }

        let entries = store
            .entries_between(LogRoute::Thread, now - Duration::hours(24), now)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 1);
    }
}
