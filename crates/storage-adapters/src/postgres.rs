//! # Postgres store
//!
//! Maps the relational model onto the domain entities. Listing queries are
//! keyset windows over the serial primary keys (`id >= cursor ORDER BY id
//! LIMIT n`), backed by the composite indexes in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Category, CategoryRepository, CursorIndex, ListingScope, LogEntry, LogRepository, LogRoute,
    NewCategory, NewLogEntry, NewPost, NewThread, NewUser, PageWindow, Post, PostEdge, PostFilter,
    PostRepository, RepoError, RepoResult, Thread, ThreadFilter, ThreadListing, ThreadRepository,
    User, UserRepository,
};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Unique violations become `Conflict`; everything else is a backend failure.
fn repo_err(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict(db.message().to_string()),
        _ => RepoError::Backend(err.to_string()),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(repo_err)?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> RepoResult<()> {
        info!("running database migrations");
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|err| RepoError::Backend(format!("migration failed: {err}")))?;
        info!("database migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// Row types for sqlx mapping

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    value: String,
    color: String,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self { id: row.id, name: row.name, value: row.value, color: row.color, created_at: row.created_at }
    }
}

#[derive(sqlx::FromRow)]
struct ThreadRow {
    id: i64,
    title: String,
    category_id: i64,
    user_id: i64,
    created_at: DateTime<Utc>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            category_id: row.category_id,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    content: String,
    thread_id: i64,
    user_id: i64,
    replying_to_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            thread_id: row.thread_id,
            user_id: row.user_id,
            replying_to_id: row.replying_to_id,
            created_at: row.created_at,
        }
    }
}

/// A thread joined with at most one of its posts.
#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    thread: ThreadRow,
    post_id: Option<i64>,
    post_content: Option<String>,
    post_user_id: Option<i64>,
    post_replying_to_id: Option<i64>,
    post_created_at: Option<DateTime<Utc>>,
}

impl From<ListingRow> for ThreadListing {
    fn from(row: ListingRow) -> Self {
        let thread = Thread::from(row.thread);
        let post = match (row.post_id, row.post_content, row.post_user_id, row.post_created_at) {
            (Some(id), Some(content), Some(user_id), Some(created_at)) => Some(Post {
                id,
                content,
                thread_id: thread.id,
                user_id,
                replying_to_id: row.post_replying_to_id,
                created_at,
            }),
            _ => None,
        };
        Self { thread, posts: post.into_iter().collect() }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    color: String,
    admin: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self { id: row.id, username: row.username, color: row.color, admin: row.admin, created_at: row.created_at }
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    route: String,
    thread_id: Option<i64>,
    user_id: Option<i64>,
    session_user_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LogRow> for LogEntry {
    type Error = RepoError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let route = LogRoute::parse(&row.route)
            .ok_or_else(|| RepoError::Backend(format!("unknown log route {:?} in row {}", row.route, row.id)))?;
        Ok(Self {
            id: row.id,
            route,
            thread_id: row.thread_id,
            user_id: row.user_id,
            session_user_id: row.session_user_id,
            created_at: row.created_at,
        })
    }
}

const POST_COLUMNS: &str = "id, content, thread_id, user_id, replying_to_id, created_at";

/// Table, owner column and filter values a cursor scope walks over.
fn scope_parts(scope: &ListingScope) -> (&'static str, &'static str, Option<i64>, Option<i64>) {
    match scope {
        ListingScope::Threads(ThreadFilter { category_id, user_id }) => ("threads", "category_id", *category_id, *user_id),
        ListingScope::Posts(PostFilter { thread_id, user_id }) => ("posts", "thread_id", *thread_id, *user_id),
    }
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn create(&self, category: NewCategory) -> RepoResult<Category> {
        let value = category.value();
        let row: CategoryRow = sqlx::query_as(
            "INSERT INTO categories (name, value, color) VALUES ($1, $2, $3) \
             RETURNING id, name, value, color, created_at",
        )
        .bind(&category.name)
        .bind(&value)
        .bind(&category.color)
        .fetch_one(&self.pool)
        .await
        .map_err(repo_err)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name, value, color, created_at FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(repo_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_key(&self, key: &str) -> RepoResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, value, color, created_at FROM categories \
             WHERE value = $1 OR name = $1 ORDER BY id LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(repo_err)?;
        Ok(row.map(Into::into))
    }

    async fn list(&self) -> RepoResult<Vec<Category>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, value, color, created_at FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(repo_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ThreadRepository for PgStore {
    /// The thread and its opening post share one transaction, so a failed
    /// post insert never leaves an empty thread behind.
    async fn create(&self, thread: NewThread, opening_post: Option<String>) -> RepoResult<(Thread, Option<Post>)> {
        let mut tx = self.pool.begin().await.map_err(repo_err)?;

        let row: ThreadRow = sqlx::query_as(
            "INSERT INTO threads (title, category_id, user_id, created_at) VALUES ($1, $2, $3, $4) \
             RETURNING id, title, category_id, user_id, created_at",
        )
        .bind(&thread.title)
        .bind(thread.category_id)
        .bind(thread.user_id)
        .bind(thread.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(repo_err)?;
        let thread = Thread::from(row);

        let post = match opening_post {
            Some(content) => {
                let row: PostRow = sqlx::query_as(&format!(
                    "INSERT INTO posts (content, thread_id, user_id, created_at) VALUES ($1, $2, $3, $4) \
                     RETURNING {POST_COLUMNS}"
                ))
                .bind(content)
                .bind(thread.id)
                .bind(thread.user_id)
                .bind(thread.created_at)
                .fetch_one(&mut *tx)
                .await
                .map_err(repo_err)?;
                Some(Post::from(row))
            }
            None => None,
        };

        tx.commit().await.map_err(repo_err)?;
        debug!(thread_id = thread.id, "thread stored");
        Ok((thread, post))
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Thread>> {
        let row: Option<ThreadRow> =
            sqlx::query_as("SELECT id, title, category_id, user_id, created_at FROM threads WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(repo_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_many(&self, ids: &[i64]) -> RepoResult<Vec<Thread>> {
        let rows: Vec<ThreadRow> = sqlx::query_as(
            "SELECT id, title, category_id, user_id, created_at FROM threads WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(repo_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_with_edge_post(
        &self,
        filter: &ThreadFilter,
        window: &PageWindow,
        edge: PostEdge,
    ) -> RepoResult<Vec<ThreadListing>> {
        let order = match edge {
            PostEdge::First => "ASC",
            PostEdge::Latest => "DESC",
        };
        let sql = format!(
            "SELECT t.id, t.title, t.category_id, t.user_id, t.created_at, \
                    p.id AS post_id, p.content AS post_content, p.user_id AS post_user_id, \
                    p.replying_to_id AS post_replying_to_id, p.created_at AS post_created_at \
             FROM threads t \
             LEFT JOIN LATERAL ( \
                 SELECT {POST_COLUMNS} FROM posts WHERE posts.thread_id = t.id ORDER BY id {order} LIMIT 1 \
             ) p ON TRUE \
             WHERE ($1::BIGINT IS NULL OR t.category_id = $1) \
               AND ($2::BIGINT IS NULL OR t.user_id = $2) \
               AND ($3::BIGINT IS NULL OR t.id >= $3) \
             ORDER BY t.id ASC \
             LIMIT $4"
        );
        let rows: Vec<ListingRow> = sqlx::query_as(&sql)
            .bind(filter.category_id)
            .bind(filter.user_id)
            .bind(window.cursor)
            .bind(i64::from(window.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(repo_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PostRepository for PgStore {
    async fn create(&self, post: NewPost) -> RepoResult<Post> {
        let row: PostRow = sqlx::query_as(&format!(
            "INSERT INTO posts (content, thread_id, user_id, replying_to_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {POST_COLUMNS}"
        ))
        .bind(&post.content)
        .bind(post.thread_id)
        .bind(post.user_id)
        .bind(post.replying_to_id)
        .bind(post.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(repo_err)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Post>> {
        let row: Option<PostRow> = sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(repo_err)?;
        Ok(row.map(Into::into))
    }

    async fn list(&self, filter: &PostFilter, window: &PageWindow) -> RepoResult<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE ($1::BIGINT IS NULL OR thread_id = $1) \
               AND ($2::BIGINT IS NULL OR user_id = $2) \
               AND ($3::BIGINT IS NULL OR id >= $3) \
             ORDER BY id ASC \
             LIMIT $4"
        ))
        .bind(filter.thread_id)
        .bind(filter.user_id)
        .bind(window.cursor)
        .bind(i64::from(window.limit))
        .fetch_all(&self.pool)
        .await
        .map_err(repo_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (username, color, admin) VALUES ($1, $2, $3) \
             RETURNING id, username, color, admin, created_at",
        )
        .bind(&user.username)
        .bind(&user.color)
        .bind(user.admin)
        .fetch_one(&self.pool)
        .await
        .map_err(repo_err)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, color, admin, created_at FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(repo_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, color, admin, created_at FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(repo_err)?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl LogRepository for PgStore {
    async fn append(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        let row: LogRow = sqlx::query_as(
            "INSERT INTO logs (route, thread_id, user_id, session_user_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, route, thread_id, user_id, session_user_id, created_at",
        )
        .bind(entry.route.as_str())
        .bind(entry.thread_id)
        .bind(entry.user_id)
        .bind(entry.session_user_id)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(repo_err)?;
        row.try_into()
    }

    async fn entries_between(
        &self,
        route: LogRoute,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<Vec<LogEntry>> {
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT id, route, thread_id, user_id, session_user_id, created_at FROM logs \
             WHERE route = $1 AND created_at >= $2 AND created_at <= $3 ORDER BY id",
        )
        .bind(route.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(repo_err)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl CursorIndex for PgStore {
    async fn first_id_after(&self, scope: &ListingScope, after: i64) -> RepoResult<Option<i64>> {
        let (table, owner, owner_id, user_id) = scope_parts(scope);
        sqlx::query_scalar(&format!(
            "SELECT id FROM {table} \
             WHERE ($1::BIGINT IS NULL OR {owner} = $1) AND ($2::BIGINT IS NULL OR user_id = $2) AND id > $3 \
             ORDER BY id ASC LIMIT 1"
        ))
        .bind(owner_id)
        .bind(user_id)
        .bind(after)
        .fetch_optional(&self.pool)
        .await
        .map_err(repo_err)
    }

    async fn ids_before(&self, scope: &ListingScope, before: i64, limit: u32) -> RepoResult<Vec<i64>> {
        let (table, owner, owner_id, user_id) = scope_parts(scope);
        sqlx::query_scalar(&format!(
            "SELECT id FROM {table} \
             WHERE ($1::BIGINT IS NULL OR {owner} = $1) AND ($2::BIGINT IS NULL OR user_id = $2) AND id < $3 \
             ORDER BY id DESC LIMIT $4"
        ))
        .bind(owner_id)
        .bind(user_id)
        .bind(before)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(repo_err)
    }

    async fn count_after(&self, scope: &ListingScope, after: i64, cap: u32) -> RepoResult<u64> {
        let (table, owner, owner_id, user_id) = scope_parts(scope);
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM ( \
                 SELECT 1 FROM {table} \
                 WHERE ($1::BIGINT IS NULL OR {owner} = $1) AND ($2::BIGINT IS NULL OR user_id = $2) AND id > $3 \
                 LIMIT $4 \
             ) capped"
        ))
        .bind(owner_id)
        .bind(user_id)
        .bind(after)
        .bind(i64::from(cap))
        .fetch_one(&self.pool)
        .await
        .map_err(repo_err)?;
        Ok(count.max(0) as u64)
    }
}
