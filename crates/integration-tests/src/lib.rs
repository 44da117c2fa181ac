//! Shared fixtures for the integration suites: a fully wired forum over the
//! in-memory store, plus an HTTP harness around the same wiring.

use std::sync::Arc;

use domains::{
    Category, CategoryRepository, NewCategory, NewPost, NewThread, NewUser, Post, PostRepository,
    Session, Thread, ThreadRepository, User, UserRepository,
};
use services::{ForumServices, Repositories, ServiceSettings};
use storage_adapters::MemoryStore;

pub struct Forum {
    pub store: Arc<MemoryStore>,
    pub services: ForumServices,
}

impl Default for Forum {
    fn default() -> Self {
        Self::new()
    }
}

impl Forum {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let services = ForumServices::new(Repositories::from_store(store.clone()), ServiceSettings::default());
        Self { store, services }
    }

    pub async fn user(&self, username: &str, admin: bool) -> User {
        UserRepository::create(
            self.store.as_ref(),
            NewUser { username: username.into(), color: "#607D8B".into(), admin },
        )
        .await
        .expect("user fixture")
    }

    pub async fn category(&self, name: &str) -> Category {
        CategoryRepository::create(self.store.as_ref(), NewCategory { name: name.into(), color: "#2196F3".into() })
            .await
            .expect("category fixture")
    }

    /// A thread written straight to the store, optionally with an opening post.
    pub async fn thread(&self, author: &User, category: &Category, title: &str, opening: Option<&str>) -> Thread {
        let draft = NewThread {
            title: title.into(),
            category_id: category.id,
            user_id: author.id,
            created_at: chrono::Utc::now(),
        };
        ThreadRepository::create(self.store.as_ref(), draft, opening.map(str::to_string))
            .await
            .expect("thread fixture")
            .0
    }

    pub async fn post(&self, author: &User, thread: &Thread, content: &str) -> Post {
        PostRepository::create(
            self.store.as_ref(),
            NewPost {
                content: content.into(),
                thread_id: thread.id,
                user_id: author.id,
                replying_to_id: None,
                created_at: chrono::Utc::now(),
            },
        )
        .await
        .expect("post fixture")
    }
}

pub fn session(user: &User) -> Session {
    Session { user_id: user.id, username: user.username.clone(), admin: user.admin }
}

#[cfg(feature = "web-axum")]
pub mod http {
    use std::sync::Arc;

    use api_adapters::{router, AppState};
    use auth_adapters::JwtSessionVerifier;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use domains::User;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{session, Forum};

    const SECRET: &str = "integration-test-secret";

    pub struct HttpForum {
        pub forum: Forum,
        app: Router,
        verifier: Arc<JwtSessionVerifier>,
    }

    impl Default for HttpForum {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HttpForum {
        pub fn new() -> Self {
            let forum = Forum::new();
            let verifier = Arc::new(JwtSessionVerifier::new(&SECRET.to_string().into()));
            let app = router(AppState::new(forum.services.clone(), verifier.clone()));
            Self { forum, app, verifier }
        }

        pub fn token(&self, user: &User) -> String {
            self.verifier
                .issue(&session(user), chrono::Duration::minutes(10))
                .expect("token fixture")
        }

        pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
            self.send("GET", uri, token, None).await
        }

        pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
            self.send("POST", uri, token, Some(body)).await
        }

        async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => request
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .expect("request");

            let response = self.app.clone().oneshot(request).await.expect("infallible router");
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }
    }
}
