use std::sync::Arc;

use chrono::Utc;
use domains::{
    DomainError, ForumError, NewPost, Post, PostRepository, Result, Session, Thread, ThreadRepository,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::reply::ReplyIntegrityValidator;
use crate::validation::BodyReader;

pub const MAX_POST_CONTENT_LENGTH: usize = 50_000;

/// A freshly written post with the records it links to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPost {
    #[serde(flatten)]
    pub post: Post,
    pub thread: Thread,
    pub replying_to: Option<Post>,
}

#[derive(Clone)]
pub struct PostService {
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    replies: ReplyIntegrityValidator,
}

impl PostService {
    pub fn new(threads: Arc<dyn ThreadRepository>, posts: Arc<dyn PostRepository>) -> Self {
        let replies = ReplyIntegrityValidator::new(posts.clone());
        Self { threads, posts, replies }
    }

    /// Validates the body, the thread and the reply target, then writes the
    /// post in a single insert.
    #[instrument(skip(self, session, body), fields(user_id = session.user_id))]
    pub async fn create(&self, session: &Session, body: &Value) -> Result<CreatedPost> {
        let mut reader = BodyReader::new(body);
        let content = reader.required_text("content", MAX_POST_CONTENT_LENGTH);
        let thread_id = reader.required_integer("threadId");
        let replying_to_id = reader.optional_integer("replyingToId");
        let (content, thread_id) = reader.finish(content.zip(thread_id))?;

        let thread = self.threads.find_by_id(thread_id).await?.ok_or_else(|| {
            DomainError::Rule(ForumError::invalid_parameter("threadId", "thread does not exist"))
        })?;

        let draft = NewPost {
            content,
            thread_id: thread.id,
            user_id: session.user_id,
            replying_to_id: None,
            created_at: Utc::now(),
        };
        let (draft, replying_to) = self
            .replies
            .validate_reply(draft, replying_to_id)
            .await
            .inspect_err(|err| warn!(%err, ?replying_to_id, "reply rejected"))?;

        let post = self.posts.create(draft).await?;
        info!(post_id = post.id, thread_id = thread.id, "post created");

        Ok(CreatedPost { post, thread, replying_to })
    }
}
