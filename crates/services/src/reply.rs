//! Reply integrity: a reply and its target must live in the same thread.
//!
//! The check runs before the post row exists, so a rejected reply never
//! leaves an unlinked post behind.

use std::sync::Arc;

use domains::{DomainError, ForumError, NewPost, Post, PostRepository, Result};

#[derive(Clone)]
pub struct ReplyIntegrityValidator {
    posts: Arc<dyn PostRepository>,
}

impl ReplyIntegrityValidator {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts }
    }

    /// Links `draft` to `replying_to_id` after checking the target exists in
    /// the draft's thread. Returns the linked draft and the target post.
    pub async fn validate_reply(
        &self,
        mut draft: NewPost,
        replying_to_id: Option<i64>,
    ) -> Result<(NewPost, Option<Post>)> {
        let Some(target_id) = replying_to_id else {
            draft.replying_to_id = None;
            return Ok((draft, None));
        };

        let target = self.posts.find_by_id(target_id).await?.ok_or_else(|| {
            DomainError::Rule(ForumError::invalid_parameter("replyingToId", "post does not exist"))
        })?;

        if target.thread_id != draft.thread_id {
            return Err(DomainError::Rule(ForumError::invalid_parameter(
                "replyingToId",
                "replies must be in same thread",
            )));
        }

        draft.replying_to_id = Some(target.id);
        Ok((draft, Some(target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::MockPostRepository;
    use mockall::predicate::eq;

    fn draft(thread_id: i64) -> NewPost {
        NewPost {
            content: "reply".into(),
            thread_id,
            user_id: 1,
            replying_to_id: None,
            created_at: Utc::now(),
        }
    }

    fn stored(id: i64, thread_id: i64) -> Post {
        Post {
            id,
            content: "target".into(),
            thread_id,
            user_id: 2,
            replying_to_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn absent_target_succeeds_without_lookup() {
        let validator = ReplyIntegrityValidator::new(Arc::new(MockPostRepository::new()));
        let (linked, target) = validator.validate_reply(draft(1), None).await.unwrap();
        assert_eq!(linked.replying_to_id, None);
        assert!(target.is_none());
    }

    #[tokio::test]
    async fn same_thread_target_is_linked() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .with(eq(5))
            .returning(|id| Ok(Some(stored(id, 1))));

        let validator = ReplyIntegrityValidator::new(Arc::new(posts));
        let (linked, target) = validator.validate_reply(draft(1), Some(5)).await.unwrap();
        assert_eq!(linked.replying_to_id, Some(5));
        assert_eq!(target.map(|p| p.id), Some(5));
    }

    #[tokio::test]
    async fn missing_target_is_rejected() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().returning(|_| Ok(None));

        let validator = ReplyIntegrityValidator::new(Arc::new(posts));
        let err = validator.validate_reply(draft(1), Some(404)).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::Rule(ForumError::invalid_parameter("replyingToId", "post does not exist"))
        );
    }

    #[tokio::test]
    async fn cross_thread_target_is_rejected() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().returning(|id| Ok(Some(stored(id, 2))));

        let validator = ReplyIntegrityValidator::new(Arc::new(posts));
        let err = validator.validate_reply(draft(1), Some(3)).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::Rule(ForumError::invalid_parameter(
                "replyingToId",
                "replies must be in same thread"
            ))
        );
    }
}
