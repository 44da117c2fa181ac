use domains::{DomainError, ForumError, PageParams, PostFilter, PostRepository, PageWindow};
use integration_tests::{session, Forum};
use serde_json::json;

async fn posts_in(forum: &Forum, thread_id: i64) -> usize {
    PostRepository::list(
        forum.store.as_ref(),
        &PostFilter { thread_id: Some(thread_id), user_id: None },
        &PageWindow { cursor: None, limit: 100 },
    )
    .await
    .unwrap()
    .len()
}

#[tokio::test]
async fn reply_within_the_thread_is_linked() {
    let forum = Forum::new();
    let author = forum.user("author", false).await;
    let category = forum.category("general").await;
    let thread = forum.thread(&author, &category, "topic", Some("opening")).await;
    let target = forum.post(&author, &thread, "target").await;

    let created = forum
        .services
        .posts
        .create(
            &session(&author),
            &json!({ "content": "agreed", "threadId": thread.id, "replyingToId": target.id }),
        )
        .await
        .unwrap();

    assert_eq!(created.post.replying_to_id, Some(target.id));
    assert_eq!(created.replying_to.map(|post| post.id), Some(target.id));
    assert_eq!(created.thread.id, thread.id);

    let page = forum
        .services
        .threads
        .page(&thread.id.to_string(), &PageParams::default())
        .await
        .unwrap();
    assert_eq!(page.posts.last().and_then(|post| post.replying_to_id), Some(target.id));
}

#[tokio::test]
async fn cross_thread_reply_is_rejected_without_writing() {
    let forum = Forum::new();
    let author = forum.user("author", false).await;
    let category = forum.category("general").await;
    let here = forum.thread(&author, &category, "here", Some("opening")).await;
    let there = forum.thread(&author, &category, "there", Some("opening")).await;
    let foreign = forum.post(&author, &there, "elsewhere").await;

    let before = posts_in(&forum, here.id).await;
    let err = forum
        .services
        .posts
        .create(
            &session(&author),
            &json!({ "content": "misplaced", "threadId": here.id, "replyingToId": foreign.id }),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::Rule(ForumError::invalid_parameter("replyingToId", "replies must be in same thread"))
    );
    assert_eq!(posts_in(&forum, here.id).await, before);
    assert_eq!(posts_in(&forum, there.id).await, 2);
}

#[tokio::test]
async fn reply_to_missing_post_is_rejected() {
    let forum = Forum::new();
    let author = forum.user("author", false).await;
    let category = forum.category("general").await;
    let thread = forum.thread(&author, &category, "topic", Some("opening")).await;

    let err = forum
        .services
        .posts
        .create(
            &session(&author),
            &json!({ "content": "to nobody", "threadId": thread.id, "replyingToId": 999 }),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::Rule(ForumError::invalid_parameter("replyingToId", "post does not exist"))
    );
    assert_eq!(posts_in(&forum, thread.id).await, 1);
}

#[tokio::test]
async fn post_to_missing_thread_is_rejected() {
    let forum = Forum::new();
    let author = forum.user("author", false).await;

    let err = forum
        .services
        .posts
        .create(&session(&author), &json!({ "content": "hello", "threadId": 42 }))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DomainError::Rule(ForumError::invalid_parameter("threadId", "thread does not exist"))
    );
}
