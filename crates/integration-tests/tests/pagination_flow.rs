use domains::PageParams;
use integration_tests::Forum;

fn params(limit: Option<&str>, from: Option<&str>) -> PageParams {
    PageParams {
        limit: limit.map(String::from),
        from: from.map(String::from),
        ..PageParams::default()
    }
}

async fn thread_with_posts(forum: &Forum, count: usize) -> (domains::User, domains::Thread) {
    let author = forum.user("walker", false).await;
    let category = forum.category("general").await;
    let thread = forum.thread(&author, &category, "long thread", None).await;
    for n in 0..count {
        forum.post(&author, &thread, &format!("post {n}")).await;
    }
    (author, thread)
}

fn ids(page: &services::ThreadPage) -> Vec<i64> {
    page.posts.iter().map(|post| post.id).collect()
}

#[tokio::test]
async fn walking_forward_visits_every_post_once() {
    let forum = Forum::new();
    let (_, thread) = thread_with_posts(&forum, 30).await;
    let id = thread.id.to_string();

    let first = forum.services.threads.page(&id, &params(None, None)).await.unwrap();
    assert_eq!(ids(&first), (1..=10).collect::<Vec<_>>());
    assert_eq!(first.meta.next_url.as_deref(), Some("/api/v1/thread/1?limit=10&from=11"));
    assert_eq!(first.meta.next_posts_count, 10);
    assert_eq!(first.meta.previous_url, None);

    let second = forum.services.threads.page(&id, &params(None, Some("11"))).await.unwrap();
    assert_eq!(ids(&second), (11..=20).collect::<Vec<_>>());
    assert_eq!(second.meta.previous_url.as_deref(), Some("/api/v1/thread/1?limit=10&from=1"));

    let third = forum.services.threads.page(&id, &params(None, Some("21"))).await.unwrap();
    assert_eq!(ids(&third), (21..=30).collect::<Vec<_>>());
    assert_eq!(third.meta.next_url, None);
    assert_eq!(third.meta.next_posts_count, 0);
    assert_eq!(third.meta.previous_url.as_deref(), Some("/api/v1/thread/1?limit=10&from=11"));
}

#[tokio::test]
async fn cursor_past_the_end_yields_an_empty_page_that_links_back() {
    let forum = Forum::new();
    let (_, thread) = thread_with_posts(&forum, 30).await;

    let page = forum
        .services
        .threads
        .page(&thread.id.to_string(), &params(None, Some("40")))
        .await
        .unwrap();
    assert!(page.posts.is_empty());
    assert_eq!(page.meta.next_url, None);
    assert_eq!(page.meta.next_posts_count, 0);
    assert_eq!(page.meta.previous_url.as_deref(), Some("/api/v1/thread/1?limit=10&from=21"));
}

#[tokio::test]
async fn remaining_count_is_capped_at_the_limit() {
    let forum = Forum::new();
    let (_, thread) = thread_with_posts(&forum, 12).await;

    let page = forum
        .services
        .threads
        .page(&thread.id.to_string(), &params(Some("5"), None))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![1, 2, 3, 4, 5]);
    assert_eq!(page.meta.next_posts_count, 5);

    let tail = forum
        .services
        .threads
        .page(&thread.id.to_string(), &params(Some("5"), Some("6")))
        .await
        .unwrap();
    assert_eq!(tail.meta.next_url.as_deref(), Some("/api/v1/thread/1?limit=5&from=11"));
    assert_eq!(tail.meta.next_posts_count, 2);
}

#[tokio::test]
async fn malformed_parameters_fall_back_to_defaults() {
    let forum = Forum::new();
    let (_, thread) = thread_with_posts(&forum, 15).await;

    let page = forum
        .services
        .threads
        .page(&thread.id.to_string(), &params(Some("lots"), Some("-3")))
        .await
        .unwrap();
    assert_eq!(ids(&page), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn later_inserts_do_not_shift_delivered_pages() {
    let forum = Forum::new();
    let (author, thread) = thread_with_posts(&forum, 15).await;
    let id = thread.id.to_string();

    let before = forum.services.threads.page(&id, &params(None, Some("6"))).await.unwrap();
    forum.post(&author, &thread, "late arrival").await;
    let after = forum.services.threads.page(&id, &params(None, Some("6"))).await.unwrap();

    assert_eq!(ids(&before), ids(&after));
    assert_eq!(after.meta.next_url.as_deref(), Some("/api/v1/thread/1?limit=10&from=16"));
}

#[tokio::test]
async fn username_filter_narrows_the_page_and_is_kept_in_links() {
    let forum = Forum::new();
    let (walker, thread) = thread_with_posts(&forum, 0).await;
    let other = forum.user("other", false).await;
    for n in 0..6 {
        let author = if n % 2 == 0 { &walker } else { &other };
        forum.post(author, &thread, "alternating").await;
    }

    let page = forum
        .services
        .threads
        .page(
            &thread.id.to_string(),
            &PageParams { limit: Some("2".into()), username: Some("other".into()), ..PageParams::default() },
        )
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![2, 4]);
    assert_eq!(page.meta.next_url.as_deref(), Some("/api/v1/thread/1?username=other&limit=2&from=6"));
    assert_eq!(page.meta.next_posts_count, 1);
}
