mod common;

use std::sync::Arc;

use common::{numbers, text, Forum};
use domains::Anchor;

const WRITERS: u64 = 50;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_posts_get_distinct_contiguous_numbers() {
    let forum = Arc::new(Forum::new());
    let thread = forum.thread_with_posts(0).await;

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let forum = Arc::clone(&forum);
            let input = text(&thread, &format!("writer {i}"));
            tokio::spawn(async move {
                let author = forum.user("writer");
                forum.posts.create(author, input).await.unwrap().post_number
            })
        })
        .collect();

    let mut assigned = Vec::new();
    for handle in handles {
        assigned.push(handle.await.unwrap());
    }
    assigned.sort_unstable();
    assert_eq!(assigned, (0..WRITERS).collect::<Vec<_>>());

    let page = forum
        .threads
        .get(thread.id, Anchor::default(), Some(WRITERS as i64))
        .await
        .unwrap();
    assert_eq!(page.thread.posts_count, WRITERS);
    assert_eq!(numbers(&page.posts), (0..WRITERS).collect::<Vec<_>>());
}
