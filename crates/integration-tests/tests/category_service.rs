mod common;

use common::Forum;
use domains::{Anchor, Category, DomainError};

#[tokio::test]
async fn create_normalizes_key_and_rejects_duplicates() {
    let forum = Forum::new();
    let category = forum.category("another category here").await;
    assert_eq!(category.key, "ANOTHER_CATEGORY_HERE");
    assert_eq!(category.color, "#cccccc");

    let err = forum
        .categories
        .create(Some("Another Category HERE"), Some("#ff0000"))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::CategoryAlreadyExists);
}

#[tokio::test]
async fn create_validates_name() {
    let forum = Forum::new();
    assert_eq!(
        forum.categories.create(None, None).await.unwrap_err(),
        DomainError::validation("name cannot be null")
    );
    assert_eq!(
        forum.categories.create(Some("   "), None).await.unwrap_err(),
        DomainError::validation("The category name can't be empty")
    );
}

#[tokio::test]
async fn unknown_category_listing_is_rejected() {
    let forum = Forum::new();
    let err = forum
        .categories
        .threads("nope", Anchor::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::InvalidCategory);
}

#[tokio::test]
async fn threads_are_listed_by_latest_activity() {
    let forum = Forum::new();
    let author = forum.user("alice");
    let category = forum.category("general").await;
    let quiet = forum.thread(&category, "quiet thread", author).await;
    let busy = forum.thread(&category, "busy thread", author).await;
    forum.post(&busy, author, "first").await;
    forum.post(&quiet, author, "bump").await;

    let page = forum
        .categories
        .threads("GENERAL", Anchor::default(), None)
        .await
        .unwrap();
    let ids: Vec<_> = page.threads.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![quiet.id, busy.id]);
    assert_eq!(page.category.map(|c| c.id), Some(category.id));
    assert_eq!(page.meta.threads_remaining, 0);
    assert_eq!(page.meta.next_url, None);
}

#[tokio::test]
async fn all_spans_every_category() {
    let forum = Forum::new();
    let author = forum.user("alice");
    let first = forum.category("first").await;
    let second = forum.category("second").await;
    forum.thread(&first, "one thread", author).await;
    forum.thread(&second, "two thread", author).await;

    let page = forum
        .categories
        .threads("all", Anchor::default(), None)
        .await
        .unwrap();
    assert!(page.category.is_none());
    assert_eq!(page.threads.len(), 2);
}

#[tokio::test]
async fn thread_listing_paginates() {
    let forum = Forum::new();
    let author = forum.user("alice");
    let category = forum.category("general").await;
    for i in 0..25 {
        forum.thread(&category, &format!("thread {i}"), author).await;
    }

    let first = forum
        .categories
        .threads("general", Anchor::From(0), Some(10))
        .await
        .unwrap();
    assert_eq!(first.threads.len(), 10);
    assert_eq!(first.meta.threads_remaining, 15);
    assert_eq!(first.meta.next_threads_count, 10);

    let next = first.meta.next_url.unwrap();
    let last = forum
        .categories
        .threads("general", Anchor::From(20), Some(next.limit as i64))
        .await
        .unwrap();
    assert_eq!(last.threads.len(), 5);
    assert_eq!(last.meta.threads_remaining, 0);
    assert_eq!(last.meta.previous_threads_count, 10);
}

#[tokio::test]
async fn delete_moves_threads_to_fallback() {
    let forum = Forum::new();
    let author = forum.user("alice");
    let doomed = forum.category("doomed").await;
    let thread = forum.thread(&doomed, "survivor", author).await;

    let moved = forum.categories.delete(doomed.id).await.unwrap();
    assert_eq!(moved, 1);

    let fallback = forum.categories.resolve(Category::FALLBACK_NAME).await.unwrap();
    let page = forum
        .categories
        .threads(Category::FALLBACK_NAME, Anchor::default(), None)
        .await
        .unwrap();
    assert_eq!(page.threads.len(), 1);
    assert_eq!(page.threads[0].id, thread.id);
    assert_eq!(page.threads[0].category_id, fallback.id);

    assert_eq!(
        forum.categories.resolve("doomed").await.unwrap_err(),
        DomainError::InvalidCategory
    );
}

#[tokio::test]
async fn fallback_category_cannot_be_deleted() {
    let forum = Forum::new();
    let other = forum.category(Category::FALLBACK_NAME).await;
    let err = forum.categories.delete(other.id).await.unwrap_err();
    assert!(err.is_caller_error());
}

#[tokio::test]
async fn rename_frees_the_old_key() {
    let forum = Forum::new();
    let category = forum.category("old name").await;
    let renamed = forum
        .categories
        .update(category.id, Some("new name"), Some("#123456"))
        .await
        .unwrap();
    assert_eq!(renamed.key, "NEW_NAME");
    assert_eq!(renamed.color, "#123456");

    forum.category("old name").await;
    let names: Vec<_> = forum
        .categories
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["new name".to_string(), "old name".to_string()]);
}

#[tokio::test]
async fn all_cannot_name_a_category() {
    let forum = Forum::new();
    let reserved = DomainError::validation("The category name \"ALL\" is reserved");
    assert_eq!(
        forum.categories.create(Some(" all "), None).await.unwrap_err(),
        reserved
    );

    let category = forum.category("general").await;
    assert_eq!(
        forum
            .categories
            .update(category.id, Some("All"), None)
            .await
            .unwrap_err(),
        reserved
    );
    assert_eq!(forum.categories.list().await.unwrap(), vec![category]);
}
