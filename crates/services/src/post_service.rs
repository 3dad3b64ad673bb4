//! Post creation, lookup, moderation and likes.
//!
//! `create` checks its preconditions in a fixed order and stops at the first
//! failure; nothing is written before all of them pass. Number assignment and
//! the thread counter increment are a single storage call, see
//! [`PostRepository::append`].

use std::sync::Arc;

use domains::{
    DomainError, ForumEvent, ForumEvents, Post, PostDetail, PostDraft, PostRepository,
    ReplyNotice, Result, ThreadRepository, UserDirectory, REMOVED_POST_TEXT,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::content::render_content;
use crate::replies::{resolve_reply_target, snapshot};
use crate::utils::filter_mentions;

/// Parameters of a new post, as handed over by the request layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub thread_id: Option<Uuid>,
    /// Raw markdown
    pub content: Option<String>,
    pub replying_to_id: Option<Uuid>,
    #[serde(default)]
    pub mentions: Vec<String>,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    threads: Arc<dyn ThreadRepository>,
    users: Arc<dyn UserDirectory>,
    events: Arc<dyn ForumEvents>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        threads: Arc<dyn ThreadRepository>,
        users: Arc<dyn UserDirectory>,
        events: Arc<dyn ForumEvents>,
    ) -> Self {
        Self {
            posts,
            threads,
            users,
            events,
        }
    }

    #[tracing::instrument(skip(self, input), fields(thread_id = ?input.thread_id))]
    pub async fn create(&self, author_id: Uuid, input: NewPost) -> Result<Post> {
        // 1. Thread exists
        let thread = match input.thread_id {
            Some(id) => self.threads.find_by_id(id).await?,
            None => None,
        }
        .ok_or_else(|| DomainError::invalid_parameter("threadId", "thread does not exist"))?;

        // 2. Thread accepts posts
        if thread.locked {
            tracing::warn!(thread_id = %thread.id, "post rejected, thread locked");
            return Err(DomainError::ThreadLocked);
        }

        // 3. Reply target is valid
        let reply = match input.replying_to_id {
            Some(id) => {
                let target = resolve_reply_target(self.posts.as_ref(), id, &thread).await?;
                Some(snapshot(self.users.as_ref(), &target).await?)
            }
            None => None,
        };

        // 4. Content renders to something
        let content = render_content(input.content.as_deref())?;
        let mentions = filter_mentions(&input.mentions);

        let reply_to = reply.as_ref().map(|target| ReplyNotice {
            post_id: target.post_id,
            username: target.username.clone(),
        });
        let post = self
            .posts
            .append(thread.id, PostDraft::new(author_id, content, reply))
            .await?;
        tracing::info!(
            post_id = %post.id,
            thread_id = %post.thread_id,
            post_number = post.post_number,
            "post created"
        );

        let event = ForumEvent::PostCreated {
            thread_id: post.thread_id,
            post_id: post.id,
            post_number: post.post_number,
            author_id,
            reply_to,
            mentions,
        };
        if let Err(err) = self.events.publish(event) {
            tracing::warn!(error = %err, post_id = %post.id, "failed to publish post event");
        }

        Ok(post)
    }

    /// The post and every post replying to it.
    pub async fn get(&self, post_id: Uuid) -> Result<PostDetail> {
        let post = self.find(post_id).await?;
        let replies = self.posts.replies_to(post.id).await?;
        Ok(PostDetail { post, replies })
    }

    /// Replaces the content with the removal notice. Removal is final.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, post_id: Uuid) -> Result<Post> {
        let post = self.find(post_id).await?;
        if post.removed {
            return Err(DomainError::PostRemoved);
        }
        let placeholder = render_content(Some(REMOVED_POST_TEXT))?;
        let post = self.posts.mark_removed(post.id, placeholder).await?;
        tracing::info!(post_id = %post.id, "post removed");
        Ok(post)
    }

    #[tracing::instrument(skip(self))]
    pub async fn like(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let post = self.find(post_id).await?;
        if post.author_id == user_id {
            return Err(DomainError::CannotLikeOwnPost);
        }
        if post.removed {
            return Err(DomainError::PostRemoved);
        }
        self.posts.add_like(post.id, user_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn unlike(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let post = self.find(post_id).await?;
        self.posts.remove_like(post.id, user_id).await
    }

    async fn find(&self, post_id: Uuid) -> Result<Post> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::invalid_parameter("id", "post does not exist"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{
        MockForumEvents, MockPostRepository, MockThreadRepository, MockUserDirectory,
        RenderedContent, Thread,
    };
    use mockall::predicate::eq;

    struct Mocks {
        posts: MockPostRepository,
        threads: MockThreadRepository,
        users: MockUserDirectory,
        events: MockForumEvents,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                posts: MockPostRepository::new(),
                threads: MockThreadRepository::new(),
                users: MockUserDirectory::new(),
                events: MockForumEvents::new(),
            }
        }

        fn service(self) -> PostService {
            PostService::new(
                Arc::new(self.posts),
                Arc::new(self.threads),
                Arc::new(self.users),
                Arc::new(self.events),
            )
        }
    }

    fn thread(locked: bool) -> Thread {
        let mut thread = Thread::new(Some("thread"), Uuid::now_v7(), Uuid::now_v7()).unwrap();
        thread.locked = locked;
        thread
    }

    fn existing_post(thread_id: Uuid, author_id: Uuid) -> Post {
        PostDraft::new(
            author_id,
            RenderedContent {
                html: "<p>content</p>\n".into(),
                plain_text: "content\n".into(),
            },
            None,
        )
        .into_post(thread_id, 0)
    }

    fn new_post(thread_id: Uuid, content: &str) -> NewPost {
        NewPost {
            thread_id: Some(thread_id),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_thread_short_circuits() {
        let mut mocks = Mocks::new();
        mocks.threads.expect_find_by_id().returning(|_| Ok(None));
        mocks.posts.expect_append().never();
        mocks.events.expect_publish().never();

        let err = mocks
            .service()
            .create(Uuid::now_v7(), new_post(Uuid::now_v7(), "content"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_parameter("threadId", "thread does not exist")
        );
    }

    #[tokio::test]
    async fn missing_thread_id() {
        let mut mocks = Mocks::new();
        mocks.threads.expect_find_by_id().never();

        let input = NewPost {
            content: Some("content".into()),
            ..Default::default()
        };
        let err = mocks.service().create(Uuid::now_v7(), input).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_parameter("threadId", "thread does not exist")
        );
    }

    #[tokio::test]
    async fn locked_thread_is_checked_before_reply_and_content() {
        let thread = thread(true);
        let thread_id = thread.id;
        let mut mocks = Mocks::new();
        mocks
            .threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(thread.clone())));
        mocks.posts.expect_find_by_id().never();
        mocks.posts.expect_append().never();

        let input = NewPost {
            thread_id: Some(thread_id),
            content: Some("   ".into()),
            replying_to_id: Some(Uuid::now_v7()),
            mentions: vec![],
        };
        let err = mocks.service().create(Uuid::now_v7(), input).await.unwrap_err();
        assert_eq!(err, DomainError::ThreadLocked);
    }

    #[tokio::test]
    async fn reply_is_checked_before_content() {
        let thread = thread(false);
        let thread_id = thread.id;
        let mut mocks = Mocks::new();
        mocks
            .threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(thread.clone())));
        mocks.posts.expect_find_by_id().returning(|_| Ok(None));
        mocks.posts.expect_append().never();

        let input = NewPost {
            thread_id: Some(thread_id),
            content: None,
            replying_to_id: Some(Uuid::now_v7()),
            mentions: vec![],
        };
        let err = mocks.service().create(Uuid::now_v7(), input).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_parameter("replyingToId", "post does not exist")
        );
    }

    #[tokio::test]
    async fn blank_content_never_reaches_storage() {
        let thread = thread(false);
        let thread_id = thread.id;
        let mut mocks = Mocks::new();
        mocks
            .threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(thread.clone())));
        mocks.posts.expect_append().never();
        mocks.events.expect_publish().never();

        let err = mocks
            .service()
            .create(Uuid::now_v7(), new_post(thread_id, "<p></p>"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn created_reply_publishes_one_event() {
        let thread = thread(false);
        let thread_id = thread.id;
        let target = existing_post(thread_id, Uuid::now_v7());
        let target_id = target.id;
        let author = Uuid::now_v7();

        let mut mocks = Mocks::new();
        mocks
            .threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(thread.clone())));
        mocks
            .posts
            .expect_find_by_id()
            .with(eq(target_id))
            .returning(move |_| Ok(Some(target.clone())));
        mocks
            .users
            .expect_username()
            .returning(|_| Ok(Some("username".into())));
        mocks
            .posts
            .expect_append()
            .times(1)
            .returning(|thread_id, draft| Ok(draft.into_post(thread_id, 1)));
        mocks
            .events
            .expect_publish()
            .times(1)
            .withf(move |event| {
                matches!(event, ForumEvent::PostCreated { post_number: 1, reply_to: Some(notice), mentions, .. }
                    if notice.post_id == target_id && notice.username == "username" && mentions == &vec!["bob".to_string()])
            })
            .returning(|_| Ok(()));

        let input = NewPost {
            thread_id: Some(thread_id),
            content: Some("another post".into()),
            replying_to_id: Some(target_id),
            mentions: vec!["bob".into(), "bob".into()],
        };
        let post = mocks.service().create(author, input).await.unwrap();

        assert_eq!(post.post_number, 1);
        assert_eq!(post.author_id, author);
        assert_eq!(post.content, "<p>another post</p>\n");
        assert_eq!(post.plain_text, "another post\n");
        assert_eq!(post.reply_id, Some(target_id));
        assert_eq!(post.replying_to_username.as_deref(), Some("username"));
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_creation() {
        let thread = thread(false);
        let thread_id = thread.id;
        let mut mocks = Mocks::new();
        mocks
            .threads
            .expect_find_by_id()
            .returning(move |_| Ok(Some(thread.clone())));
        mocks
            .posts
            .expect_append()
            .returning(|thread_id, draft| Ok(draft.into_post(thread_id, 0)));
        mocks
            .events
            .expect_publish()
            .returning(|_| Err(DomainError::storage("no subscribers")));

        let post = mocks
            .service()
            .create(Uuid::now_v7(), new_post(thread_id, "content"))
            .await
            .unwrap();
        assert_eq!(post.post_number, 0);
    }

    #[tokio::test]
    async fn cannot_like_own_post() {
        let author = Uuid::now_v7();
        let post = existing_post(Uuid::now_v7(), author);
        let post_id = post.id;
        let mut mocks = Mocks::new();
        mocks
            .posts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(post.clone())));
        mocks.posts.expect_add_like().never();

        let err = mocks.service().like(post_id, author).await.unwrap_err();
        assert_eq!(err, DomainError::CannotLikeOwnPost);
    }

    #[tokio::test]
    async fn removing_twice_is_rejected() {
        let mut post = existing_post(Uuid::now_v7(), Uuid::now_v7());
        post.removed = true;
        let post_id = post.id;
        let mut mocks = Mocks::new();
        mocks
            .posts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(post.clone())));
        mocks.posts.expect_mark_removed().never();

        let err = mocks.service().remove(post_id).await.unwrap_err();
        assert_eq!(err, DomainError::PostRemoved);
    }

    #[tokio::test]
    async fn removal_stores_rendered_placeholder() {
        let post = existing_post(Uuid::now_v7(), Uuid::now_v7());
        let post_id = post.id;
        let mut mocks = Mocks::new();
        let stored = post.clone();
        mocks
            .posts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        mocks
            .posts
            .expect_mark_removed()
            .withf(|_, content| {
                content.html == "<p>[This post has been removed by an administrator]</p>\n"
            })
            .returning(move |_, content| {
                let mut removed = post.clone();
                removed.content = content.html;
                removed.plain_text = content.plain_text;
                removed.removed = true;
                Ok(removed)
            });

        let removed = mocks.service().remove(post_id).await.unwrap();
        assert!(removed.removed);
    }
}
