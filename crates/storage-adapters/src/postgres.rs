//! # PostgreSQL store
//!
//! Maps the relational model onto the `domains` models. Schema management is
//! owned by the deployment; the adapter expects these tables:
//!
//! ```text
//! categories (id UUID PK, name TEXT, key TEXT UNIQUE, color TEXT, created_at TIMESTAMPTZ)
//! threads    (id UUID PK, category_id UUID FK, author_id UUID, name TEXT, slug TEXT,
//!             posts_count BIGINT, locked BOOLEAN, created_at TIMESTAMPTZ, last_bump TIMESTAMPTZ)
//! posts      (id UUID PK, thread_id UUID FK ON DELETE CASCADE, author_id UUID,
//!             post_number BIGINT, content TEXT, plain_text TEXT, reply_id UUID NULL,
//!             replying_to_username TEXT NULL, removed BOOLEAN, created_at TIMESTAMPTZ,
//!             UNIQUE (thread_id, post_number))
//! post_likes (post_id UUID FK ON DELETE CASCADE, user_id UUID, PRIMARY KEY (post_id, user_id))
//! users      (id UUID PK, username TEXT)
//! ```

use async_trait::async_trait;
use domains::{
    Category, CategoryRepository, DomainError, Post, PostDraft, PostRepository, RenderedContent,
    Result, Thread, ThreadRepository, ThreadScope, UserDirectory,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

const CATEGORY_COLUMNS: &str = "id, name, key, color, created_at";

const THREAD_COLUMNS: &str =
    "id, category_id, author_id, name, slug, posts_count, locked, created_at, last_bump";

const POST_COLUMNS: &str = "p.id, p.thread_id, p.author_id, p.post_number, p.content, \
     p.plain_text, p.reply_id, p.replying_to_username, p.removed, p.created_at, \
     ARRAY(SELECT l.user_id FROM post_likes l WHERE l.post_id = p.id) AS likes";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(db_error)?;
        tracing::info!(max_connections, "connected to postgres");
        Ok(Self::new(pool))
    }
}

fn db_error(err: sqlx::Error) -> DomainError {
    DomainError::storage(err)
}

fn has_code(err: &sqlx::Error, expected: &str) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == expected)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_code(err, UNIQUE_VIOLATION)
}

fn count_to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn count_from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn category_from_row(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        key: row.try_get("key").map_err(db_error)?,
        color: row.try_get("color").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
    })
}

fn thread_from_row(row: &PgRow) -> Result<Thread> {
    Ok(Thread {
        id: row.try_get("id").map_err(db_error)?,
        category_id: row.try_get("category_id").map_err(db_error)?,
        author_id: row.try_get("author_id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        slug: row.try_get("slug").map_err(db_error)?,
        posts_count: count_from_db(row.try_get("posts_count").map_err(db_error)?),
        locked: row.try_get("locked").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        last_bump: row.try_get("last_bump").map_err(db_error)?,
    })
}

fn post_from_row(row: &PgRow) -> Result<Post> {
    let likes: Vec<Uuid> = row.try_get("likes").map_err(db_error)?;
    Ok(Post {
        id: row.try_get("id").map_err(db_error)?,
        thread_id: row.try_get("thread_id").map_err(db_error)?,
        author_id: row.try_get("author_id").map_err(db_error)?,
        post_number: count_from_db(row.try_get("post_number").map_err(db_error)?),
        content: row.try_get("content").map_err(db_error)?,
        plain_text: row.try_get("plain_text").map_err(db_error)?,
        reply_id: row.try_get("reply_id").map_err(db_error)?,
        replying_to_username: row.try_get("replying_to_username").map_err(db_error)?,
        removed: row.try_get("removed").map_err(db_error)?,
        likes: likes.into_iter().collect(),
        created_at: row.try_get("created_at").map_err(db_error)?,
    })
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn insert(&self, category: Category) -> Result<Category> {
        let inserted = sqlx::query(
            "INSERT INTO categories (id, name, key, color, created_at) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (key) DO NOTHING RETURNING id",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.key)
        .bind(&category.color)
        .bind(category.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match inserted {
            Some(_) => Ok(category),
            None => Err(DomainError::CategoryAlreadyExists),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Category>> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE key = $1"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Category>> {
        sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name, id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(category_from_row)
            .collect()
    }

    async fn update(&self, category: Category) -> Result<Category> {
        let result = sqlx::query("UPDATE categories SET name = $2, key = $3, color = $4 WHERE id = $1")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.key)
            .bind(&category.color)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(DomainError::not_found("category", category.id))
            }
            Ok(_) => Ok(category),
            Err(err) if is_unique_violation(&err) => Err(DomainError::CategoryAlreadyExists),
            Err(err) => Err(db_error(err)),
        }
    }

    /// Atomic operation: the category row is locked first, so thread inserts
    /// racing the delete wait for it and then fail their foreign key check.
    async fn delete_reassigning(&self, id: Uuid, fallback_id: Uuid) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        let moved = sqlx::query("UPDATE threads SET category_id = $2 WHERE category_id = $1")
            .bind(id)
            .bind(fallback_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(moved)
    }
}

#[async_trait]
impl ThreadRepository for PgStore {
    async fn insert(&self, thread: Thread) -> Result<Thread> {
        let result = sqlx::query(
            "INSERT INTO threads (id, category_id, author_id, name, slug, posts_count, locked, created_at, last_bump) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(thread.id)
        .bind(thread.category_id)
        .bind(thread.author_id)
        .bind(&thread.name)
        .bind(&thread.slug)
        .bind(count_to_db(thread.posts_count))
        .bind(thread.locked)
        .bind(thread.created_at)
        .bind(thread.last_bump)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(thread),
            Err(err) if has_code(&err, FOREIGN_KEY_VIOLATION) => Err(DomainError::InvalidCategory),
            Err(err) => Err(db_error(err)),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Thread>> {
        let row = sqlx::query(&format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(thread_from_row).transpose()
    }

    async fn set_locked(&self, id: Uuid, locked: bool) -> Result<Option<Thread>> {
        let row = sqlx::query(&format!(
            "UPDATE threads SET locked = $2 WHERE id = $1 RETURNING {THREAD_COLUMNS}"
        ))
        .bind(id)
        .bind(locked)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.as_ref().map(thread_from_row).transpose()
    }

    /// Posts and their likes go with the thread through `ON DELETE CASCADE`.
    async fn delete(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM threads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(done.rows_affected() > 0)
    }

    async fn count(&self, scope: ThreadScope) -> Result<u64> {
        let category = match scope {
            ThreadScope::All => None,
            ThreadScope::Category(id) => Some(id),
        };
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM threads WHERE ($1::uuid IS NULL OR category_id = $1)",
        )
        .bind(category)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(count_from_db(total))
    }

    async fn slice(&self, scope: ThreadScope, from: u64, limit: u64) -> Result<Vec<Thread>> {
        let category = match scope {
            ThreadScope::All => None,
            ThreadScope::Category(id) => Some(id),
        };
        sqlx::query(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads WHERE ($1::uuid IS NULL OR category_id = $1) \
             ORDER BY last_bump DESC, id DESC OFFSET $2 LIMIT $3"
        ))
        .bind(category)
        .bind(count_to_db(from))
        .bind(count_to_db(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .iter()
        .map(thread_from_row)
        .collect()
    }
}

#[async_trait]
impl PostRepository for PgStore {
    /// Atomic operation to number and store a post.
    ///
    /// The thread row is locked with `FOR UPDATE`, so concurrent appends to the
    /// same thread queue up behind each other and read distinct counters.
    async fn append(&self, thread_id: Uuid, draft: PostDraft) -> Result<Post> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let locked: Option<bool> =
            sqlx::query_scalar("SELECT locked FROM threads WHERE id = $1 FOR UPDATE")
                .bind(thread_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;
        match locked {
            None => {
                return Err(DomainError::invalid_parameter(
                    "threadId",
                    "thread does not exist",
                ))
            }
            Some(true) => return Err(DomainError::ThreadLocked),
            Some(false) => {}
        }

        let post_number: i64 = sqlx::query_scalar(
            "UPDATE threads SET posts_count = posts_count + 1, last_bump = $2 \
             WHERE id = $1 RETURNING posts_count - 1",
        )
        .bind(thread_id)
        .bind(draft.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let post = draft.into_post(thread_id, count_from_db(post_number));

        sqlx::query(
            "INSERT INTO posts (id, thread_id, author_id, post_number, content, plain_text, reply_id, replying_to_username, removed, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(post.id)
        .bind(post.thread_id)
        .bind(post.author_id)
        .bind(post_number)
        .bind(&post.content)
        .bind(&post.plain_text)
        .bind(post.reply_id)
        .bind(&post.replying_to_username)
        .bind(post.removed)
        .bind(post.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(post_from_row).transpose()
    }

    async fn slice(&self, thread_id: Uuid, from: u64, limit: u64) -> Result<Vec<Post>> {
        sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             WHERE p.thread_id = $1 AND p.post_number >= $2 \
             ORDER BY p.post_number ASC LIMIT $3"
        ))
        .bind(thread_id)
        .bind(count_to_db(from))
        .bind(count_to_db(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .iter()
        .map(post_from_row)
        .collect()
    }

    async fn replies_to(&self, post_id: Uuid) -> Result<Vec<Post>> {
        sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.reply_id = $1 ORDER BY p.post_number ASC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .iter()
        .map(post_from_row)
        .collect()
    }

    async fn mark_removed(&self, post_id: Uuid, content: RenderedContent) -> Result<Post> {
        let done = sqlx::query(
            "UPDATE posts SET content = $2, plain_text = $3, removed = TRUE WHERE id = $1",
        )
        .bind(post_id)
        .bind(&content.html)
        .bind(&content.plain_text)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if done.rows_affected() == 0 {
            return Err(DomainError::invalid_parameter("id", "post does not exist"));
        }

        PostRepository::find_by_id(self, post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn username(&self, user_id: Uuid) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }
}
