//! # seed
//!
//! Populates a store with a category, a few threads and enough posts to span
//! several pages, then prints one centered post window and the first thread
//! window as JSON.

use std::sync::Arc;

use anyhow::Context;
use configs::{AppConfig, LogFormat, LoggingConfig};
use domains::{
    Anchor, CategoryRepository, DomainError, PostRepository, ThreadRepository, UserDirectory,
};
use services::{CategoryService, NewPost, PageLimits, PostService, ThreadService};
use storage_adapters::{BroadcastEvents, MemoryStore};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const SEED_USERNAME: &str = "seed";

struct Ports {
    categories: Arc<dyn CategoryRepository>,
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserDirectory>,
}

impl Ports {
    fn memory(author_id: Uuid) -> Self {
        let store = Arc::new(MemoryStore::new());
        store.add_user(author_id, SEED_USERNAME);
        Self {
            categories: store.clone(),
            threads: store.clone(),
            posts: store.clone(),
            users: store,
        }
    }

    #[cfg(feature = "db-postgres")]
    async fn postgres(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let store = Arc::new(storage_adapters::PgStore::connect(url, max_connections).await?);
        Ok(Self {
            categories: store.clone(),
            threads: store.clone(),
            posts: store.clone(),
            users: store,
        })
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn open_store(config: &AppConfig, author_id: Uuid) -> anyhow::Result<Ports> {
    match &config.database.url {
        #[cfg(feature = "db-postgres")]
        Some(url) => {
            use secrecy::ExposeSecret;
            Ports::postgres(url.expose_secret(), config.database.max_connections).await
        }
        #[cfg(not(feature = "db-postgres"))]
        Some(_) => {
            tracing::warn!("database.url is set but postgres support is not compiled in");
            Ok(Ports::memory(author_id))
        }
        None => Ok(Ports::memory(author_id)),
    }
}

fn post_body(thread: u32, n: u32) -> String {
    match n % 4 {
        0 => format!("Post **{n}** of thread {thread}"),
        1 => format!("See [the docs](docs.rs/tokio) for post {n}"),
        2 => format!("```rust\nfn post() -> u32 {{ {n} }}\n```"),
        _ => format!("- first\n- second\n\npost {n} 🦀"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.logging);

    let author_id = Uuid::now_v7();
    let ports = open_store(&config, author_id).await?;
    let events = Arc::new(BroadcastEvents::default());
    let pagination = config.pagination;

    let categories = CategoryService::new(
        ports.categories.clone(),
        ports.threads.clone(),
        PageLimits::new(pagination.threads_per_page, pagination.max_page_size),
    );
    let threads = ThreadService::new(
        ports.threads.clone(),
        ports.posts.clone(),
        ports.categories.clone(),
        PageLimits::new(pagination.posts_per_page, pagination.max_page_size),
    );
    let posts = PostService::new(
        ports.posts.clone(),
        ports.threads.clone(),
        ports.users.clone(),
        events,
    );

    let category = match categories.create(Some(config.seed.category.as_str()), None).await {
        Ok(category) => category,
        Err(DomainError::CategoryAlreadyExists) => categories.resolve(&config.seed.category).await?,
        Err(err) => return Err(err.into()),
    };
    let can_reply = ports.users.username(author_id).await?.is_some();

    let mut seeded = Vec::new();
    for t in 0..config.seed.threads {
        let name = format!("Seeded thread {t}");
        let thread = threads
            .create(Some(name.as_str()), &category.name, author_id)
            .await?;

        let mut previous = None;
        for n in 0..config.seed.posts_per_thread {
            let post = posts
                .create(
                    author_id,
                    NewPost {
                        thread_id: Some(thread.id),
                        content: Some(post_body(t, n)),
                        replying_to_id: if can_reply && n % 5 == 4 { previous } else { None },
                        mentions: Vec::new(),
                    },
                )
                .await?;
            previous = Some(post.id);
        }
        tracing::info!(thread_id = %thread.id, posts = config.seed.posts_per_thread, "thread seeded");
        seeded.push(thread.id);
    }

    if let Some(&thread_id) = seeded.first() {
        let middle = u64::from(config.seed.posts_per_thread / 2);
        let page = threads.get(thread_id, Anchor::Around(middle), None).await?;
        println!("{}", serde_json::to_string_pretty(&page)?);
    }

    let listing = categories.threads(&category.name, Anchor::default(), None).await?;
    println!("{}", serde_json::to_string_pretty(&listing)?);

    Ok(())
}
