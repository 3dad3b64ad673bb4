//! # services
//!
//! Business logic of the forum core. Everything here talks to storage and the
//! real-time channel only through the ports in `domains`.

pub mod category_service;
pub mod content;
pub mod post_service;
pub mod replies;
pub mod thread_service;
pub mod utils;
pub mod windowing;

pub use category_service::CategoryService;
pub use content::render_content;
pub use post_service::{NewPost, PostService};
pub use thread_service::ThreadService;
pub use windowing::{fetch_window, window_meta, window_start, OrdinalSource, PageLimits};
