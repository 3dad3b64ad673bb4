//! The central domain types and port definitions of the forum core.

pub mod errors;
pub mod events;
pub mod models;
pub mod naming;
pub mod pagination;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use events::*;
pub use models::*;
pub use pagination::*;
pub use ports::*;
