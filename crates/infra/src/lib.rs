//! Infrastructure layer: stores, caches, configuration.

pub mod cache;
pub mod config;
pub mod store;

pub use cache::{CacheConfig, CachedOuStore, CachedRoleStore};
pub use config::Settings;
pub use store::{InMemoryRoleStore, InMemoryUserDirectory};
