//! In-memory stores backing the auth engine (tests/dev).

pub mod roles;
pub mod users;

pub use roles::InMemoryRoleStore;
pub use users::InMemoryUserDirectory;
