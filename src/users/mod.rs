#[cfg(test)]
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;

#[cfg(test)]
pub use memory::MemoryUserStore;
pub use repo::{PgUserStore, StoreError, UserStore};
pub use repo_types::{ProfileField, UserRecord};
