//! Local persistent key-value storage shared by the session guard and the
//! signup form.
//!
//! Mirrors the browser's local storage: string keys, string values, no
//! locking between writers (last write wins).

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StorageError;

/// Storage key for the bearer access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key for the signup email draft
pub const SIGNUP_EMAIL_KEY: &str = "signup_email";

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Key-value store backing the client session.
pub trait SessionStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a single key
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Remove every key, including non-session ones such as the signup draft
    fn clear(&self) -> StorageResult<()>;
}
