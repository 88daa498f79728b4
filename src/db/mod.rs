//! Persistence for users, tool logs and the CVE catalogue.
//!
//! Handlers only see the [`Store`] trait. [`MongoStore`] is the production
//! backend; [`MemoryStore`] keeps everything in process memory for local runs
//! and tests.

mod memory;
pub mod models;
mod mongo;

pub use self::memory::MemoryStore;
pub use self::models::{Cve, CveFilter, LogEntry, LogQuery, User};
pub use self::mongo::MongoStore;

use async_trait::async_trait;
use thiserror::Error;

pub const USERS_COLLECTION: &str = "users";
pub const LOGS_COLLECTION: &str = "logs";
pub const CVES_COLLECTION: &str = "cves";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be reached, even after a reconnect.
    #[error("database unavailable: {0}")]
    Unavailable(String),
    /// A unique key (user email, record id) already exists.
    #[error("duplicate key")]
    Duplicate,
    #[error("database error: {0}")]
    Backend(String),
    #[error("encoding error: {0}")]
    Encoding(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name reported by `/health`.
    fn kind(&self) -> &'static str;

    async fn ping(&self) -> StoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    /// Insert a new user, failing with [`StoreError::Duplicate`] if the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn insert_log(&self, entry: &LogEntry) -> StoreResult<()>;

    /// Logs owned by `query.user_id`, newest first.
    async fn list_logs(&self, query: &LogQuery) -> StoreResult<Vec<LogEntry>>;

    /// Delete a log only if it belongs to `user_id`. Returns whether a log was removed.
    async fn delete_log(&self, user_id: &str, log_id: &str) -> StoreResult<bool>;

    async fn count_cves(&self) -> StoreResult<u64>;

    /// Insert one CVE, failing with [`StoreError::Duplicate`] if the id exists.
    async fn insert_cve(&self, cve: &Cve) -> StoreResult<()>;

    async fn list_cves(&self, filter: &CveFilter) -> StoreResult<Vec<Cve>>;

    async fn find_cve(&self, id: &str) -> StoreResult<Option<Cve>>;

    async fn search_cves(&self, term: &str, limit: u32) -> StoreResult<Vec<Cve>>;
}
