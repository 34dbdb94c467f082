//! Document storage backends.
//!
//! A [`DocumentStore`] persists JSON documents by id. Calls are blocking;
//! the repository runs them on tokio's blocking pool.

use crate::schema::RepositorySchema;
use crate::RepoResult;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait DocumentStore: Send + Sync + 'static {
    fn schema(&self) -> &RepositorySchema;

    /// Active document for `id`, if any.
    fn load(&self, id: &str) -> RepoResult<Option<String>>;

    /// Whether an active document exists for `id`.
    fn exists(&self, id: &str) -> RepoResult<bool>;

    /// Stores a new document. Fails with `Collision` if the id is already
    /// used, including by a soft-removed row.
    fn insert(&self, id: &str, document: &str, at: DateTime<Utc>) -> RepoResult<()>;

    /// Replaces an active document. Returns `false` if there was none.
    fn update(&self, id: &str, document: &str, at: DateTime<Utc>) -> RepoResult<bool>;

    /// Removes an active document. Returns `false` if there was none.
    fn remove(&self, id: &str, at: DateTime<Utc>) -> RepoResult<bool>;

    /// Up to `limit` active `(id, document)` pairs ordered by id, starting
    /// after `after` (or from the first id when `None`).
    ///
    /// Implementations check `cancel` between rows and fail with
    /// `Interrupted` once it fires.
    fn page(
        &self,
        after: Option<&str>,
        limit: usize,
        cancel: &CancellationToken,
    ) -> RepoResult<Vec<(String, String)>>;
}
