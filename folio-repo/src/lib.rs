//! Document repositories for Folio.
//!
//! A [`DocumentRepository`] stores records of one type as JSON documents in
//! a single table described by a [`RepositorySchema`]. Reads are served from
//! a bounded, expiring cache. Writes go through [`EditCommand`]s which run
//! an update pipeline on the tokio runtime:
//!
//! ```text
//! apply changes → before-commit observers → write → invalidate cache
//!     → after-commit observers → future resolves
//! ```
//!
//! Before-commit observers can veto an update. After-commit observers are
//! notified only once the write has succeeded.
//!
//! Storage is pluggable through [`DocumentStore`]; [`SqliteStore`] is the
//! persistent backend and [`MemoryStore`] the in-process one.

mod builder;
mod cache;
mod changes;
mod command;
mod config;
mod context;
mod error;
mod listing;
mod observer;
mod registry;
mod repository;
mod schema;
mod shared;
mod sql;
mod strategy;

pub mod store;

pub use builder::RepositoryBuilder;
pub use cache::RecordCache;
pub use changes::ChangeSet;
pub use command::{BasicCommandFactory, EditCommand, EditCommandFactory, PendingUpdate};
pub use config::RepositoryConfig;
pub use context::{ActionType, UpdateContext, UpdateStatus};
pub use error::{ObserverError, RepoError, RepoResult};
pub use listing::RecordStream;
pub use observer::{observer_fn, FnObserver, UpdateObserver};
pub use registry::RepositoryRegistry;
pub use repository::DocumentRepository;
pub use schema::{DeleteMode, RepositorySchema};
pub use sql::SqlTemplates;
pub use store::{DocumentStore, MemoryStore, SqliteStore};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A value a repository can persist.
///
/// Creates start from `Default::default()`; edits start from a clone of the
/// stored document.
pub trait Document: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {}

impl<T> Document for T where T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {}
