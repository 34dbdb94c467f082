//! Error types for the repository layer.

use thiserror::Error;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Boxed cause carried by [`RepoError::Canceled`].
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No active record with this id.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A create targeted an id that is already stored.
    #[error("record already exists: {0}")]
    Collision(String),

    /// A pre-commit observer rejected the update. Nothing was written.
    #[error("update to '{id}' canceled: {source}")]
    Canceled {
        id: String,
        #[source]
        source: ObserverError,
    },

    /// `execute` was called on a command that already ran.
    #[error("edit command for '{0}' was already executed")]
    AlreadyExecuted(String),

    /// A recorded change refused to apply.
    #[error("change '{change}' could not be applied: {reason}")]
    InvalidChange { change: String, reason: String },

    /// Caller passed an argument that can never succeed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Waiting on an update context value took too long.
    #[error("timed out waiting for {what} state of '{id}'")]
    Timeout { what: &'static str, id: String },

    /// The update failed before its modified record was produced.
    #[error("update to '{0}' failed before its changes were applied")]
    NoModifiedState(String),

    /// A cancellation token fired while the operation was in flight.
    #[error("operation interrupted")]
    Interrupted,

    /// The repository was closed.
    #[error("repository is closed")]
    Closed,

    /// The schema names an invalid table or column.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend failure that is not a SQLite error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A spawned worker panicked or was aborted.
    #[error("worker failed: {0}")]
    Worker(String),

    /// Failure while resolving an entry reference.
    #[error(transparent)]
    Reference(#[from] folio_resolver::ResolverError),

    /// A repository is already registered for this record type.
    #[error("repository already registered: {0}")]
    AlreadyRegistered(String),

    /// No repository is registered for this record type.
    #[error("no repository registered for {0}")]
    NotRegistered(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_collision(&self) -> bool {
        matches!(self, Self::Collision(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }

    /// Failures of the store or runtime that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Database(_) | Self::Storage(_) | Self::Worker(_)
        )
    }

    pub(crate) fn worker(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}
