//! SQLite-backed document store.

use super::DocumentStore;
use crate::schema::RepositorySchema;
use crate::sql::SqlTemplates;
use crate::{RepoError, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Stores one document per row in a single table described by a
/// [`RepositorySchema`]. The table is created if missing.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    schema: RepositorySchema,
    sql: SqlTemplates,
}

impl SqliteStore {
    /// Opens (or creates) a store in the database file at `path`.
    pub fn open(path: impl AsRef<Path>, schema: RepositorySchema) -> RepoResult<Self> {
        schema.validate()?;
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn, schema)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory(schema: RepositorySchema) -> RepoResult<Self> {
        schema.validate()?;
        Self::with_connection(Connection::open_in_memory()?, schema)
    }

    fn with_connection(conn: Connection, schema: RepositorySchema) -> RepoResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            sql: SqlTemplates::new(&schema),
            schema,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> RepoResult<()> {
        self.conn().execute_batch(&self.sql.create_table)?;
        debug!(table = %self.schema.table, "Initialized document table");
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for SqliteStore {
    fn schema(&self) -> &RepositorySchema {
        &self.schema
    }

    fn load(&self, id: &str) -> RepoResult<Option<String>> {
        let conn = self.conn();
        let document = conn
            .query_row(&self.sql.get, params![id], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(document)
    }

    fn exists(&self, id: &str) -> RepoResult<bool> {
        let conn = self.conn();
        let found = conn
            .query_row(&self.sql.exists, params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&self, id: &str, document: &str, at: DateTime<Utc>) -> RepoResult<()> {
        let conn = self.conn();
        let taken = conn
            .query_row(&self.sql.id_taken, params![id], |_| Ok(()))
            .optional()?;
        if taken.is_some() {
            return Err(RepoError::Collision(id.to_string()));
        }

        let result = if self.sql.stamps_modified {
            conn.execute(&self.sql.insert, params![id, document, at.to_rfc3339()])
        } else {
            conn.execute(&self.sql.insert, params![id, document])
        };
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(RepoError::Collision(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update(&self, id: &str, document: &str, at: DateTime<Utc>) -> RepoResult<bool> {
        let conn = self.conn();
        let changed = if self.sql.stamps_modified {
            conn.execute(&self.sql.update, params![id, document, at.to_rfc3339()])?
        } else {
            conn.execute(&self.sql.update, params![id, document])?
        };
        Ok(changed > 0)
    }

    fn remove(&self, id: &str, at: DateTime<Utc>) -> RepoResult<bool> {
        let conn = self.conn();
        let changed = if self.sql.remove_takes_timestamp() {
            conn.execute(&self.sql.remove, params![id, at.to_rfc3339()])?
        } else {
            conn.execute(&self.sql.remove, params![id])?
        };
        Ok(changed > 0)
    }

    fn page(
        &self,
        after: Option<&str>,
        limit: usize,
        cancel: &CancellationToken,
    ) -> RepoResult<Vec<(String, String)>> {
        if cancel.is_cancelled() {
            return Err(RepoError::Interrupted);
        }
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&self.sql.page)?;
        let mut rows = stmt.query(params![after, limit as i64])?;

        let mut documents = Vec::with_capacity(limit);
        while let Some(row) = rows.next()? {
            if cancel.is_cancelled() {
                return Err(RepoError::Interrupted);
            }
            documents.push((row.get::<_, String>(0)?, row.get::<_, String>(1)?));
        }
        Ok(documents)
    }
}
