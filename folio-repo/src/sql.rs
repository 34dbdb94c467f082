//! SQL statement templates derived from a [`RepositorySchema`].
//!
//! Parameter order is fixed across statements: `?1` id, `?2` document (or
//! removal timestamp for soft removes), `?3` modified timestamp. Statements
//! only mention `?3` when the schema has a modified column.

use crate::schema::{DeleteMode, RepositorySchema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplates {
    pub create_table: String,
    pub get: String,
    pub exists: String,
    /// Matches soft-removed rows too, so their ids stay reserved.
    pub id_taken: String,
    pub insert: String,
    pub update: String,
    pub remove: String,
    /// Keyset page: `?1` last id seen (`NULL` for the first page), `?2`
    /// limit. Selects id and document.
    pub page: String,
    /// Whether insert and update bind `?3`.
    pub stamps_modified: bool,
}

impl SqlTemplates {
    /// Builds the templates. The schema must already be validated.
    pub fn new(schema: &RepositorySchema) -> Self {
        let t = &schema.table;
        let id = &schema.id_column;
        let data = &schema.data_column;
        let modified = schema.modified_column.as_deref();

        let active = match &schema.delete_mode {
            DeleteMode::Hard => String::new(),
            DeleteMode::Soft { removed_column } => format!(" AND {removed_column} IS NULL"),
        };

        let mut columns = vec![
            format!("{id} TEXT PRIMARY KEY"),
            format!("{data} TEXT NOT NULL"),
        ];
        if let Some(m) = modified {
            columns.push(format!("{m} TEXT"));
        }
        if let DeleteMode::Soft { removed_column } = &schema.delete_mode {
            columns.push(format!("{removed_column} TEXT"));
        }
        let create_table = format!("CREATE TABLE IF NOT EXISTS {t} ({})", columns.join(", "));

        let (insert, update) = match modified {
            Some(m) => (
                format!("INSERT INTO {t} ({id}, {data}, {m}) VALUES (?1, ?2, ?3)"),
                format!("UPDATE {t} SET {data} = ?2, {m} = ?3 WHERE {id} = ?1{active}"),
            ),
            None => (
                format!("INSERT INTO {t} ({id}, {data}) VALUES (?1, ?2)"),
                format!("UPDATE {t} SET {data} = ?2 WHERE {id} = ?1{active}"),
            ),
        };

        let remove = match (&schema.delete_mode, modified) {
            (DeleteMode::Hard, _) => format!("DELETE FROM {t} WHERE {id} = ?1"),
            (DeleteMode::Soft { removed_column }, Some(m)) => format!(
                "UPDATE {t} SET {removed_column} = ?2, {m} = ?2 WHERE {id} = ?1{active}"
            ),
            (DeleteMode::Soft { removed_column }, None) => {
                format!("UPDATE {t} SET {removed_column} = ?2 WHERE {id} = ?1{active}")
            }
        };

        Self {
            create_table,
            get: format!("SELECT {data} FROM {t} WHERE {id} = ?1{active}"),
            exists: format!("SELECT 1 FROM {t} WHERE {id} = ?1{active}"),
            id_taken: format!("SELECT 1 FROM {t} WHERE {id} = ?1"),
            insert,
            update,
            remove,
            page: format!(
                "SELECT {id}, {data} FROM {t} WHERE (?1 IS NULL OR {id} > ?1){active} ORDER BY {id} LIMIT ?2"
            ),
            stamps_modified: modified.is_some(),
        }
    }

    /// Whether `remove` binds a timestamp as `?2`.
    pub fn remove_takes_timestamp(&self) -> bool {
        !self.remove.starts_with("DELETE")
    }
}
