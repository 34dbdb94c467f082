use crate::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};

/// How `remove` treats a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeleteMode {
    /// The row is deleted.
    Hard,
    /// The row is kept and `removed_column` is stamped. Stamped rows are
    /// invisible to reads and listing, and their ids stay reserved.
    Soft { removed_column: String },
}

/// Describes where a repository keeps its documents.
///
/// Each row stores one record as a JSON document keyed by a text id. The
/// modified column, if present, is stamped on every insert, update and soft
/// remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySchema {
    pub table: String,
    pub id_column: String,
    pub data_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_column: Option<String>,
    pub delete_mode: DeleteMode,
}

impl RepositorySchema {
    /// Schema with conventional column names: `id`, `data`, `modified`, and
    /// soft removal through `removed`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id_column: "id".into(),
            data_column: "data".into(),
            modified_column: Some("modified".into()),
            delete_mode: DeleteMode::Soft {
                removed_column: "removed".into(),
            },
        }
    }

    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    pub fn with_data_column(mut self, column: impl Into<String>) -> Self {
        self.data_column = column.into();
        self
    }

    pub fn with_modified_column(mut self, column: Option<&str>) -> Self {
        self.modified_column = column.map(str::to_string);
        self
    }

    pub fn hard_delete(mut self) -> Self {
        self.delete_mode = DeleteMode::Hard;
        self
    }

    pub fn soft_delete(mut self, removed_column: impl Into<String>) -> Self {
        self.delete_mode = DeleteMode::Soft {
            removed_column: removed_column.into(),
        };
        self
    }

    pub fn removed_column(&self) -> Option<&str> {
        match &self.delete_mode {
            DeleteMode::Hard => None,
            DeleteMode::Soft { removed_column } => Some(removed_column),
        }
    }

    /// Checks every name against `[A-Za-z_][A-Za-z0-9_]*` and rejects
    /// duplicate columns. Names are spliced into SQL, so nothing else is
    /// allowed through.
    pub fn validate(&self) -> RepoResult<()> {
        check_identifier("table", &self.table)?;

        let mut columns = vec![("id", &self.id_column), ("data", &self.data_column)];
        if let Some(modified) = &self.modified_column {
            columns.push(("modified", modified));
        }
        if let DeleteMode::Soft { removed_column } = &self.delete_mode {
            columns.push(("removed", removed_column));
        }

        for (role, name) in &columns {
            check_identifier(role, name)?;
        }
        for (i, (role, name)) in columns.iter().enumerate() {
            if let Some((other, _)) = columns[..i]
                .iter()
                .find(|(_, n)| n.eq_ignore_ascii_case(name))
            {
                return Err(RepoError::InvalidSchema(format!(
                    "{role} column '{name}' duplicates the {other} column"
                )));
            }
        }
        Ok(())
    }
}

fn check_identifier(role: &str, name: &str) -> RepoResult<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RepoError::InvalidSchema(format!(
            "{role} name '{name}' is not a plain SQL identifier"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_columns_validate() {
        assert!(RepositorySchema::new("works").validate().is_ok());
    }

    #[test]
    fn rejects_injection_in_table_name() {
        let schema = RepositorySchema::new("works; DROP TABLE works");
        assert!(matches!(schema.validate(), Err(RepoError::InvalidSchema(_))));
    }

    #[test]
    fn rejects_leading_digit_and_empty() {
        assert!(RepositorySchema::new("1works").validate().is_err());
        assert!(RepositorySchema::new("").validate().is_err());
        assert!(RepositorySchema::new("works").with_id_column("").validate().is_err());
    }

    #[test]
    fn rejects_duplicate_columns() {
        let schema = RepositorySchema::new("works").with_data_column("ID");
        assert!(schema.validate().is_err());

        let schema = RepositorySchema::new("works").soft_delete("modified");
        assert!(schema.validate().is_err());
    }

    #[test]
    fn hard_delete_has_no_removed_column() {
        let schema = RepositorySchema::new("works").hard_delete();
        assert_eq!(schema.removed_column(), None);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn round_trips_through_json() {
        let schema = RepositorySchema::new("works").with_modified_column(None);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("\"mode\":\"soft\""));
        assert!(!json.contains("modified_column"));
        let back: RepositorySchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
