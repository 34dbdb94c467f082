use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed pointer to an entry managed by some repository.
///
/// References are never persisted on their own; they are embedded inside
/// other documents (a note's subject, a category node's associated work)
/// and resolved through the resolver registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryReference {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
}

impl EntryReference {
    pub fn new(id: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entry_type: entry_type.into(),
        }
    }

    /// Validates that both parts are non-empty.
    pub fn validate(&self) -> crate::Result<()> {
        if self.id.trim().is_empty() {
            return Err(crate::Error::InvalidReference(format!(
                "empty id for entry type '{}'",
                self.entry_type
            )));
        }
        if self.entry_type.trim().is_empty() {
            return Err(crate::Error::InvalidReference(format!(
                "empty entry type for id '{}'",
                self.id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for EntryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entry_type, self.id)
    }
}
