use crate::AccountId;
use serde::{Deserialize, Serialize};

/// The user responsible for a change.
///
/// Authentication and authorization live outside the core; an `Account` is
/// only recorded on the update context so observers can audit who acted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
    #[serde(default)]
    pub active: bool,
}

impl Account {
    /// Creates an active account with a fresh id.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: AccountId::random(),
            display_name: display_name.into(),
            active: true,
        }
    }

    /// Creates an active account with a known id.
    pub fn with_id(id: AccountId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            active: true,
        }
    }
}
