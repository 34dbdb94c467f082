//! Error types for reference resolution.

use folio_types::EntryReference;
use thiserror::Error;

/// Result type for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Errors raised while registering resolvers, resolving references, or
/// encoding/decoding tokens.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The id contains the reserved token separator, or ends in `':'`, and
    /// cannot be tokenized.
    #[error("cannot tokenize reference with id '{id}': ids must not contain \"::\" or end in ':'")]
    ReservedSeparator { id: String },

    /// The token is not valid base64, not UTF-8, or lacks a separator.
    #[error("invalid entry reference token '{token}': {reason}")]
    InvalidToken { token: String, reason: String },

    /// No registered resolver accepts this reference.
    #[error("no registered resolver accepts reference {0}")]
    UnknownType(EntryReference),

    /// No registered resolver handles entries of this Rust type.
    #[error("no registered resolver handles entries of type {0}")]
    NoResolverForEntry(&'static str),

    /// A resolver already claims this reference type or entry type.
    #[error("resolver conflict for '{entry_type}': already claimed by a resolver for {existing}")]
    Conflict { entry_type: String, existing: String },

    /// A resolver declared an empty reference type or one containing the separator.
    #[error("invalid reference type '{0}'")]
    InvalidEntryType(String),

    /// The resolver registered for this reference produces a different entry type.
    #[error("resolver for '{entry_type}' does not produce {requested}")]
    TypeMismatch {
        entry_type: String,
        requested: &'static str,
    },

    /// The reference itself is malformed (empty id or type).
    #[error("invalid entry reference: {0}")]
    InvalidReference(#[from] folio_types::Error),

    /// The resolver accepted the reference but could not produce the entry.
    #[error("failed to resolve {reference}: {message}")]
    Resolution {
        reference: EntryReference,
        message: String,
    },
}

impl ResolverError {
    pub(crate) fn invalid_token(token: &str, reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    /// Convenience for resolver implementations.
    pub fn resolution(reference: &EntryReference, message: impl Into<String>) -> Self {
        Self::Resolution {
            reference: reference.clone(),
            message: message.into(),
        }
    }
}
