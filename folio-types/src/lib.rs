//! Core type definitions for the Folio document core.
//!
//! This crate defines the small, storage-agnostic types shared by every
//! other Folio crate:
//! - Update and account identifiers
//! - [`Account`], the actor attached to every write
//! - [`EntryReference`], the typed `{id, type}` pointer to another entry
//! - [`Registration`], the handle returned by every observer/resolver registry
//! - [`IdFactory`], the pluggable source of new record ids
//!
//! Entity-specific storage types belong to the modules that persist them.

mod account;
mod ids;
mod reference;
mod registration;

pub use account::Account;
pub use ids::{AccountId, IdFactory, SequentialIdFactory, UpdateId, UuidIdFactory};
pub use reference::EntryReference;
pub use registration::Registration;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid entry reference: {0}")]
    InvalidReference(String),
}
