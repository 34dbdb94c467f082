//! Entry reference resolution for Folio.
//!
//! Entries refer to each other through [`EntryReference`]s (`{id, type}`).
//! A [`ResolverRegistry`] maps each reference type to exactly one
//! [`EntryResolver`], which knows how to fetch the referenced entry and how
//! to build a reference back from an entry instance.
//!
//! References also have an opaque, URL-safe token form:
//! base64 of `"<id>::<type>"`. See [`ResolverRegistry::tokenize`] and
//! [`ResolverRegistry::decode_token`].
//!
//! [`EntryReference`]: folio_types::EntryReference

mod error;
mod registry;
mod resolver;
mod token;

pub use error::{ResolverError, ResolverResult};
pub use registry::ResolverRegistry;
pub use resolver::EntryResolver;
pub use token::{decode_key, encode_key, TOKEN_SEPARATOR};
