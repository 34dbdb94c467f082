//! Type-keyed resolver registry.

use crate::token::{check_reserved, decode_key, encode_key, TOKEN_SEPARATOR};
use crate::{EntryResolver, ResolverError, ResolverResult};
use folio_types::{Account, EntryReference, Registration};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::{debug, info};
use uuid::Uuid;

/// Object-safe view over a typed resolver.
trait ErasedResolver: Send + Sync {
    fn accepts(&self, reference: &EntryReference) -> bool;
    fn as_any(&self) -> &dyn Any;
}

struct Typed<T: Send + Sync + 'static>(Arc<dyn EntryResolver<Entry = T>>);

impl<T: Send + Sync + 'static> ErasedResolver for Typed<T> {
    fn accepts(&self, reference: &EntryReference) -> bool {
        self.0.accepts(reference)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Slot {
    registration: Uuid,
    entry_type_id: TypeId,
    entry_type_name: &'static str,
    resolver: Arc<dyn ErasedResolver>,
}

#[derive(Default)]
struct Inner {
    /// Reference type → resolver.
    by_type: HashMap<String, Slot>,
    /// Rust entry type → reference type.
    by_entry: HashMap<TypeId, String>,
}

/// Registry of [`EntryResolver`]s keyed by reference type and entry type.
///
/// At most one resolver may claim a given reference type, and at most one a
/// given Rust entry type; overlapping registrations are rejected, so lookups
/// never have to pick between candidates.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resolver`. The returned handle removes it again.
    pub fn register<R: EntryResolver>(&self, resolver: R) -> ResolverResult<Registration> {
        let entry_type = resolver.entry_type().to_string();
        if entry_type.trim().is_empty() || entry_type.contains(TOKEN_SEPARATOR) {
            return Err(ResolverError::InvalidEntryType(entry_type));
        }

        let entry_type_id = TypeId::of::<R::Entry>();
        let entry_type_name = type_name::<R::Entry>();
        let registration = Uuid::new_v4();

        {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = inner.by_type.get(&entry_type) {
                return Err(ResolverError::Conflict {
                    entry_type,
                    existing: existing.entry_type_name.to_string(),
                });
            }
            if let Some(existing) = inner.by_entry.get(&entry_type_id) {
                return Err(ResolverError::Conflict {
                    entry_type: entry_type_name.to_string(),
                    existing: format!("reference type '{existing}'"),
                });
            }

            let typed: Arc<dyn EntryResolver<Entry = R::Entry>> = Arc::new(resolver);
            inner.by_entry.insert(entry_type_id, entry_type.clone());
            inner.by_type.insert(
                entry_type.clone(),
                Slot {
                    registration,
                    entry_type_id,
                    entry_type_name,
                    resolver: Arc::new(Typed(typed)),
                },
            );
        }
        info!(entry_type = %entry_type, entry = entry_type_name, "Registered entry resolver");

        let weak: Weak<RwLock<Inner>> = Arc::downgrade(&self.inner);
        Ok(Registration::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            let mut inner = inner.write().unwrap_or_else(PoisonError::into_inner);
            let matches = inner
                .by_type
                .get(&entry_type)
                .is_some_and(|slot| slot.registration == registration);
            if matches {
                if let Some(slot) = inner.by_type.remove(&entry_type) {
                    inner.by_entry.remove(&slot.entry_type_id);
                }
                debug!(entry_type = %entry_type, "Unregistered entry resolver");
            }
        }))
    }

    /// Whether a resolver claims `entry_type`.
    pub fn is_registered(&self, entry_type: &str) -> bool {
        self.read().by_type.contains_key(entry_type)
    }

    /// All claimed reference types, sorted.
    pub fn entry_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.read().by_type.keys().cloned().collect();
        types.sort();
        types
    }

    /// Whether some registered resolver accepts `reference`.
    pub fn accepts(&self, reference: &EntryReference) -> bool {
        self.read()
            .by_type
            .get(&reference.entry_type)
            .is_some_and(|slot| slot.resolver.accepts(reference))
    }

    /// Returns the resolver for `reference`, typed to its entry.
    pub fn resolver_for<T: Send + Sync + 'static>(
        &self,
        reference: &EntryReference,
    ) -> ResolverResult<Arc<dyn EntryResolver<Entry = T>>> {
        let resolver = self.accepting(reference)?;
        resolver
            .as_any()
            .downcast_ref::<Typed<T>>()
            .map(|typed| typed.0.clone())
            .ok_or_else(|| ResolverError::TypeMismatch {
                entry_type: reference.entry_type.clone(),
                requested: type_name::<T>(),
            })
    }

    /// Returns the resolver that handles entries of type `T`.
    pub fn resolver_for_entry<T: Send + Sync + 'static>(
        &self,
    ) -> ResolverResult<Arc<dyn EntryResolver<Entry = T>>> {
        let inner = self.read();
        let entry_type = inner
            .by_entry
            .get(&TypeId::of::<T>())
            .ok_or(ResolverError::NoResolverForEntry(type_name::<T>()))?;
        inner
            .by_type
            .get(entry_type)
            .and_then(|slot| slot.resolver.as_any().downcast_ref::<Typed<T>>())
            .map(|typed| typed.0.clone())
            .ok_or(ResolverError::NoResolverForEntry(type_name::<T>()))
    }

    /// Resolves `reference` to its entry.
    pub async fn resolve<T: Send + Sync + 'static>(
        &self,
        account: Option<&Account>,
        reference: &EntryReference,
    ) -> ResolverResult<T> {
        let resolver = self.resolver_for::<T>(reference)?;
        resolver.resolve(account, reference).await
    }

    /// Builds the canonical reference for `entry`.
    pub fn make_reference<T: Send + Sync + 'static>(
        &self,
        entry: &T,
    ) -> ResolverResult<EntryReference> {
        let resolver = self.resolver_for_entry::<T>()?;
        Ok(resolver.make_reference(entry))
    }

    /// Encodes `reference` as an opaque token.
    ///
    /// Ids containing `"::"` or ending in `':'` are rejected before any
    /// resolver is consulted.
    pub fn tokenize(&self, reference: &EntryReference) -> ResolverResult<String> {
        check_reserved(&reference.id)?;
        self.accepting(reference)?;
        encode_key(reference)
    }

    /// Decodes a token produced by [`tokenize`](Self::tokenize).
    pub fn decode_token(&self, token: &str) -> ResolverResult<EntryReference> {
        let reference = decode_key(token)?;
        self.accepting(&reference)?;
        Ok(reference)
    }

    fn accepting(&self, reference: &EntryReference) -> ResolverResult<Arc<dyn ErasedResolver>> {
        self.read()
            .by_type
            .get(&reference.entry_type)
            .filter(|slot| slot.resolver.accepts(reference))
            .map(|slot| slot.resolver.clone())
            .ok_or_else(|| ResolverError::UnknownType(reference.clone()))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("entry_types", &self.entry_types())
            .finish()
    }
}
