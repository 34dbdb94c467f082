use async_trait::async_trait;
use folio_resolver::{EntryResolver, ResolverError, ResolverRegistry, ResolverResult};
use folio_types::{Account, EntryReference};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq)]
struct Work {
    id: String,
    title: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Person {
    id: String,
    name: String,
}

struct WorkResolver {
    works: HashMap<String, Work>,
    consulted: Arc<AtomicUsize>,
}

impl WorkResolver {
    fn new() -> Self {
        let mut works = HashMap::new();
        works.insert(
            "w1".to_string(),
            Work {
                id: "w1".into(),
                title: "Hume Essays".into(),
            },
        );
        Self {
            works,
            consulted: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl EntryResolver for WorkResolver {
    type Entry = Work;

    fn entry_type(&self) -> &str {
        "work"
    }

    fn accepts(&self, reference: &EntryReference) -> bool {
        self.consulted.fetch_add(1, Ordering::SeqCst);
        reference.entry_type == "work"
    }

    async fn resolve(
        &self,
        _account: Option<&Account>,
        reference: &EntryReference,
    ) -> ResolverResult<Work> {
        self.works
            .get(&reference.id)
            .cloned()
            .ok_or_else(|| ResolverError::resolution(reference, "no such work"))
    }

    fn make_reference(&self, entry: &Work) -> EntryReference {
        EntryReference::new(&entry.id, "work")
    }
}

struct PersonResolver;

#[async_trait]
impl EntryResolver for PersonResolver {
    type Entry = Person;

    fn entry_type(&self) -> &str {
        "person"
    }

    fn accepts(&self, reference: &EntryReference) -> bool {
        reference.entry_type == "person" && reference.id.starts_with('p')
    }

    async fn resolve(
        &self,
        _account: Option<&Account>,
        reference: &EntryReference,
    ) -> ResolverResult<Person> {
        Ok(Person {
            id: reference.id.clone(),
            name: format!("Person {}", reference.id),
        })
    }

    fn make_reference(&self, entry: &Person) -> EntryReference {
        EntryReference::new(&entry.id, "person")
    }
}

/// Claims "work" again with a different entry type.
struct ShadowWorkResolver;

#[async_trait]
impl EntryResolver for ShadowWorkResolver {
    type Entry = String;

    fn entry_type(&self) -> &str {
        "work"
    }

    async fn resolve(
        &self,
        _account: Option<&Account>,
        reference: &EntryReference,
    ) -> ResolverResult<String> {
        Ok(reference.id.clone())
    }

    fn make_reference(&self, entry: &String) -> EntryReference {
        EntryReference::new(entry, "work")
    }
}

/// Claims a new reference type but the same entry type as `WorkResolver`.
struct EditionResolver;

#[async_trait]
impl EntryResolver for EditionResolver {
    type Entry = Work;

    fn entry_type(&self) -> &str {
        "edition"
    }

    async fn resolve(
        &self,
        _account: Option<&Account>,
        reference: &EntryReference,
    ) -> ResolverResult<Work> {
        Err(ResolverError::resolution(reference, "unsupported"))
    }

    fn make_reference(&self, entry: &Work) -> EntryReference {
        EntryReference::new(&entry.id, "edition")
    }
}

fn registry() -> ResolverRegistry {
    let registry = ResolverRegistry::new();
    registry.register(WorkResolver::new()).unwrap();
    registry.register(PersonResolver).unwrap();
    registry
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn registered_types_are_listed() {
    let registry = registry();
    assert_eq!(registry.entry_types(), vec!["person".to_string(), "work".to_string()]);
    assert!(registry.is_registered("work"));
    assert!(!registry.is_registered("note"));
}

#[test]
fn duplicate_reference_type_is_rejected() {
    let registry = registry();
    let err = registry.register(ShadowWorkResolver).unwrap_err();
    assert!(matches!(err, ResolverError::Conflict { ref entry_type, .. } if entry_type == "work"));
}

#[test]
fn duplicate_entry_type_is_rejected() {
    let registry = registry();
    let err = registry.register(EditionResolver).unwrap_err();
    assert!(matches!(err, ResolverError::Conflict { .. }));
    assert!(!registry.is_registered("edition"));
}

#[test]
fn unregister_frees_the_type() {
    let registry = ResolverRegistry::new();
    let reg = registry.register(WorkResolver::new()).unwrap();
    assert!(registry.is_registered("work"));

    reg.unregister();
    assert!(!registry.is_registered("work"));
    assert!(registry.make_reference(&Work { id: "w1".into(), title: String::new() }).is_err());

    // The slot can be claimed again, now by a different entry type.
    registry.register(ShadowWorkResolver).unwrap();
    assert!(registry.is_registered("work"));
}

#[test]
fn clones_share_state() {
    let registry = ResolverRegistry::new();
    let clone = registry.clone();
    registry.register(PersonResolver).unwrap();
    assert!(clone.is_registered("person"));
}

// ── Resolution ───────────────────────────────────────────────────

#[tokio::test]
async fn resolve_dispatches_to_typed_resolver() {
    let registry = registry();
    let work: Work = registry
        .resolve(None, &EntryReference::new("w1", "work"))
        .await
        .unwrap();
    assert_eq!(work.title, "Hume Essays");
}

#[tokio::test]
async fn resolve_with_wrong_entry_type_is_mismatch() {
    let registry = registry();
    let err = registry
        .resolve::<Person>(None, &EntryReference::new("w1", "work"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolverError::TypeMismatch { .. }));
}

#[tokio::test]
async fn resolve_unknown_type_fails() {
    let registry = registry();
    let err = registry
        .resolve::<Work>(None, &EntryReference::new("n1", "note"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolverError::UnknownType(_)));
}

#[tokio::test]
async fn resolver_errors_propagate() {
    let registry = registry();
    let err = registry
        .resolve::<Work>(None, &EntryReference::new("missing", "work"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolverError::Resolution { .. }));
}

#[test]
fn make_reference_uses_entry_type() {
    let registry = registry();
    let person = Person {
        id: "p7".into(),
        name: "Hume".into(),
    };
    assert_eq!(
        registry.make_reference(&person).unwrap(),
        EntryReference::new("p7", "person")
    );
}

#[test]
fn make_reference_for_unregistered_entry_fails() {
    let registry = registry();
    let err = registry.make_reference(&42_u32).unwrap_err();
    assert!(matches!(err, ResolverError::NoResolverForEntry(_)));
}

#[test]
fn custom_accepts_filters_ids() {
    let registry = registry();
    assert!(registry.accepts(&EntryReference::new("p1", "person")));
    assert!(!registry.accepts(&EntryReference::new("x1", "person")));
}

// ── Tokens ───────────────────────────────────────────────────────

#[test]
fn tokenize_and_decode_round_trip() {
    let registry = registry();
    let reference = EntryReference::new("w1", "work");
    let token = registry.tokenize(&reference).unwrap();
    assert_eq!(registry.decode_token(&token).unwrap(), reference);
}

#[test]
fn tokenize_rejects_separator_before_consulting_resolvers() {
    let registry = ResolverRegistry::new();
    let resolver = WorkResolver::new();
    let consulted = resolver.consulted.clone();
    registry.register(resolver).unwrap();

    let err = registry
        .tokenize(&EntryReference::new("a::b", "work"))
        .unwrap_err();
    assert!(matches!(err, ResolverError::ReservedSeparator { .. }));
    assert_eq!(consulted.load(Ordering::SeqCst), 0);
}

#[test]
fn tokenize_unregistered_type_fails() {
    let registry = registry();
    let err = registry.tokenize(&EntryReference::new("n1", "note")).unwrap_err();
    assert!(matches!(err, ResolverError::UnknownType(_)));
}

#[test]
fn tokenize_rejected_by_accepts_fails() {
    let registry = registry();
    let err = registry.tokenize(&EntryReference::new("x1", "person")).unwrap_err();
    assert!(matches!(err, ResolverError::UnknownType(_)));
}

#[test]
fn decode_malformed_token_fails() {
    let registry = registry();
    for token in ["", "***", "not base64!"] {
        assert!(matches!(
            registry.decode_token(token),
            Err(ResolverError::InvalidToken { .. })
        ));
    }
}

#[test]
fn decode_token_for_unregistered_type_fails() {
    let registry = registry();
    let token = folio_resolver::encode_key(&EntryReference::new("n1", "note")).unwrap();
    assert!(matches!(
        registry.decode_token(&token),
        Err(ResolverError::UnknownType(_))
    ));
}

#[test]
fn tokenize_rejects_trailing_colon() {
    let registry = registry();
    let err = registry
        .tokenize(&EntryReference::new("urn:isbn:", "work"))
        .unwrap_err();
    assert!(matches!(err, ResolverError::ReservedSeparator { .. }));

    let reference = EntryReference::new("urn:isbn:0140", "work");
    let token = registry.tokenize(&reference).unwrap();
    assert_eq!(registry.decode_token(&token).unwrap(), reference);
}

proptest! {
    #[test]
    fn token_round_trip_law(id in any::<String>()) {
        let registry = ResolverRegistry::new();
        registry.register(WorkResolver::new()).unwrap();
        let reference = EntryReference::new(id, "work");

        let token = match registry.tokenize(&reference) {
            Ok(token) => token,
            Err(ResolverError::ReservedSeparator { .. } | ResolverError::InvalidReference(_)) => {
                return Ok(());
            }
            Err(other) => return Err(TestCaseError::fail(format!("unexpected {other}"))),
        };
        prop_assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        prop_assert_eq!(registry.decode_token(&token).unwrap(), reference);
    }

    #[test]
    fn token_round_trip_for_colon_heavy_ids(id in "[a-z:]{1,12}") {
        let registry = ResolverRegistry::new();
        registry.register(WorkResolver::new()).unwrap();
        let reference = EntryReference::new(id.clone(), "work");
        prop_assume!(!id.contains("::") && !id.ends_with(':'));

        let token = registry.tokenize(&reference).unwrap();
        prop_assert_eq!(registry.decode_token(&token).unwrap(), reference);
    }
}
