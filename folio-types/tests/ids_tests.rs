use folio_types::{AccountId, IdFactory, SequentialIdFactory, UpdateId, UuidIdFactory};
use std::collections::HashSet;

// ── UpdateId ──────────────────────────────────────────────────────

#[test]
fn update_ids_are_unique() {
    let ids: HashSet<UpdateId> = (0..100).map(|_| UpdateId::now()).collect();
    assert_eq!(ids.len(), 100);
}

#[test]
fn update_ids_are_time_ordered() {
    let first = UpdateId::now();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = UpdateId::now();
    assert!(first < second);
}

#[test]
fn update_id_displays_as_uuid() {
    let id = UpdateId::now();
    let uuid = uuid::Uuid::parse_str(&id.to_string()).unwrap();
    assert_eq!(uuid.get_version_num(), 7);
}

#[test]
fn update_id_serializes_as_plain_string() {
    let id = UpdateId::now();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
}

// ── AccountId ─────────────────────────────────────────────────────

#[test]
fn account_id_survives_serde() {
    let id = AccountId::random();
    let json = serde_json::to_string(&id).unwrap();
    let back: AccountId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
    assert_ne!(AccountId::random(), id);
}

// ── IdFactory ─────────────────────────────────────────────────────

#[test]
fn uuid_factory_produces_parseable_unique_ids() {
    let factory = UuidIdFactory;
    let ids: HashSet<String> = (0..100).map(|_| factory.next_id()).collect();
    assert_eq!(ids.len(), 100);
    for id in &ids {
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }
}

#[test]
fn sequential_factory_counts_up() {
    let factory = SequentialIdFactory::new("w");
    assert_eq!(factory.next_id(), "w1");
    assert_eq!(factory.next_id(), "w2");
    assert_eq!(factory.next_id(), "w3");
}

#[test]
fn sequential_factory_custom_start() {
    let factory = SequentialIdFactory::starting_at("node-", 10);
    assert_eq!(factory.next_id(), "node-10");
}

#[test]
fn factories_are_object_safe() {
    let factories: Vec<Box<dyn IdFactory>> =
        vec![Box::new(UuidIdFactory), Box::new(SequentialIdFactory::new("x"))];
    for f in &factories {
        assert!(!f.next_id().is_empty());
    }
}
