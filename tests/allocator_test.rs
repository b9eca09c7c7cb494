//! Tests for the ID allocator
//!
//! Covers padding, counter seeding, merge semantics on the counter document
//! and uniqueness under concurrent allocation.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use serde_json::json;
use tempfile::NamedTempFile;

use lead_intake::allocator::{format_id, Namespace};
use lead_intake::database::{init_db, Store, TABLE_COUNTERS};

fn setup_store() -> (Store, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let store = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");
    (store, temp_db)
}

/// Writes a raw counter document, bypassing the allocator
fn put_counter(store: &Store, path: &str, document: serde_json::Value) {
    let write_txn = store.database().begin_write().unwrap();
    {
        let mut table = write_txn.open_table(TABLE_COUNTERS).unwrap();
        table.insert(path, document.to_string().as_str()).unwrap();
    }
    write_txn.commit().unwrap();
}

#[test]
fn test_format_id_pads_without_truncating() {
    assert_eq!(format_id("user", 7), "user007");
    assert_eq!(format_id("enq", 12), "enq012");
    assert_eq!(format_id("lead", 1000), "lead1000");
}

#[test]
fn test_allocate_on_fresh_counter_starts_at_one() {
    let (store, _temp_db) = setup_store();

    assert_eq!(store.allocate("admin/lastUser", "user").unwrap(), "user001");
    assert_eq!(store.allocate("admin/lastUser", "user").unwrap(), "user002");
    assert_eq!(store.counter_value("admin/lastUser").unwrap(), 2);
}

#[test]
fn test_allocate_continues_existing_count() {
    let (store, _temp_db) = setup_store();
    put_counter(&store, "admin/lastEnquiry", json!({ "count": 41 }));

    assert_eq!(store.allocate("admin/lastEnquiry", "enq").unwrap(), "enq042");
}

#[test]
fn test_allocate_past_pad_width() {
    let (store, _temp_db) = setup_store();
    put_counter(&store, "admin/lastLead", json!({ "count": 999 }));

    assert_eq!(store.allocate("admin/lastLead", "lead").unwrap(), "lead1000");
}

#[test]
fn test_allocate_treats_missing_count_field_as_zero() {
    let (store, _temp_db) = setup_store();
    put_counter(&store, "admin/lastUser", json!({ "owner": "crm" }));

    assert_eq!(store.allocate("admin/lastUser", "user").unwrap(), "user001");
}

#[test]
fn test_allocate_merges_into_counter_document() {
    let (store, _temp_db) = setup_store();
    put_counter(&store, "admin/lastUser", json!({ "count": 5, "owner": "crm" }));

    store.allocate("admin/lastUser", "user").unwrap();

    let document = store
        .get_document(TABLE_COUNTERS, "admin/lastUser")
        .unwrap()
        .unwrap();
    assert_eq!(document["count"], 6);
    assert_eq!(document["owner"], "crm");
}

#[test]
fn test_namespaces_are_independent() {
    let (store, _temp_db) = setup_store();

    assert_eq!(store.allocate_in(Namespace::User).unwrap(), "user001");
    assert_eq!(store.allocate_in(Namespace::Lead).unwrap(), "lead001");
    assert_eq!(store.allocate_in(Namespace::Enquiry).unwrap(), "enq001");
    assert_eq!(store.allocate_in(Namespace::Enquiry).unwrap(), "enq002");
    assert_eq!(store.counter_value(Namespace::User.path()).unwrap(), 1);
}

#[test]
fn test_concurrent_allocations_have_no_duplicates_or_gaps() {
    let (store, _temp_db) = setup_store();
    let store = Arc::new(store);

    let threads = 8;
    let per_thread = 5;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                (0..per_thread)
                    .map(|_| store.allocate("admin/lastUser", "user").unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<String> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();

    let total = threads * per_thread;
    let unique: HashSet<String> = ids.iter().cloned().collect();
    let expected: HashSet<String> = (1..=total as u64).map(|n| format_id("user", n)).collect();

    assert_eq!(ids.len(), total);
    assert_eq!(unique, expected);
    assert_eq!(store.counter_value("admin/lastUser").unwrap(), total as u64);
}
