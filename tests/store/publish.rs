//! Publication paths: fresh, update, unchanged fast path, untyped, clear.

use crate::common::*;
use quarry::prelude::*;

// ============================================================================
// Fresh parses
// ============================================================================

#[test]
fn fresh_parse_dirties_haste_and_file_modules() {
    let quarry = test_store();
    let key = src("a.js");

    let txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.parse_mutator(&txn);
    let dirty = mutator.add_parsed(&key, &parsed(1, Some("A"))).unwrap();
    txn.commit();

    assert_eq!(dirty.len(), 2);
    assert!(dirty.contains(&haste("A")));
    assert!(dirty.contains(&file_module("a.js")));

    let reader = quarry.committed();
    assert_eq!(reader.get_provider(&haste("A")), Some(key.clone()));
    assert_eq!(reader.get_provider(&file_module("a.js")), Some(key.clone()));
    assert_eq!(reader.get_file_hash(&key), Some(1));
}

#[test]
fn fresh_parse_without_haste_dirties_only_file_module() {
    let quarry = test_store();
    let key = src("plain.js");

    let txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.parse_mutator(&txn);
    let dirty = mutator.add_parsed(&key, &parsed(3, None)).unwrap();
    // During fresh parsing a missing file is a no-op.
    assert!(mutator.clear_not_found(&src("never-there.js")).is_empty());
    txn.commit();

    assert_eq!(dirty.len(), 1);
    assert!(dirty.contains(&file_module("plain.js")));
}

#[test]
fn lib_file_has_no_file_module() {
    let quarry = test_store();
    let key = lib("flow.js");

    let txn = quarry.begin_transaction().unwrap();
    let dirty = quarry.parse_mutator(&txn).add_parsed(&key, &parsed(1, Some("Flow"))).unwrap();
    txn.commit();

    assert_eq!(dirty.len(), 1);
    assert!(dirty.contains(&haste("Flow")));
    assert_eq!(quarry.metrics().file_modules, 0);

    let reader = quarry.committed();
    assert_eq!(
        reader.get_provider_unsafe(&ModuleName::File(key.clone())),
        Err(LookupError::FileModuleNotFound(key.clone()))
    );
    assert_eq!(reader.get_provider(&haste("Flow")), Some(key));
}

#[test]
#[should_panic(expected = "builtins cannot be stored")]
fn storing_builtins_is_fatal() {
    let quarry = test_store();
    let txn = quarry.begin_transaction().unwrap();
    let _ = quarry.parse_mutator(&txn).add_parsed(&FileKey::Builtins, &parsed(1, None));
}

// ============================================================================
// Unchanged-hash fast path
// ============================================================================

#[test]
fn unchanged_hash_reuses_parse_and_allocates_nothing() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let reader = quarry.committed();
    let first_parse = reader.get_parse(&key).unwrap();
    let before = quarry.metrics();

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);
    let dirty = mutator.add_parsed(&key, &parsed(1, Some("A"))).unwrap();
    txn.commit();

    // The content-unchanged file is still dirty for rechecking purposes.
    assert_eq!(dirty.len(), 2);
    assert!(dirty.contains(&haste("A")));
    assert!(dirty.contains(&file_module("a.js")));

    // Same parse handle, zero heap growth.
    let after = quarry.metrics();
    assert_eq!(reader.get_parse(&key).unwrap(), first_parse);
    assert_eq!(after.parses, before.parses);
    assert_eq!(after.heap_used_bytes, before.heap_used_bytes);
}

#[test]
fn changed_hash_allocates_a_new_parse() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let reader = quarry.committed();
    let first_parse = reader.get_parse(&key).unwrap();
    let before = quarry.metrics();

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);
    mutator.add_parsed(&key, &parsed(2, Some("A"))).unwrap();
    txn.commit();

    let after = quarry.metrics();
    assert_ne!(reader.get_parse(&key).unwrap(), first_parse);
    assert_eq!(after.parses, before.parses + 1);
    // The file record itself is stable across reparses.
    assert_eq!(after.files, before.files);
    assert_eq!(reader.get_file_hash(&key), Some(2));
}

#[test]
fn untyped_parse_does_not_take_the_fast_path() {
    let quarry = test_store();
    let key = src("a.js");

    let txn = quarry.begin_transaction().unwrap();
    quarry.parse_mutator(&txn).add_unparsed(&key, 1, None).unwrap();
    txn.commit();

    let before = quarry.metrics();

    // Same hash, but the existing parse is untyped: publish a typed one.
    let mut txn = quarry.begin_transaction().unwrap();
    quarry.reparse_mutator(&mut txn, [key.clone()]).add_parsed(&key, &parsed(1, None)).unwrap();
    txn.commit();

    assert_eq!(quarry.metrics().parses, before.parses + 1);
    assert!(quarry.committed().is_typed_file(&key));
}

// ============================================================================
// Untyped parses
// ============================================================================

#[test]
fn unparsed_file_has_hash_but_no_artifacts() {
    let quarry = test_store();
    let key = src("unsupported.js");

    let txn = quarry.begin_transaction().unwrap();
    let dirty = quarry.parse_mutator(&txn).add_unparsed(&key, 7, Some("U")).unwrap();
    txn.commit();

    assert!(dirty.contains(&haste("U")));
    assert!(dirty.contains(&file_module("unsupported.js")));

    let reader = quarry.committed();
    assert_eq!(reader.get_file_hash(&key), Some(7));
    assert!(reader.get_parse(&key).is_some());
    assert!(reader.get_typed_parse(&key).is_none());
    assert!(!reader.is_typed_file(&key));
    assert!(!reader.has_ast(&key));
    assert_eq!(reader.get_exports(&key), None);
    assert_eq!(reader.get_ast(&key), None);
}

// ============================================================================
// Clearing
// ============================================================================

#[test]
fn clear_dirties_both_modules_and_is_idempotent() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);

    let dirty = mutator.record_not_found(&key);
    assert_eq!(dirty.len(), 2);
    assert!(dirty.contains(&haste("A")));
    assert!(dirty.contains(&file_module("a.js")));

    // The second clear sees no latest parse and reports nothing.
    let dirty = mutator.record_not_found(&key);
    assert!(dirty.is_empty());
    txn.commit();
}

// ============================================================================
// Heap exhaustion
// ============================================================================

#[test]
fn out_of_space_writes_nothing() {
    let quarry = Quarry::builder().heap_capacity(64).build();
    let key = src("a.js");

    let txn = quarry.begin_transaction().unwrap();
    let err = quarry.parse_mutator(&txn).add_parsed(&key, &parsed(1, Some("A"))).unwrap_err();
    txn.rollback();

    assert!(matches!(err, HeapError::OutOfSpace { .. }));
    let metrics = quarry.metrics();
    assert_eq!(metrics.files, 0);
    assert_eq!(metrics.parses, 0);
    assert_eq!(quarry.committed().get_parse(&key), None);
}
