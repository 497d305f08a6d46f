//! Rollback: the committed view must come back exactly.

use crate::common::*;
use quarry::prelude::*;

// ============================================================================
// Single-file rollbacks
// ============================================================================

#[test]
fn haste_rename_rolls_back_cleanly() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);
    mutator.add_parsed(&key, &parsed(2, Some("B"))).unwrap();
    assert_eq!(quarry.latest().get_provider(&haste("B")), Some(key.clone()));
    txn.rollback();

    let committed = quarry.committed();
    assert_eq!(committed.get_provider(&haste("A")), Some(key.clone()));
    assert_eq!(committed.get_provider(&haste("B")), None);
    assert_eq!(committed.get_file_hash(&key), Some(1));

    // The latest view agrees again after rollback.
    let latest = quarry.latest();
    assert_eq!(latest.get_provider(&haste("B")), None);
    assert_eq!(latest.get_file_hash(&key), Some(1));

    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), vec![key]);
    assert_eq!(quarry.all_providers(&haste("B")).unwrap(), Vec::<FileKey>::new());
}

#[test]
fn deletion_rolls_back_cleanly() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);
    let dirty = mutator.record_not_found(&key);
    assert!(dirty.contains(&haste("A")));
    assert!(dirty.contains(&file_module("a.js")));

    assert_eq!(quarry.latest().get_parse(&key), None);
    assert_eq!(quarry.committed().get_file_hash(&key), Some(1));
    txn.rollback();

    let committed = quarry.committed();
    assert_eq!(committed.get_file_hash(&key), Some(1));
    assert!(committed.is_typed_file(&key));
    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), vec![key.clone()]);
    assert_eq!(quarry.all_providers(&file_module("a.js")).unwrap(), vec![key]);
}

#[test]
fn deletion_rolls_back_even_after_eager_traversal() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);
    mutator.record_not_found(&key);

    // Traversing mid-transaction physically unlinks the file.
    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), Vec::<FileKey>::new());
    txn.rollback();

    // Rollback re-adds it regardless.
    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), vec![key]);
}

#[test]
fn fresh_file_rolls_back_to_unparsed() {
    let quarry = test_store();
    let key = src("new.js");

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);
    mutator.add_parsed(&key, &parsed(5, Some("New"))).unwrap();
    assert_eq!(quarry.latest().get_file_hash(&key), Some(5));
    txn.rollback();

    let committed = quarry.committed();
    // The file record itself survives; only the parse is gone.
    assert_eq!(committed.get_parse(&key), None);
    assert_eq!(committed.get_parse_unsafe(&key), Err(LookupError::FileNotParsed(key.clone())));
    assert_eq!(quarry.latest().get_parse(&key), None);
    assert_eq!(quarry.all_providers(&haste("New")).unwrap(), Vec::<FileKey>::new());
    assert_eq!(quarry.committed().get_provider(&haste("New")), None);
}

// ============================================================================
// Batch rollbacks
// ============================================================================

#[test]
fn untouched_providers_keep_their_order() {
    let quarry = test_store();
    publish_one(&quarry, &src("a.js"), 1, Some("A"));
    publish_one(&quarry, &src("b.js"), 2, Some("A"));
    publish_one(&quarry, &src("c.js"), 3, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [src("a.js")]);
    mutator.add_parsed(&src("a.js"), &parsed(9, Some("B"))).unwrap();
    txn.rollback();

    // b and c were never touched and keep their relative order; a re-enters
    // at the tail.
    assert_eq!(
        quarry.all_providers(&haste("A")).unwrap(),
        vec![src("b.js"), src("c.js"), src("a.js")]
    );
}

#[test]
fn mixed_batch_rolls_back_file_by_file() {
    let quarry = test_store();
    publish_one(&quarry, &src("a.js"), 1, Some("A"));
    publish_one(&quarry, &src("b.js"), 2, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator =
        quarry.reparse_mutator(&mut txn, [src("a.js"), src("b.js"), src("c.js")]);
    mutator.add_parsed(&src("a.js"), &parsed(8, Some("B"))).unwrap();
    mutator.record_not_found(&src("b.js"));
    mutator.add_parsed(&src("c.js"), &parsed(9, Some("A"))).unwrap();
    txn.rollback();

    let committed = quarry.committed();
    assert_eq!(committed.get_file_hash(&src("a.js")), Some(1));
    assert_eq!(committed.get_file_hash(&src("b.js")), Some(2));
    assert_eq!(committed.get_parse(&src("c.js")), None);

    let mut providers = quarry.all_providers(&haste("A")).unwrap();
    providers.sort_by_key(|k| k.to_string());
    assert_eq!(providers, vec![src("a.js"), src("b.js")]);
    assert_eq!(quarry.all_providers(&haste("B")).unwrap(), Vec::<FileKey>::new());
}

#[test]
fn record_unchanged_files_are_skipped_by_rollback() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);
    mutator.add_parsed(&key, &parsed(1, Some("A"))).unwrap();
    mutator.record_unchanged(&key);
    assert!(mutator.changed_files().is_empty());
    txn.rollback();

    let committed = quarry.committed();
    assert_eq!(committed.get_file_hash(&key), Some(1));
    assert_eq!(committed.get_provider(&haste("A")), Some(key));
}

// ============================================================================
// Not-found bookkeeping across outcomes
// ============================================================================

#[test]
fn not_found_removal_happens_only_at_commit() {
    let quarry = test_store();
    let key = src("gone.js");
    publish_one(&quarry, &key, 1, None);

    // Rolled back: the file record stays.
    let mut txn = quarry.begin_transaction().unwrap();
    quarry.reparse_mutator(&mut txn, [key.clone()]).record_not_found(&key);
    txn.rollback();
    assert_eq!(quarry.committed().get_file_hash(&key), Some(1));

    // Committed: the record is dropped from the file table.
    let mut txn = quarry.begin_transaction().unwrap();
    quarry.reparse_mutator(&mut txn, [key.clone()]).record_not_found(&key);
    txn.commit();
    assert_eq!(
        quarry.committed().get_parse_unsafe(&key),
        Err(LookupError::FileNotFound(key))
    );
}
