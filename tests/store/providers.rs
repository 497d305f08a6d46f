//! Provider lists and elections.

use crate::common::*;
use quarry::prelude::*;

// ============================================================================
// Registration and election
// ============================================================================

#[test]
fn first_provider_is_elected() {
    let quarry = test_store();
    publish_one(&quarry, &src("a.js"), 1, Some("A"));

    let reader = quarry.committed();
    assert_eq!(reader.get_provider(&haste("A")), Some(src("a.js")));
}

#[test]
fn two_providers_accumulate_one_is_chosen() {
    let quarry = test_store();

    let txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.parse_mutator(&txn);
    mutator.add_parsed(&src("a.js"), &parsed(1, Some("A"))).unwrap();
    mutator.add_parsed(&src("b.js"), &parsed(2, Some("A"))).unwrap();
    txn.commit();

    assert_eq!(
        quarry.all_providers(&haste("A")).unwrap(),
        vec![src("a.js"), src("b.js")]
    );

    // The selection stage confirms a.js.
    let mut txn = quarry.begin_transaction().unwrap();
    let commit_modules = quarry.commit_modules_mutator(&mut txn);
    commit_modules.set_provider(&haste("A"), Some(&src("a.js"))).unwrap();
    txn.commit();

    assert_eq!(quarry.committed().get_provider(&haste("A")), Some(src("a.js")));
}

#[test]
fn election_is_not_stolen_by_later_providers() {
    let quarry = test_store();
    publish_one(&quarry, &src("a.js"), 1, Some("A"));
    publish_one(&quarry, &src("b.js"), 2, Some("A"));

    let reader = quarry.committed();
    assert_eq!(reader.get_provider(&haste("A")), Some(src("a.js")));
    assert_eq!(
        quarry.all_providers(&haste("A")).unwrap(),
        vec![src("a.js"), src("b.js")]
    );
}

// ============================================================================
// Haste rebinding
// ============================================================================

#[test]
fn rename_registers_into_the_new_module_and_dirties_both() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);
    let dirty = mutator.add_parsed(&key, &parsed(2, Some("B"))).unwrap();

    assert!(dirty.contains(&haste("A")));
    assert!(dirty.contains(&haste("B")));
    assert!(dirty.contains(&file_module("a.js")));

    // In flight: the latest view sees the new binding, the committed view
    // the old one.
    let latest = quarry.latest();
    let committed = quarry.committed();
    assert_eq!(latest.get_provider(&haste("B")), Some(key.clone()));
    assert_eq!(committed.get_provider(&haste("B")), None);
    assert_eq!(committed.get_provider(&haste("A")), Some(key.clone()));

    txn.commit();

    assert_eq!(committed.get_provider(&haste("B")), Some(key.clone()));
    // A's list no longer yields the file once traversed.
    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), Vec::<FileKey>::new());
    assert_eq!(quarry.all_providers(&haste("B")).unwrap(), vec![key]);
}

#[test]
fn same_haste_reparse_keeps_the_provider_node() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    quarry
        .reparse_mutator(&mut txn, [key.clone()])
        .add_parsed(&key, &parsed(2, Some("A")))
        .unwrap();
    txn.commit();

    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), vec![key.clone()]);
    assert_eq!(quarry.committed().get_provider(&haste("A")), Some(key));
}

// ============================================================================
// Deferred deletion
// ============================================================================

#[test]
fn cleared_files_are_collected_at_traversal() {
    let quarry = test_store();
    publish_one(&quarry, &src("a.js"), 1, Some("A"));
    publish_one(&quarry, &src("b.js"), 2, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [src("a.js")]);
    mutator.record_not_found(&src("a.js"));

    // The clear did not unlink; the traversal does.
    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), vec![src("b.js")]);
    txn.commit();

    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), vec![src("b.js")]);
}

#[test]
fn unknown_module_has_no_providers() {
    let quarry = Quarry::new();
    assert_eq!(
        quarry.all_providers(&haste("Nope")),
        Err(quarry::Error::Lookup(LookupError::HasteModuleNotFound("Nope".into())))
    );
}
