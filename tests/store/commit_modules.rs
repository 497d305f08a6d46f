//! The module-commit stage: provider confirmation and module deletion.

use crate::common::*;
use quarry::prelude::*;

#[test]
fn empty_modules_are_dropped_at_commit() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let reparse = quarry.reparse_mutator(&mut txn, [key.clone()]);
    reparse.record_not_found(&key);

    // Selection finds no live providers left for either module.
    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), Vec::<FileKey>::new());
    let commit_modules = quarry.commit_modules_mutator(&mut txn);
    commit_modules.record_no_providers(haste("A"));
    commit_modules.record_no_providers(file_module("a.js"));
    txn.commit();

    let reader = quarry.committed();
    assert_eq!(
        reader.get_provider_unsafe(&haste("A")),
        Err(LookupError::HasteModuleNotFound("A".into()))
    );
    assert_eq!(
        reader.get_provider_unsafe(&file_module("a.js")),
        Err(LookupError::FileModuleNotFound(key))
    );
}

#[test]
fn rollback_keeps_the_tables_untouched() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let commit_modules = quarry.commit_modules_mutator(&mut txn);
    commit_modules.record_no_providers(haste("A"));
    txn.rollback();

    // The pending deletion set was discarded; the module is still there.
    assert_eq!(quarry.committed().get_provider(&haste("A")), Some(key));
}

#[test]
fn set_provider_overrides_the_election() {
    let quarry = test_store();
    publish_one(&quarry, &src("a.js"), 1, Some("A"));
    publish_one(&quarry, &src("b.js"), 2, Some("A"));
    assert_eq!(quarry.committed().get_provider(&haste("A")), Some(src("a.js")));

    let mut txn = quarry.begin_transaction().unwrap();
    let commit_modules = quarry.commit_modules_mutator(&mut txn);
    commit_modules.set_provider(&haste("A"), Some(&src("b.js"))).unwrap();

    // Visible to the latest view immediately, committed only after commit.
    assert_eq!(quarry.latest().get_provider(&haste("A")), Some(src("b.js")));
    assert_eq!(quarry.committed().get_provider(&haste("A")), Some(src("a.js")));
    txn.commit();
    assert_eq!(quarry.committed().get_provider(&haste("A")), Some(src("b.js")));
}

#[test]
fn set_provider_rolls_back_with_the_transaction() {
    let quarry = test_store();
    publish_one(&quarry, &src("a.js"), 1, Some("A"));
    publish_one(&quarry, &src("b.js"), 2, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let commit_modules = quarry.commit_modules_mutator(&mut txn);
    commit_modules.set_provider(&haste("A"), Some(&src("b.js"))).unwrap();
    txn.rollback();

    assert_eq!(quarry.committed().get_provider(&haste("A")), Some(src("a.js")));
    assert_eq!(quarry.latest().get_provider(&haste("A")), Some(src("a.js")));
}

#[test]
fn set_provider_rejects_unknown_targets() {
    let quarry = test_store();
    publish_one(&quarry, &src("a.js"), 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    let commit_modules = quarry.commit_modules_mutator(&mut txn);
    assert_eq!(
        commit_modules.set_provider(&haste("Nope"), Some(&src("a.js"))),
        Err(LookupError::HasteModuleNotFound("Nope".into()))
    );
    assert_eq!(
        commit_modules.set_provider(&haste("A"), Some(&src("nope.js"))),
        Err(LookupError::FileNotFound(src("nope.js")))
    );
    txn.rollback();
}

#[test]
fn deleted_module_can_be_recreated_later() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    quarry.reparse_mutator(&mut txn, [key.clone()]).record_not_found(&key);
    let commit_modules = quarry.commit_modules_mutator(&mut txn);
    commit_modules.record_no_providers(haste("A"));
    commit_modules.record_no_providers(file_module("a.js"));
    txn.commit();

    // A later parse brings the name back with a fresh record.
    publish_one(&quarry, &src("b.js"), 2, Some("A"));
    let reader = quarry.committed();
    assert_eq!(reader.get_provider(&haste("A")), Some(src("b.js")));
    assert_eq!(quarry.all_providers(&haste("A")).unwrap(), vec![src("b.js")]);
}
