//! Reader flavors, artifact round-trips, and the unsafe error taxonomy.

use crate::common::*;
use quarry::prelude::*;

// ============================================================================
// Artifact round-trips
// ============================================================================

#[test]
fn typed_artifacts_round_trip() {
    let quarry = test_store();
    let key = src("a.js");
    let input = parsed(42, Some("A"));

    let txn = quarry.begin_transaction().unwrap();
    quarry.parse_mutator(&txn).add_parsed(&key, &input).unwrap();
    txn.commit();

    let reader = quarry.committed();
    assert_eq!(reader.get_ast_unsafe(&key).unwrap(), input.ast);
    assert_eq!(reader.get_docblock_unsafe(&key).unwrap(), input.docblock);
    assert_eq!(reader.get_exports_unsafe(&key).unwrap(), input.exports);
    assert_eq!(reader.get_type_sig_unsafe(&key).unwrap(), input.type_sig);
    assert_eq!(reader.get_tolerable_file_sig_unsafe(&key).unwrap(), input.file_sig);
    assert_eq!(reader.get_file_sig_unsafe(&key).unwrap(), input.file_sig.sig);
    assert_eq!(reader.get_requires_unsafe(&key).unwrap(), input.file_sig.sig.requires);
    assert_eq!(reader.get_aloc_table_unsafe(&key).unwrap(), input.locs);
    assert!(reader.is_typed_file(&key));
    assert!(reader.has_ast(&key));
}

#[test]
fn loc_of_aloc_resolves_through_the_table() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, None);

    let reader = quarry.committed();
    assert_eq!(reader.loc_of_aloc(&key, Aloc(1)).unwrap(), Loc { line: 4, column: 12 });
    // A second lookup hits the cached table.
    assert_eq!(reader.loc_of_aloc(&key, Aloc(0)).unwrap(), Loc { line: 1, column: 0 });
    assert_eq!(
        reader.loc_of_aloc(&key, Aloc(99)),
        Err(LookupError::AlocTableNotFound(key))
    );
}

// ============================================================================
// Unsafe error taxonomy
// ============================================================================

#[test]
fn unsafe_reads_name_the_missing_layer() {
    let quarry = test_store();
    let missing = src("missing.js");
    let untyped = src("untyped.js");

    let txn = quarry.begin_transaction().unwrap();
    quarry.parse_mutator(&txn).add_unparsed(&untyped, 1, None).unwrap();
    txn.commit();

    let reader = quarry.committed();
    assert_eq!(
        reader.get_parse_unsafe(&missing),
        Err(LookupError::FileNotFound(missing.clone()))
    );
    assert_eq!(
        reader.get_file_hash_unsafe(&missing),
        Err(LookupError::FileNotFound(missing.clone()))
    );
    assert_eq!(
        reader.get_typed_parse_unsafe(&untyped),
        Err(LookupError::FileNotTyped(untyped.clone()))
    );
    assert_eq!(reader.get_ast_unsafe(&untyped), Err(LookupError::AstNotFound(untyped.clone())));
    assert_eq!(
        reader.get_docblock_unsafe(&untyped),
        Err(LookupError::DocblockNotFound(untyped.clone()))
    );
    assert_eq!(
        reader.get_type_sig_unsafe(&untyped),
        Err(LookupError::TypeSigNotFound(untyped.clone()))
    );
    assert_eq!(
        reader.get_requires_unsafe(&untyped),
        Err(LookupError::RequiresNotFound(untyped.clone()))
    );
    assert_eq!(
        reader.get_aloc_table_unsafe(&untyped),
        Err(LookupError::AlocTableNotFound(untyped.clone()))
    );
    assert_eq!(
        reader.get_provider_unsafe(&haste("Nope")),
        Err(LookupError::HasteModuleNotFound("Nope".into()))
    );

    // The optional forms stay quiet.
    assert_eq!(reader.get_parse(&missing), None);
    assert_eq!(reader.get_ast(&untyped), None);
    assert_eq!(reader.get_provider(&haste("Nope")), None);
}

// ============================================================================
// View selection
// ============================================================================

#[test]
fn mutator_sees_latest_committed_sees_stable() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let mut txn = quarry.begin_transaction().unwrap();
    quarry
        .reparse_mutator(&mut txn, [key.clone()])
        .add_parsed(&key, &parsed(2, Some("A")))
        .unwrap();

    let latest = quarry.latest();
    let committed = quarry.committed();
    assert_eq!(latest.get_file_hash(&key), Some(2));
    assert_eq!(committed.get_file_hash(&key), Some(1));
    assert_eq!(latest.get_ast(&key), Some(Ast(format!("ast:{}", 2u64).into_bytes())));
    assert_eq!(committed.get_ast(&key), Some(Ast(format!("ast:{}", 1u64).into_bytes())));

    txn.commit();
    assert_eq!(committed.get_file_hash(&key), Some(2));
    assert_eq!(committed.get_ast(&key), Some(Ast(format!("ast:{}", 2u64).into_bytes())));
}

#[test]
fn dispatcher_follows_the_transaction() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, None);

    let dispatcher = quarry.dispatcher();
    assert!(!quarry.in_transaction());
    assert_eq!(dispatcher.get_file_hash(&key), Some(1));

    let mut txn = quarry.begin_transaction().unwrap();
    quarry
        .reparse_mutator(&mut txn, [key.clone()])
        .add_parsed(&key, &parsed(2, None))
        .unwrap();

    // Inside the transaction the dispatcher reads the latest view.
    assert!(quarry.in_transaction());
    assert!(quarry.store().in_transaction());
    assert_eq!(dispatcher.get_file_hash(&key), Some(2));
    txn.rollback();
    assert!(!quarry.in_transaction());
    assert_eq!(dispatcher.get_file_hash(&key), Some(1));
}

#[test]
fn committed_reader_is_stable_across_a_rollback() {
    let quarry = test_store();
    let key = src("a.js");
    publish_one(&quarry, &key, 1, Some("A"));

    let committed = quarry.committed();
    let before_ast = committed.get_ast(&key);

    let mut txn = quarry.begin_transaction().unwrap();
    let mutator = quarry.reparse_mutator(&mut txn, [key.clone()]);
    mutator.add_parsed(&key, &parsed(2, Some("B"))).unwrap();
    assert_eq!(committed.get_ast(&key), before_ast);
    txn.rollback();

    assert_eq!(committed.get_ast(&key), before_ast);
    assert_eq!(committed.get_file_hash(&key), Some(1));
}

// ============================================================================
// Saved state
// ============================================================================

#[test]
fn saved_state_is_visible_in_both_views() {
    let quarry = Quarry::ephemeral();
    let key = src("warm.js");
    let input = parsed(11, Some("Warm"));

    quarry.saved_state_loader().load_file(&key, &input).unwrap();

    let committed = quarry.committed();
    let latest = quarry.latest();
    assert_eq!(committed.get_file_hash(&key), Some(11));
    assert_eq!(latest.get_file_hash(&key), Some(11));
    assert_eq!(committed.get_ast_unsafe(&key).unwrap(), input.ast);
    assert_eq!(committed.get_provider(&haste("Warm")), Some(key.clone()));
    assert_eq!(quarry.all_providers(&haste("Warm")).unwrap(), vec![key.clone()]);

    // Loaded state behaves like any committed state under a later reparse.
    let mut txn = quarry.begin_transaction().unwrap();
    quarry
        .reparse_mutator(&mut txn, [key.clone()])
        .add_parsed(&key, &parsed(12, Some("Warm")))
        .unwrap();
    txn.rollback();
    assert_eq!(committed.get_file_hash(&key), Some(11));
}
