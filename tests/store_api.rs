//! End-to-end tests through the public `Store` API.
//!
//! Every operation here goes through the lock-bracketed surface; the
//! engine-level behavior is covered by the engine crate's own tests.

use serde_json::{json, Value};
use spandb::{Config, Error, Store};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn setup() -> (Store, TempDir) {
    let dir = TempDir::new().unwrap();
    (Store::new(Config::new(dir.path()).compact()), dir)
}

#[test]
fn test_create_read_write_delete_cycle() {
    let (store, _dir) = setup();

    assert!(!store.exists("users").unwrap());
    store.create("users", &json!({"alice": 1})).unwrap();
    assert!(store.exists("users").unwrap());
    assert_eq!(store.read("users").unwrap(), json!({"alice": 1}));

    store.write("users", &json!({"alice": 2})).unwrap();
    assert_eq!(store.read("users").unwrap(), json!({"alice": 2}));

    store.delete("users").unwrap();
    assert!(!store.exists("users").unwrap());
    // Idempotent delete.
    store.delete("users").unwrap();
}

#[test]
fn test_create_refuses_overwrite() {
    let (store, _dir) = setup();
    store.create("users", &json!({})).unwrap();
    let err = store.create("users", &json!({})).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[test]
fn test_read_missing_database() {
    let (store, _dir) = setup();
    assert!(matches!(
        store.read("ghost").unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        store.read_key("ghost", "k").unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_invalid_names_rejected() {
    let (store, _dir) = setup();
    for name in ["", "../escape", "/abs", "trailing/", "a\\b"] {
        assert!(matches!(
            store.read(name).unwrap_err(),
            Error::InvalidName(_)
        ));
    }
}

#[test]
fn test_partial_read_scenario() {
    let (store, _dir) = setup();
    store
        .create("db", &json!({"a": 1, "b": {"x": [1, 2, 3]}, "c": "text"}))
        .unwrap();

    assert_eq!(store.read_key("db", "b").unwrap(), json!({"x": [1, 2, 3]}));

    let mut session = store.session_key("db", "b").unwrap();
    session.set_value(json!({"x": [9]}));
    session.write().unwrap();

    assert_eq!(
        store.read("db").unwrap(),
        json!({"a": 1, "b": {"x": [9]}, "c": "text"})
    );
}

#[test]
fn test_missing_key_error_and_untouched_index() {
    let (store, dir) = setup();
    store.create("db", &json!({"a": 1})).unwrap();

    let err = store.read_key("db", "missing_key").unwrap_err();
    assert!(matches!(err, Error::KeyNotFound { .. }));

    let index_path = dir.path().join(".ddb").join("db.index");
    if index_path.is_file() {
        let sidecar = fs::read_to_string(index_path).unwrap();
        assert!(!sidecar.contains("missing_key"));
    }
}

#[test]
fn test_exists_key() {
    let (store, _dir) = setup();
    store.create("db", &json!({"a": 1})).unwrap();
    assert!(store.exists_key("db", "a").unwrap());
    assert!(!store.exists_key("db", "zzz").unwrap());
}

#[test]
fn test_exactly_one_representation_after_writes() {
    let (store, dir) = setup();
    store.create("db", &json!({"k": 1})).unwrap();

    let compressed = Store::new(store.config().clone().with_compression(true));
    compressed.write("db", &json!({"k": 2})).unwrap();

    let files: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("db."))
        .collect();
    assert_eq!(files, vec!["db.ddb".to_string()]);

    // Readable through either configuration, partially too.
    assert_eq!(store.read_key("db", "k").unwrap(), json!(2));
    assert_eq!(compressed.read_key("db", "k").unwrap(), json!(2));
}

#[test]
fn test_full_session_read_modify_write() {
    let (store, _dir) = setup();
    store.create("db", &json!({"count": 0})).unwrap();

    let mut session = store.session("db").unwrap();
    session.value_mut()["count"] = json!(1);
    session.write().unwrap();

    assert_eq!(store.read("db").unwrap(), json!({"count": 1}));
}

#[test]
fn test_session_drop_discards_changes() {
    let (store, _dir) = setup();
    store.create("db", &json!({"count": 0})).unwrap();

    {
        let mut session = store.session("db").unwrap();
        session.value_mut()["count"] = json!(99);
        // Dropped without write().
    }
    assert_eq!(store.read("db").unwrap(), json!({"count": 0}));

    // The lock was released by the drop.
    store.write("db", &json!({"count": 5})).unwrap();
}

#[test]
fn test_concurrent_key_sessions_do_not_lose_updates() {
    let (store, _dir) = setup();
    store.create("db", &json!({"counter": 0, "other": "untouched"})).unwrap();

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..5 {
                    let mut session = store.session_key("db", "counter").unwrap();
                    let current = session.value().as_i64().unwrap();
                    session.set_value(json!(current + 1));
                    session.write().unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(store.read_key("db", "counter").unwrap(), json!(20));
    assert_eq!(store.read_key("db", "other").unwrap(), json!("untouched"));
}

#[test]
fn test_no_lock_markers_left_behind() {
    let (store, dir) = setup();
    store.create("db", &json!({"k": 1})).unwrap();
    store.read("db").unwrap();
    store.read_key("db", "k").unwrap();
    let session = store.session_key("db", "k").unwrap();
    session.write().unwrap();

    let locks_dir = dir.path().join(".ddb").join("locks");
    assert_eq!(fs::read_dir(locks_dir).unwrap().count(), 0);
}

#[test]
fn test_typed_read_and_write() {
    let (store, _dir) = setup();
    let mut scores: HashMap<String, i64> = HashMap::new();
    scores.insert("alice".to_string(), 10);
    scores.insert("bob".to_string(), 7);

    store.write_as("scores", &scores).unwrap();
    let loaded: HashMap<String, i64> = store.read_as("scores").unwrap();
    assert_eq!(loaded, scores);

    assert_eq!(store.read_key("scores", "alice").unwrap(), json!(10));
}

#[test]
fn test_nested_database_names() {
    let (store, _dir) = setup();
    store.create("org/team/users", &json!({"n": 1})).unwrap();
    assert_eq!(store.read("org/team/users").unwrap(), json!({"n": 1}));

    let mut session = store.session_key("org/team/users", "n").unwrap();
    session.set_value(json!(2));
    session.write().unwrap();
    assert_eq!(store.read_key("org/team/users", "n").unwrap(), json!(2));
}

#[test]
fn test_pretty_store_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = Store::new(Config::new(dir.path()));
    store
        .create("db", &json!({"a": {"nested": [1, 2]}, "b": "x"}))
        .unwrap();

    let mut session = store.session_key("db", "a").unwrap();
    session.value_mut()["nested"] = json!([3]);
    session.write().unwrap();

    assert_eq!(
        store.read("db").unwrap(),
        json!({"a": {"nested": [3]}, "b": "x"})
    );

    // The document on disk is still a pretty-printed text file.
    let content = fs::read_to_string(dir.path().join("db.json")).unwrap();
    assert!(content.contains("\n  \"a\""));
}

#[test]
fn test_malformed_document_surfaces_decode_error() {
    let (store, dir) = setup();
    fs::write(dir.path().join("db.json"), b"{\"a\": trailing garbage").unwrap();

    assert!(matches!(
        store.read("db").unwrap_err(),
        Error::Serialization(_)
    ));
}

#[test]
fn test_value_returned_is_exact_replacement() {
    let (store, _dir) = setup();
    store.create("db", &json!({"k": "before", "pad": [1, 2, 3]})).unwrap();

    let replacement = json!({"now": {"a": [true, null]}, "s": "q\"uo\"te"});
    let mut session = store.session_key("db", "k").unwrap();
    session.set_value(replacement.clone());
    session.write().unwrap();

    assert_eq!(store.read_key("db", "k").unwrap(), replacement);
    assert_eq!(store.read_key("db", "pad").unwrap(), json!([1, 2, 3]));
}
