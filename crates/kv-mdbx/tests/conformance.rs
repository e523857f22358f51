//! Conformance and dictionary tests for the MDBX backend.

use durable_kv::{
    Database, codable_schema,
    conformance::conformance,
    model::{DbConfig, DuplicateConfig, KvEnv, KvWrite},
};
use durable_kv_mdbx::{MdbxError, test_utils::create_test_rw_db};
use std::sync::Arc;

#[test]
fn shared_backend_conformance() {
    let (_dir, env) = create_test_rw_db();
    conformance(&Arc::new(env));
}

#[test]
fn readers_on_other_threads_see_commits() {
    let (_dir, env) = create_test_rw_db();
    let env = Arc::new(env);
    let config = DbConfig::new().with_duplicates(DuplicateConfig::default());
    let tags = env
        .write(|txn| {
            let db = Database::create(txn, Some("tags"), config, codable_schema::<String, u32>())?;
            db.put(txn, &"apple".to_string(), &3)?;
            db.put(txn, &"apple".to_string(), &1)?;
            Ok::<_, MdbxError>(db)
        })
        .unwrap();

    let shared = Arc::clone(&env);
    let seen = std::thread::spawn(move || {
        shared
            .read(|txn| {
                let dict = tags.dict(txn);
                let pairs: Result<Vec<_>, _> = dict.iter()?.collect();
                Ok((pairs?, dict.len()?))
            })
            .unwrap()
    })
    .join()
    .unwrap();
    assert_eq!(seen.0, vec![("apple".to_string(), 1), ("apple".to_string(), 3)]);
    assert_eq!(seen.1, 2);

    let writer = env.writer().unwrap();
    tags.dict(&writer).set(&"apple".to_string(), None).unwrap();
    writer.commit().unwrap();
    let left = env.read(|txn| tags.dict(txn).len()).unwrap();
    assert_eq!(left, 0);
}
