#![allow(dead_code)]

use crate::{
    AbsolutePosition, Database, Precision, RelativePosition, Schema, Target, codable_schema,
    model::{
        DbConfig, DuplicateConfig, KvEnv, KvRead, KvReadError, KvWrite, PutPrecondition,
        SortOrder, StoreError,
    },
};
use durable_codec::{Endianness, IntCoder, StringCoder};

/// Run all conformance tests against a [`KvEnv`] implementation.
///
/// Every test works in its own named database, so the environment must
/// allow at least 20 named databases.
pub fn conformance<E: KvEnv>(env: &E) {
    test_cursor_walk(env);
    test_duplicate_moves(env);
    test_overwrite_guard(env);
    test_value_seek_requires_duplicates(env);
    test_nearby_value_seek(env);
    test_cursor_deletes(env);
    test_dictionary_map(env);
    test_index_end_sentinel(env);
    test_index_steps_by_key(env);
    test_transaction_isolation(env);
    test_write_closure_rolls_back(env);
    test_reopen_database(env);
    test_value_cell(env);
    test_remove_all(env);
    test_reverse_key_order(env);
    test_integer_key_order(env);
}

fn s(value: &str) -> String {
    value.to_string()
}

fn pair(key: &str, value: &str) -> Option<(String, String)> {
    Some((s(key), s(value)))
}

fn dupsort() -> DbConfig {
    DbConfig::new().with_duplicates(DuplicateConfig::default())
}

/// Create a database of `u8` pairs and fill it.
fn bytes_db<E: KvEnv>(
    env: &E,
    name: &str,
    config: DbConfig,
    pairs: &[(u8, u8)],
) -> Database<IntCoder<u8>, IntCoder<u8>> {
    let writer = env.writer().unwrap();
    let db = Database::create(&writer, Some(name), config, codable_schema::<u8, u8>()).unwrap();
    for (key, value) in pairs {
        db.put(&writer, key, value).unwrap();
    }
    writer.commit().unwrap();
    db
}

/// Test absolute, relative and seek moves over a plain database
fn test_cursor_walk<E: KvEnv>(env: &E) {
    let schema = Schema::new(StringCoder, StringCoder);
    {
        let writer = env.writer().unwrap();
        let db = Database::create(&writer, Some("sounds"), DbConfig::new(), schema).unwrap();
        for (key, value) in [("dog", "bark"), ("cat", "meow"), ("pig", "oink"), ("crow", "caw")] {
            db.put(&writer, &s(key), &s(value)).unwrap();
        }
        writer.commit().unwrap();
    }

    let reader = env.reader().unwrap();
    let db = Database::open(&reader, Some("sounds"), schema).unwrap().unwrap();
    let mut cursor = db.cursor(&reader).unwrap();

    assert_eq!(cursor.current().unwrap(), None);
    assert_eq!(cursor.first().unwrap(), pair("cat", "meow"));
    assert_eq!(cursor.step(RelativePosition::Next, None).unwrap(), pair("crow", "caw"));
    assert_eq!(cursor.last().unwrap(), pair("pig", "oink"));
    assert_eq!(cursor.step(RelativePosition::Next, None).unwrap(), None);
    // a failed relative move keeps the position
    assert_eq!(cursor.current().unwrap(), pair("pig", "oink"));

    assert_eq!(cursor.seek(Precision::Nearby, &s("fox"), None).unwrap(), pair("pig", "oink"));
    assert_eq!(cursor.seek(Precision::Exactly, &s("fox"), None).unwrap(), None);
    assert_eq!(cursor.seek(Precision::Nearby, &s("zebra"), None).unwrap(), None);
    assert_eq!(cursor.seek(Precision::Exactly, &s("dog"), None).unwrap(), pair("dog", "bark"));
    assert_eq!(
        cursor.step(RelativePosition::Previous, Some(Target::Key)).unwrap(),
        pair("crow", "caw")
    );
    assert_eq!(cursor.duplicate_count().unwrap(), Some(1));
}

/// Test moves within and across duplicate runs
fn test_duplicate_moves<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "dup_moves", dupsort(), &[(7, 3), (7, 1), (7, 2), (8, 0)]);
    let reader = env.reader().unwrap();
    let mut cursor = db.cursor(&reader).unwrap();

    assert_eq!(cursor.seek(Precision::Exactly, &7, None).unwrap(), Some((7, 1)));
    assert_eq!(cursor.duplicate_count().unwrap(), Some(3));
    assert_eq!(cursor.move_to(AbsolutePosition::Last, Target::Value).unwrap(), Some((7, 3)));
    assert_eq!(cursor.move_to(AbsolutePosition::First, Target::Value).unwrap(), Some((7, 1)));

    let next_value = Some(Target::Value);
    assert_eq!(cursor.step(RelativePosition::Next, next_value).unwrap(), Some((7, 2)));
    assert_eq!(cursor.step(RelativePosition::Next, next_value).unwrap(), Some((7, 3)));
    // value moves never cross into the next key
    assert_eq!(cursor.step(RelativePosition::Next, next_value).unwrap(), None);
    assert_eq!(cursor.current().unwrap(), Some((7, 3)));

    assert_eq!(cursor.step(RelativePosition::Next, Some(Target::Key)).unwrap(), Some((8, 0)));
    assert_eq!(cursor.duplicate_count().unwrap(), Some(1));
    // moving back by key lands on the first duplicate
    assert_eq!(
        cursor.step(RelativePosition::Previous, Some(Target::Key)).unwrap(),
        Some((7, 1))
    );
    assert_eq!(cursor.step(RelativePosition::Previous, None).unwrap(), None);
    assert_eq!(cursor.step(RelativePosition::Next, None).unwrap(), Some((7, 2)));
}

/// Test that a put without overwrite leaves existing entries alone
fn test_overwrite_guard<E: KvEnv>(env: &E) {
    let plain = bytes_db(env, "guard_plain", DbConfig::new(), &[(1, 10)]);
    let dups = bytes_db(env, "guard_dups", dupsort(), &[(1, 10)]);

    let writer = env.writer().unwrap();
    {
        let mut cursor = plain.cursor_mut(&writer).unwrap();
        let err = cursor.put(&1, &20, false).unwrap_err();
        assert!(err.is_key_exists());
        assert_eq!(cursor.seek(Precision::Exactly, &1, None).unwrap(), Some((1, 10)));
        cursor.put(&2, &20, false).unwrap();
        assert_eq!(cursor.current().unwrap(), Some((2, 20)));
        cursor.put(&1, &30, true).unwrap();
    }
    assert_eq!(plain.get(&writer, &1).unwrap(), Some(30));
    let err = plain.put_with(&writer, &1, &40, Some(PutPrecondition::UniqueKey)).unwrap_err();
    assert!(err.is_key_exists());
    assert_eq!(plain.get(&writer, &1).unwrap(), Some(30));
    {
        let mut cursor = dups.cursor_mut(&writer).unwrap();
        assert!(cursor.put(&1, &10, false).unwrap_err().is_key_exists());
        assert_eq!(cursor.seek(Precision::Exactly, &1, None).unwrap(), Some((1, 10)));
        assert_eq!(cursor.duplicate_count().unwrap(), Some(1));
        cursor.put(&1, &11, false).unwrap();
    }
    assert_eq!(dups.stat(&writer).unwrap().entries, 2);
    let values: Vec<_> = dups.dict(&writer).values().unwrap().map(Result::unwrap).collect();
    assert_eq!(values, vec![10, 11]);
    writer.commit().unwrap();
}

/// Test that value seeks and value moves need a duplicate database
fn test_value_seek_requires_duplicates<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "not_dupsort", DbConfig::new(), &[(1, 10)]);
    let reader = env.reader().unwrap();
    let mut cursor = db.cursor(&reader).unwrap();

    for precision in [Precision::Exactly, Precision::Nearby] {
        let err = cursor.seek(precision, &1, Some(&10)).unwrap_err();
        assert!(err.is_not_dup_sort());
    }
    cursor.first().unwrap();
    let err = cursor.move_to(AbsolutePosition::First, Target::Value).unwrap_err();
    assert!(matches!(err.into_store_error(), StoreError::NotDupSort));
}

/// Test seeks by key and value on a duplicate database
fn test_nearby_value_seek<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "value_seek", dupsort(), &[(1, 10), (1, 20), (2, 5)]);
    let reader = env.reader().unwrap();
    let mut cursor = db.cursor(&reader).unwrap();

    assert_eq!(cursor.seek(Precision::Exactly, &1, Some(&20)).unwrap(), Some((1, 20)));
    assert_eq!(cursor.seek(Precision::Exactly, &1, Some(&15)).unwrap(), None);
    assert_eq!(cursor.seek(Precision::Nearby, &1, Some(&15)).unwrap(), Some((1, 20)));
    // past the last duplicate, the seek continues with the next key
    assert_eq!(cursor.seek(Precision::Nearby, &1, Some(&25)).unwrap(), Some((2, 5)));
    // a missing key ignores the value
    assert_eq!(cursor.seek(Precision::Nearby, &0, Some(&99)).unwrap(), Some((1, 10)));
    assert_eq!(cursor.seek(Precision::Nearby, &2, Some(&6)).unwrap(), None);
}

/// Test deleting single duplicates and whole keys through a cursor
fn test_cursor_deletes<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "cursor_deletes", dupsort(), &[(1, 1), (1, 2), (2, 1), (3, 1)]);
    let writer = env.writer().unwrap();
    {
        let mut cursor = db.cursor_mut(&writer).unwrap();
        cursor.seek(Precision::Exactly, &1, Some(&2)).unwrap();
        cursor.delete(Target::Value).unwrap();
        cursor.seek(Precision::Exactly, &2, None).unwrap();
        cursor.delete(Target::Key).unwrap();
        assert_eq!(cursor.step(RelativePosition::Next, None).unwrap(), Some((3, 1)));
    }
    let dict = db.dict(&writer);
    let entries: Vec<_> = dict.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(entries, vec![(1, 1), (3, 1)]);
    writer.commit().unwrap();
}

/// Test the map operations of the dictionary view
fn test_dictionary_map<E: KvEnv>(env: &E) {
    let writer = env.writer().unwrap();
    let schema = codable_schema::<String, u32>();
    let db = Database::create(&writer, Some("scores"), DbConfig::new(), schema).unwrap();
    let dict = db.dict(&writer);

    dict.set(&s("jaden"), Some(&10)).unwrap();
    let sawyer = dict.get_or(&s("sawyer"), || 0).unwrap() + 1;
    dict.set(&s("sawyer"), Some(&sawyer)).unwrap();
    assert_eq!(dict.get(&s("sawyer")).unwrap(), Some(1));

    dict.merge([(s("jaden"), 5), (s("kai"), 2)], |existing, incoming| existing + incoming)
        .unwrap();
    assert_eq!(dict.get(&s("jaden")).unwrap(), Some(15));
    assert_eq!(dict.get(&s("kai")).unwrap(), Some(2));

    dict.set(&s("sawyer"), None).unwrap();
    assert!(!dict.contains_key(&s("sawyer")).unwrap());
    // removing an absent key is a no-op
    dict.set(&s("nobody"), None).unwrap();

    assert_eq!(dict.update_value(&s("kai"), &3).unwrap(), Some(2));
    assert_eq!(dict.update_value(&s("lee"), &4).unwrap(), None);
    assert_eq!(dict.remove_value(&s("kai")).unwrap(), Some(3));
    assert_eq!(dict.remove_value(&s("kai")).unwrap(), None);
    assert_eq!(dict.len().unwrap(), 2);
    writer.commit().unwrap();

    let reader = env.reader().unwrap();
    let keys: Vec<_> = db.dict(&reader).keys().unwrap().map(Result::unwrap).collect();
    assert_eq!(keys, vec![s("jaden"), s("lee")]);
}

/// Test index ordering and the end sentinel
fn test_index_end_sentinel<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "indices", DbConfig::new(), &[(1, 1), (2, 2), (3, 3)]);
    let reader = env.reader().unwrap();
    let dict = db.dict(&reader);

    let start = dict.start_index().unwrap();
    let end = dict.end_index().unwrap();
    assert!(start < end);
    assert!(end.is_end());

    let last = dict.index_before(&end).unwrap();
    assert_eq!(dict.element_at(&last).unwrap(), (3, 3));
    assert!(start < last && last < end);
    assert_eq!(dict.index_after(&last).unwrap(), end);

    let mut walker = dict.start_index().unwrap();
    let mut seen = vec![];
    while walker != end {
        seen.push(dict.element_at(&walker).unwrap());
        dict.form_index_after(&mut walker).unwrap();
    }
    assert_eq!(seen, vec![(1, 1), (2, 2), (3, 3)]);
    // stepping back from the end reaches the last entry
    dict.form_index_before(&mut walker).unwrap();
    assert_eq!(walker, last);

    let empty = bytes_db(env, "indices_empty", DbConfig::new(), &[]);
    let reader = env.reader().unwrap();
    assert!(empty.dict(&reader).start_index().unwrap().is_end());
}

/// Test that indices on a duplicate database move from key to key
fn test_index_steps_by_key<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "indices_dups", dupsort(), &[(1, 2), (1, 1), (2, 1), (3, 4), (3, 3)]);
    let reader = env.reader().unwrap();
    let dict = db.dict(&reader);

    let start = dict.start_index().unwrap();
    let end = dict.end_index().unwrap();
    let second = dict.index_after(&start).unwrap();
    assert!(start < second);
    assert_eq!(dict.element_at(&second).unwrap(), (2, 1));

    let last = dict.index_before(&end).unwrap();
    assert_eq!(dict.element_at(&last).unwrap(), (3, 3));
    assert_eq!(dict.index_before(&last).unwrap(), second);
    assert_eq!(dict.index_after(&last).unwrap(), end);
    assert_eq!(dict.distance(&start, &end).unwrap(), 3);
}

/// Test that readers see committed state only
fn test_transaction_isolation<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "isolation", DbConfig::new(), &[(1, 1)]);

    let before = env.reader().unwrap();
    let writer = env.writer().unwrap();
    assert_eq!(writer.id(), before.id() + 1);
    db.put(&writer, &2, &2).unwrap();
    assert_eq!(db.get(&writer, &2).unwrap(), Some(2));
    assert_eq!(db.get(&before, &2).unwrap(), None);
    writer.abort();
    assert_eq!(db.get(&env.reader().unwrap(), &2).unwrap(), None);

    let writer = env.writer().unwrap();
    db.put(&writer, &3, &3).unwrap();
    writer.commit().unwrap();
    assert_eq!(db.get(&before, &3).unwrap(), None);
    assert_eq!(db.get(&env.reader().unwrap(), &3).unwrap(), Some(3));
}

/// Test that the write helper commits on `Ok` and aborts on `Err`
fn test_write_closure_rolls_back<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "write_closure", DbConfig::new(), &[]);

    let result: Result<(), E::Error> = env.write(|txn| {
        db.put(txn, &1, &1)?;
        Err(StoreError::KeyExists.into())
    });
    assert!(result.unwrap_err().is_key_exists());

    env.write(|txn| db.put(txn, &2, &2)).unwrap();
    let found = env.read(|txn| Ok((db.get(txn, &1)?, db.get(txn, &2)?))).unwrap();
    assert_eq!(found, (None, Some(2)));
}

/// Test reopening a database by name in a later transaction
fn test_reopen_database<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "reopen", dupsort(), &[(1, 1)]);
    let reader = env.reader().unwrap();

    let reopened = Database::open(&reader, Some("reopen"), codable_schema::<u8, u8>()).unwrap();
    assert_eq!(reopened, Some(db));
    assert!(reopened.unwrap().config().is_dupsort());
    let missing = Database::open(&reader, Some("never_created"), codable_schema::<u8, u8>());
    assert!(missing.unwrap().is_none());
}

/// Test a value cell across transactions
fn test_value_cell<E: KvEnv>(env: &E) {
    let schema = Schema::new(StringCoder, IntCoder::<u64>::big_endian());
    let writer = env.writer().unwrap();
    let db = Database::create(&writer, Some("cells"), DbConfig::new(), schema).unwrap();
    let cell = db.cell(&s("height")).unwrap();
    assert_eq!(cell.get(&writer).unwrap(), None);
    cell.put(&writer, &42).unwrap();
    writer.commit().unwrap();

    let reader = env.reader().unwrap();
    assert_eq!(cell.get(&reader).unwrap(), Some(42));
    assert_eq!(db.get(&reader, &s("height")).unwrap(), Some(42));
}

/// Test clearing a database
fn test_remove_all<E: KvEnv>(env: &E) {
    let db = bytes_db(env, "remove_all", dupsort(), &[(1, 1), (1, 2), (2, 2)]);
    let writer = env.writer().unwrap();
    let dict = db.dict(&writer);
    assert_eq!(dict.len().unwrap(), 3);

    dict.remove_all().unwrap();
    assert!(dict.is_empty().unwrap());
    assert_eq!(dict.first().unwrap(), None);
    assert!(dict.start_index().unwrap().is_end());

    dict.set(&3, Some(&3)).unwrap();
    assert_eq!(dict.first().unwrap(), Some((3, 3)));
    writer.commit().unwrap();
}

/// Test a database with reverse key order
fn test_reverse_key_order<E: KvEnv>(env: &E) {
    let writer = env.writer().unwrap();
    let config = DbConfig::new().with_key_order(SortOrder::Reverse);
    let schema = Schema::new(StringCoder, StringCoder);
    let db = Database::create(&writer, Some("reverse"), config, schema).unwrap();
    let dict = db.dict(&writer);
    for key in ["ab", "ba", "ca"] {
        dict.set(&s(key), Some(&s(key))).unwrap();
    }

    // keys compare from their last byte
    let keys: Vec<_> = dict.keys().unwrap().map(Result::unwrap).collect();
    assert_eq!(keys, vec![s("ba"), s("ca"), s("ab")]);
    assert_eq!(
        writer.compare_keys(db.handle(), b"ab", b"ba"),
        core::cmp::Ordering::Greater
    );
    writer.commit().unwrap();
}

/// Test a database with native integer key order
fn test_integer_key_order<E: KvEnv>(env: &E) {
    let writer = env.writer().unwrap();
    let config = DbConfig::new().with_key_order(SortOrder::Integer);
    let schema = Schema::new(IntCoder::<u32>::new(Endianness::NATIVE), StringCoder);
    let db = Database::create(&writer, Some("integers"), config, schema).unwrap();
    let dict = db.dict(&writer);
    for key in [65_536, 1, 256] {
        dict.set(&key, Some(&key.to_string())).unwrap();
    }

    let keys: Vec<_> = dict.keys().unwrap().map(Result::unwrap).collect();
    assert_eq!(keys, vec![1, 256, 65_536]);
    let mut cursor = db.cursor(&writer).unwrap();
    assert_eq!(cursor.seek(Precision::Nearby, &257, None).unwrap(), Some((65_536, s("65536"))));
    drop(cursor);
    writer.commit().unwrap();
}
