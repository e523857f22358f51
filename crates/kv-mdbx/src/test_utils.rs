//! Utilities for testing the MDBX storage engine.

use crate::{DatabaseArguments, DatabaseEnv, MEGABYTE};
use tempfile::{TempDir, tempdir};

/// Creates a temporary MDBX database for testing that will be automatically
/// cleaned up when the TempDir is dropped.
pub fn create_test_rw_db() -> (TempDir, DatabaseEnv) {
    let dir = tempdir().unwrap();

    let args = DatabaseArguments::new()
        .with_geometry_max_size(Some(256 * MEGABYTE))
        .with_growth_step(Some(4 * MEGABYTE))
        .with_max_dbs(Some(32));
    let db = args.open_rw(dir.path()).unwrap();

    (dir, db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MdbxError;
    use durable_kv::{
        AbsolutePosition, Database, Precision, RelativePosition, Target, codable_schema,
        conformance::conformance,
        model::{
            DbConfig, DuplicateConfig, KvCursor, KvCursorMut, KvEnv, KvRead, KvReadError, KvWrite,
            SortOrder,
        },
    };

    /// Create a temporary MDBX database for testing that will be automatically cleaned up
    fn run_test<F: FnOnce(&DatabaseEnv)>(f: F) {
        let (_dir, db) = create_test_rw_db();
        f(&db);
    }

    fn dupsort() -> DbConfig {
        DbConfig::new().with_duplicates(DuplicateConfig::default())
    }

    #[test]
    fn mdbx_conformance() {
        run_test(conformance)
    }

    #[test]
    fn moves_continue_from_a_deleted_pair() {
        run_test(|env| {
            let writer = env.writer().unwrap();
            let db = writer.create_db(Some("deleted"), dupsort()).unwrap();
            let pairs = [(b"a", b"1"), (b"b", b"1"), (b"b", b"2"), (b"b", b"3"), (b"c", b"1")];
            for (key, value) in pairs {
                writer.raw_put(db, key, value, None).unwrap();
            }

            let mut cursor = writer.raw_cursor_mut(db).unwrap();
            cursor.get_both(b"b", b"2").unwrap();
            cursor.del().unwrap();
            assert_eq!(cursor.get_current().unwrap(), None);
            assert_eq!(cursor.count().unwrap(), Some(2));

            let (key, value) = cursor.next_dup().unwrap().unwrap();
            assert_eq!((&*key, &*value), (&b"b"[..], &b"3"[..]));
            cursor.del().unwrap();
            let (key, value) = cursor.prev().unwrap().unwrap();
            assert_eq!((&*key, &*value), (&b"b"[..], &b"1"[..]));

            cursor.del_all_dups().unwrap();
            let (key, _) = cursor.next().unwrap().unwrap();
            assert_eq!(&*key, b"c");
            let (key, _) = cursor.prev().unwrap().unwrap();
            assert_eq!(&*key, b"a");
            // a failed relative move keeps the position
            assert!(cursor.prev().unwrap().is_none());
            let (key, _) = cursor.get_current().unwrap().unwrap();
            assert_eq!(&*key, b"a");
        });
    }

    #[test]
    fn value_moves_need_a_position() {
        run_test(|env| {
            let writer = env.writer().unwrap();
            let db = writer.create_db(Some("unpositioned"), dupsort()).unwrap();
            writer.raw_put(db, b"k", b"v", None).unwrap();

            let mut cursor = writer.raw_cursor(db).unwrap();
            assert!(matches!(cursor.next_dup(), Err(MdbxError::Unpositioned)));
            assert!(matches!(cursor.first_dup(), Err(MdbxError::Unpositioned)));
            assert_eq!(cursor.count().unwrap(), None);
            assert!(cursor.next().unwrap().is_some());
            assert_eq!(cursor.count().unwrap(), Some(1));

            let plain = writer.create_db(Some("plain"), DbConfig::new()).unwrap();
            writer.raw_put(plain, b"k", b"v", None).unwrap();
            let mut cursor = writer.raw_cursor(plain).unwrap();
            cursor.first().unwrap();
            assert!(cursor.last_dup().unwrap_err().is_not_dup_sort());
        });
    }

    #[test]
    fn reopening_with_other_flags_is_refused() {
        run_test(|env| {
            let writer = env.writer().unwrap();
            let db = writer.create_db(Some("flags"), dupsort()).unwrap();
            assert_eq!(writer.create_db(Some("flags"), dupsort()).unwrap(), db);
            let err = writer.create_db(Some("flags"), DbConfig::new()).unwrap_err();
            assert!(matches!(err, MdbxError::Incompatible));
            writer.commit().unwrap();

            let reader = env.reader().unwrap();
            let reopened = reader.open_db(Some("flags")).unwrap().unwrap();
            assert_eq!(reopened, db);
            assert!(reader.open_db(Some("missing")).unwrap().is_none());
        });
    }

    #[test]
    fn bad_sizes_are_refused() {
        run_test(|env| {
            let writer = env.writer().unwrap();
            let config = DbConfig::new().with_key_order(SortOrder::Integer);
            let db = writer.create_db(Some("sizes"), config).unwrap();
            let err = writer.raw_put(db, &[1, 2, 3], b"v", None).unwrap_err();
            assert!(matches!(err, MdbxError::BadValueSize { size: 3 }));
            let long = vec![7u8; env.max_key_size() + 1];
            let err = writer.raw_put(db, &long, b"v", None).unwrap_err();
            assert!(matches!(err, MdbxError::BadValueSize { .. }));
            writer.raw_put(db, &1u32.to_ne_bytes(), b"v", None).unwrap();
        });
    }

    #[test]
    fn dropped_database_handle_is_unknown() {
        run_test(|env| {
            let db = env
                .write(|txn| {
                    let schema = codable_schema::<u8, u8>();
                    let db = Database::create(txn, Some("dropped"), DbConfig::new(), schema)?;
                    db.put(txn, &1, &1)?;
                    Ok::<_, MdbxError>(db)
                })
                .unwrap();

            let writer = env.writer().unwrap();
            db.clear(&writer).unwrap();
            assert_eq!(db.stat(&writer).unwrap().entries, 0);
            writer.drop_db(db.handle(), true).unwrap();
            let err = writer.raw_get(db.handle(), &[1]).unwrap_err();
            assert!(matches!(err, MdbxError::UnknownDb(_)));
            writer.commit().unwrap();

            let reader = env.reader().unwrap();
            assert!(reader.open_db(Some("dropped")).unwrap().is_none());
        });
    }

    #[test]
    fn data_survives_reopening_the_environment() {
        let (dir, env) = create_test_rw_db();
        let db = env
            .write(|txn| {
                let schema = codable_schema::<u8, u8>();
                let db = Database::create(txn, Some("durable"), dupsort(), schema)?;
                for value in [3, 1, 2] {
                    db.put(txn, &9, &value)?;
                }
                Ok::<_, MdbxError>(db)
            })
            .unwrap();
        drop(env);

        let env = DatabaseArguments::new()
            .with_geometry_max_size(Some(256 * MEGABYTE))
            .with_growth_step(Some(4 * MEGABYTE))
            .open_rw(dir.path())
            .unwrap();
        let reader = env.reader().unwrap();
        let reopened = Database::open(&reader, Some("durable"), codable_schema::<u8, u8>())
            .unwrap()
            .unwrap();
        assert_eq!(reopened, db);

        let mut cursor = reopened.cursor(&reader).unwrap();
        assert_eq!(cursor.seek(Precision::Exactly, &9, None).unwrap(), Some((9, 1)));
        assert_eq!(cursor.move_to(AbsolutePosition::Last, Target::Value).unwrap(), Some((9, 3)));
        assert_eq!(cursor.step(RelativePosition::Next, None).unwrap(), None);
    }
}
