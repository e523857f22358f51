use crate::{
    Cursor, Schema, SortedDict, TypedCursor, ValueCell,
    model::{Db, DbConfig, KvRead, KvWrite, PutPrecondition, Stat},
};
use core::cmp::Ordering;
use durable_codec::{ByteCoder, CodecError, CodedItem};

const TRACING_TARGET: &str = "durable_kv::database";

/// A typed database handle: a raw [`Db`] plus the [`Schema`] of its keys and
/// values.
///
/// The handle is not bound to a transaction. Every operation takes the
/// transaction to run in, and the handle stays valid across transactions
/// until the database is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Database<K, V> {
    handle: Db,
    schema: Schema<K, V>,
}

impl<K, V> Database<K, V> {
    /// Pair a raw handle with a schema.
    pub const fn from_parts(handle: Db, schema: Schema<K, V>) -> Self {
        Self { handle, schema }
    }

    /// The raw handle.
    pub const fn handle(&self) -> Db {
        self.handle
    }

    /// The configuration the database was created with.
    pub const fn config(&self) -> DbConfig {
        self.handle.config()
    }

    /// The key and value codecs.
    pub const fn schema(&self) -> &Schema<K, V> {
        &self.schema
    }

    /// Reinterpret the stored values with another codec.
    pub fn rebind<W>(self, value: W) -> Database<K, W> {
        Database { handle: self.handle, schema: self.schema.with_value(value) }
    }
}

impl<K, V> Database<K, V>
where
    K: ByteCoder,
    V: ByteCoder,
{
    /// Open an existing database, or the main database if `name` is `None`.
    ///
    /// Returns `None` if there is no database of that name.
    pub fn open<T: KvRead>(
        txn: &T,
        name: Option<&str>,
        schema: Schema<K, V>,
    ) -> Result<Option<Self>, T::Error> {
        Ok(txn.open_db(name)?.map(|handle| Self::from_parts(handle, schema)))
    }

    /// Open a database, creating it if needed.
    ///
    /// Reopening an existing database requires the same configuration.
    pub fn create<T: KvWrite>(
        txn: &T,
        name: Option<&str>,
        config: DbConfig,
        schema: Schema<K, V>,
    ) -> Result<Self, T::Error> {
        let handle = txn.create_db(name, config)?;
        tracing::debug!(target: TRACING_TARGET, ?name, id = handle.id(), "opened database");
        Ok(Self::from_parts(handle, schema))
    }

    /// Get the value stored under `key`. On a duplicate database this is the
    /// first duplicate.
    pub fn get<T: KvRead>(
        &self,
        txn: &T,
        key: &CodedItem<K>,
    ) -> Result<Option<CodedItem<V>>, T::Error> {
        let key = self.schema.encode_key(key)?;
        txn.raw_get(self.handle, &key)?
            .map(|value| self.schema.decode_value(&value))
            .transpose()
            .map_err(Into::into)
    }

    /// Store `value` under `key`, overwriting the value of a database
    /// without duplicates or adding a duplicate otherwise.
    pub fn put<T: KvWrite>(
        &self,
        txn: &T,
        key: &CodedItem<K>,
        value: &CodedItem<V>,
    ) -> Result<(), T::Error> {
        self.put_with(txn, key, value, None)
    }

    /// Store `value` under `key` if `precondition` allows it.
    pub fn put_with<T: KvWrite>(
        &self,
        txn: &T,
        key: &CodedItem<K>,
        value: &CodedItem<V>,
        precondition: Option<PutPrecondition>,
    ) -> Result<(), T::Error> {
        let key = self.schema.encode_key(key)?;
        let value = self.schema.encode_value(value)?;
        txn.raw_put(self.handle, &key, &value, precondition)
    }

    /// Delete `key`, or only its duplicate `value`. Returns whether anything
    /// was deleted.
    pub fn delete<T: KvWrite>(
        &self,
        txn: &T,
        key: &CodedItem<K>,
        value: Option<&CodedItem<V>>,
    ) -> Result<bool, T::Error> {
        let key = self.schema.encode_key(key)?;
        let value = value.map(|value| self.schema.encode_value(value)).transpose()?;
        txn.raw_delete(self.handle, &key, value.as_deref())
    }

    /// Delete every entry, keeping the database open.
    pub fn clear<T: KvWrite>(&self, txn: &T) -> Result<(), T::Error> {
        txn.drop_db(self.handle, false)
    }

    /// Delete the database itself.
    pub fn drop_db<T: KvWrite>(self, txn: &T) -> Result<(), T::Error> {
        tracing::debug!(target: TRACING_TARGET, id = self.handle.id(), "dropping database");
        txn.drop_db(self.handle, true)
    }

    /// Page and entry statistics.
    pub fn stat<T: KvRead>(&self, txn: &T) -> Result<Stat, T::Error> {
        txn.stat(self.handle)
    }

    /// Order two keys the way the database orders them.
    pub fn compare_keys<T: KvRead>(
        &self,
        txn: &T,
        a: &CodedItem<K>,
        b: &CodedItem<K>,
    ) -> Result<Ordering, T::Error> {
        let a = self.schema.encode_key(a)?;
        let b = self.schema.encode_key(b)?;
        Ok(txn.compare_keys(self.handle, &a, &b))
    }

    /// Open a cursor in a transaction.
    pub fn cursor<'a, T: KvRead>(
        &'a self,
        txn: &'a T,
    ) -> Result<TypedCursor<'a, T::Cursor<'a>, K, V, T::Error>, T::Error> {
        let raw = txn.raw_cursor(self.handle)?;
        Ok(TypedCursor::new(Cursor::new(raw, self.config()), &self.schema))
    }

    /// Open a cursor with write access in a write transaction.
    pub fn cursor_mut<'a, T: KvWrite>(
        &'a self,
        txn: &'a T,
    ) -> Result<TypedCursor<'a, T::CursorMut<'a>, K, V, T::Error>, T::Error> {
        let raw = txn.raw_cursor_mut(self.handle)?;
        Ok(TypedCursor::new(Cursor::new(raw, self.config()), &self.schema))
    }

    /// Run `f` with a fresh cursor. The cursor is closed when `f` returns,
    /// on every path.
    pub fn with_cursor<'a, T, R, F>(&'a self, txn: &'a T, f: F) -> Result<R, T::Error>
    where
        T: KvRead,
        F: FnOnce(&mut TypedCursor<'a, T::Cursor<'a>, K, V, T::Error>) -> Result<R, T::Error>,
    {
        let mut cursor = self.cursor(txn)?;
        f(&mut cursor)
    }

    /// A cell for the single value at `key`.
    pub fn cell(&self, key: &CodedItem<K>) -> Result<ValueCell<V>, CodecError>
    where
        V: Clone,
    {
        let key = self.schema.encode_key(key)?;
        Ok(ValueCell::new(self.handle, key, self.schema.value_coder().clone()))
    }

    /// A dictionary view of the database in a transaction.
    pub const fn dict<'a, T: KvRead>(&'a self, txn: &'a T) -> SortedDict<'a, T, K, V> {
        SortedDict::new(txn, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        RelativePosition, Target, codable_schema,
        mem::MemKv,
        model::{DuplicateConfig, KvEnv, KvReadError, SortOrder, StoreError},
    };
    use durable_codec::{IntCoder, StringCoder};

    #[test]
    fn put_get_delete() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let schema = codable_schema::<String, String>();
        let db = Database::create(&writer, Some("animals"), DbConfig::new(), schema).unwrap();

        db.put(&writer, &"cat".to_string(), &"meow".to_string()).unwrap();
        assert_eq!(db.get(&writer, &"cat".to_string()).unwrap().as_deref(), Some("meow"));
        assert!(db.delete(&writer, &"cat".to_string(), None).unwrap());
        assert!(!db.delete(&writer, &"cat".to_string(), None).unwrap());
        assert!(db.get(&writer, &"cat".to_string()).unwrap().is_none());
        writer.commit().unwrap();
    }

    #[test]
    fn open_missing_database() {
        let env = MemKv::new();
        let reader = env.reader().unwrap();
        let db = Database::open(&reader, Some("nope"), codable_schema::<u32, u32>()).unwrap();
        assert!(db.is_none());
    }

    #[test]
    fn insert_only_put() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let schema = codable_schema::<u8, u8>();
        let db = Database::create(&writer, None, DbConfig::new(), schema).unwrap();
        db.put(&writer, &1, &1).unwrap();

        let err = db.put_with(&writer, &1, &2, Some(PutPrecondition::UniqueKey)).unwrap_err();
        assert!(matches!(err.into_store_error(), StoreError::KeyExists));
        assert_eq!(db.get(&writer, &1).unwrap(), Some(1));
        writer.commit().unwrap();
    }

    #[test]
    fn delete_single_duplicate() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let config = DbConfig::new().with_duplicates(DuplicateConfig::default());
        let schema = codable_schema::<u8, u8>();
        let db = Database::create(&writer, Some("dups"), config, schema).unwrap();
        for value in [3, 1, 2] {
            db.put(&writer, &7, &value).unwrap();
        }
        assert_eq!(db.get(&writer, &7).unwrap(), Some(1));

        assert!(db.delete(&writer, &7, Some(&1)).unwrap());
        assert_eq!(db.get(&writer, &7).unwrap(), Some(2));
        assert_eq!(db.stat(&writer).unwrap().entries, 2);
        writer.commit().unwrap();
    }

    #[test]
    fn clear_keeps_the_database() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let schema = codable_schema::<u8, u8>();
        let db = Database::create(&writer, Some("t"), DbConfig::new(), schema).unwrap();
        db.put(&writer, &1, &1).unwrap();
        db.clear(&writer).unwrap();
        assert!(db.get(&writer, &1).unwrap().is_none());
        db.put(&writer, &2, &2).unwrap();

        db.drop_db(&writer).unwrap();
        assert!(writer.open_db(Some("t")).unwrap().is_none());
        writer.commit().unwrap();
    }

    #[test]
    fn key_ordering_follows_the_config() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let schema = Schema::new(StringCoder, StringCoder);
        let reverse = DbConfig::new().with_key_order(SortOrder::Reverse);
        let db = Database::create(&writer, Some("rev"), reverse, schema).unwrap();

        // reverse order compares from the last byte
        let ordering = db.compare_keys(&writer, &"ab".to_string(), &"ba".to_string()).unwrap();
        assert_eq!(ordering, Ordering::Greater);
        writer.commit().unwrap();
    }

    #[test]
    fn rebind_and_cell() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let schema = codable_schema::<String, u32>();
        let db = Database::create(&writer, None, DbConfig::new(), schema).unwrap();
        let cell = db.cell(&"counter".to_string()).unwrap();
        cell.put(&writer, &0x0102_0304).unwrap();

        let raw = db.rebind(IntCoder::<u32>::little_endian());
        assert_eq!(raw.get(&writer, &"counter".to_string()).unwrap(), Some(0x0403_0201));
        writer.commit().unwrap();
    }

    #[test]
    fn with_cursor_walks_entries() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let schema = codable_schema::<u8, u8>();
        let db = Database::create(&writer, None, DbConfig::new(), schema).unwrap();
        for key in 1..=3 {
            db.put(&writer, &key, &(key * 10)).unwrap();
        }

        let keys = db
            .with_cursor(&writer, |cursor| {
                let mut keys = vec![];
                let mut entry = cursor.first()?;
                while let Some((key, _)) = entry {
                    keys.push(key);
                    entry = cursor.step(RelativePosition::Next, Some(Target::Key))?;
                }
                Ok(keys)
            })
            .unwrap();
        assert_eq!(keys, vec![1, 2, 3]);
        writer.commit().unwrap();
    }
}
