use crate::{
    AbsolutePosition, Cursor, Database, Index, Precision, RelativePosition, Schema, Target,
    model::{KvRead, KvWrite},
};
use durable_codec::{ByteCoder, CodedItem};

type Entry<K, V> = (CodedItem<K>, CodedItem<V>);

/// An ordered dictionary view of a [`Database`] in one transaction.
///
/// The view holds no position of its own. Every read, iteration and index
/// uses a fresh cursor, so any number of iterations can run side by side.
///
/// Entries are ordered by the database's key order, and duplicates of a key
/// by its duplicate order. Iteration visits every pair, duplicates included.
/// An [`Index`] addresses a key instead: index arithmetic steps from key to
/// key, and the element at an index is the first duplicate of its key.
pub struct SortedDict<'a, T, K, V> {
    txn: &'a T,
    db: &'a Database<K, V>,
}

impl<T, K, V> core::fmt::Debug for SortedDict<'_, T, K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SortedDict").field("db", &self.db.handle()).finish_non_exhaustive()
    }
}

impl<T, K, V> Clone for SortedDict<'_, T, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, K, V> Copy for SortedDict<'_, T, K, V> {}

impl<'a, T, K, V> SortedDict<'a, T, K, V> {
    /// Create a view of `db` in `txn`.
    pub const fn new(txn: &'a T, db: &'a Database<K, V>) -> Self {
        Self { txn, db }
    }

    /// The viewed database.
    pub const fn database(&self) -> &'a Database<K, V> {
        self.db
    }

    /// The transaction of the view.
    pub const fn txn(&self) -> &'a T {
        self.txn
    }
}

// ============================================================================
// Map reads
// ============================================================================

impl<'a, T, K, V> SortedDict<'a, T, K, V>
where
    T: KvRead,
    K: ByteCoder,
    V: ByteCoder,
{
    /// The value of `key`, or `None`. On a duplicate database this is the
    /// first duplicate.
    pub fn get(&self, key: &CodedItem<K>) -> Result<Option<CodedItem<V>>, T::Error> {
        self.db.get(self.txn, key)
    }

    /// The value of `key`, or `default()` if it is absent.
    pub fn get_or<F>(&self, key: &CodedItem<K>, default: F) -> Result<CodedItem<V>, T::Error>
    where
        F: FnOnce() -> CodedItem<V>,
    {
        Ok(self.get(key)?.unwrap_or_else(default))
    }

    /// True if `key` has a value.
    pub fn contains_key(&self, key: &CodedItem<K>) -> Result<bool, T::Error> {
        let key = self.db.schema().encode_key(key)?;
        Ok(self.txn.raw_get(self.db.handle(), &key)?.is_some())
    }

    /// Number of pairs, counting duplicates.
    pub fn len(&self) -> Result<usize, T::Error> {
        Ok(self.db.stat(self.txn)?.entries)
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> Result<bool, T::Error> {
        Ok(self.len()? == 0)
    }

    /// The first entry.
    pub fn first(&self) -> Result<Option<Entry<K, V>>, T::Error> {
        self.db.cursor(self.txn)?.first()
    }

    /// The last entry.
    pub fn last(&self) -> Result<Option<Entry<K, V>>, T::Error> {
        self.db.cursor(self.txn)?.last()
    }

    // ========================================================================
    // Indices
    // ========================================================================

    /// The index of the first entry, or the end index if the dictionary is
    /// empty.
    pub fn start_index(&self) -> Result<Index<'a, T>, T::Error> {
        let mut index = Index::new(self.txn, self.db.handle())?;
        index.move_to(AbsolutePosition::First)?;
        Ok(index)
    }

    /// The index one past the last entry.
    pub fn end_index(&self) -> Result<Index<'a, T>, T::Error> {
        Index::end(self.txn, self.db.handle())
    }

    /// The index of exactly `key`, if present.
    pub fn index_for_key(&self, key: &CodedItem<K>) -> Result<Option<Index<'a, T>>, T::Error> {
        let key = self.db.schema().encode_key(key)?;
        let mut index = Index::new(self.txn, self.db.handle())?;
        Ok(index.seek(Precision::Exactly, &key, None)?.then_some(index))
    }

    /// The index of the smallest key at or after `key`, or the end index.
    pub fn index_at_or_after(&self, key: &CodedItem<K>) -> Result<Index<'a, T>, T::Error> {
        let key = self.db.schema().encode_key(key)?;
        let mut index = Index::new(self.txn, self.db.handle())?;
        index.seek(Precision::Nearby, &key, None)?;
        Ok(index)
    }

    /// The index after `index`. Reseeks a fresh cursor to `index` first.
    ///
    /// # Panics
    ///
    /// If `index` is the end index.
    pub fn index_after(&self, index: &Index<'a, T>) -> Result<Index<'a, T>, T::Error> {
        let mut next = index.try_clone()?;
        self.form_index_after(&mut next)?;
        Ok(next)
    }

    /// The index before `index`. Reseeks a fresh cursor to `index` first.
    ///
    /// # Panics
    ///
    /// If `index` is the start index.
    pub fn index_before(&self, index: &Index<'a, T>) -> Result<Index<'a, T>, T::Error> {
        let mut previous = index.try_clone()?;
        self.form_index_before(&mut previous)?;
        Ok(previous)
    }

    /// Advance `index` in place, without reseeking.
    ///
    /// # Panics
    ///
    /// If `index` is the end index.
    pub fn form_index_after(&self, index: &mut Index<'a, T>) -> Result<(), T::Error> {
        index.step(RelativePosition::Next)?;
        Ok(())
    }

    /// Move `index` back in place, without reseeking.
    ///
    /// # Panics
    ///
    /// If `index` is the start index.
    pub fn form_index_before(&self, index: &mut Index<'a, T>) -> Result<(), T::Error> {
        assert!(index.step(RelativePosition::Previous)?, "cannot move before the start index");
        Ok(())
    }

    /// The number of steps from `start` forward to `end`.
    ///
    /// On a duplicate database this counts keys, not pairs.
    ///
    /// # Panics
    ///
    /// If `end` comes before `start`.
    pub fn distance(&self, start: &Index<'a, T>, end: &Index<'a, T>) -> Result<usize, T::Error> {
        assert!(start <= end, "cannot measure a distance backwards");
        let mut walker = start.try_clone()?;
        let mut steps = 0;
        while walker < *end {
            self.form_index_after(&mut walker)?;
            steps += 1;
        }
        Ok(steps)
    }

    /// The entry at `index`.
    ///
    /// # Panics
    ///
    /// If `index` is the end index or unpositioned.
    pub fn element_at(&self, index: &Index<'a, T>) -> Result<Entry<K, V>, T::Error> {
        let (Some(key), Some(value)) = (index.key(), index.value()) else {
            panic!("attempting to access dictionary elements using an invalid index");
        };
        let schema = self.db.schema();
        Ok((schema.decode_key(key)?, schema.decode_value(value)?))
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Iterate over every entry in order.
    pub fn iter(&self) -> Result<Iter<'a, T, K, V>, T::Error> {
        Iter::new(self.txn, self.db, None)
    }

    /// Iterate in order, starting at the smallest key at or after `key`.
    pub fn iter_from(&self, key: &CodedItem<K>) -> Result<Iter<'a, T, K, V>, T::Error> {
        let key = self.db.schema().encode_key(key)?;
        Iter::new(self.txn, self.db, Some(key))
    }

    /// Iterate over the keys in order. A key with duplicates is repeated.
    pub fn keys(
        &self,
    ) -> Result<impl Iterator<Item = Result<CodedItem<K>, T::Error>> + use<'a, T, K, V>, T::Error>
    {
        Ok(self.iter()?.map(|entry| entry.map(|(key, _)| key)))
    }

    /// Iterate over the values in key order.
    pub fn values(
        &self,
    ) -> Result<impl Iterator<Item = Result<CodedItem<V>, T::Error>> + use<'a, T, K, V>, T::Error>
    {
        Ok(self.iter()?.map(|entry| entry.map(|(_, value)| value)))
    }
}

// ============================================================================
// Map writes
// ============================================================================

impl<'a, T, K, V> SortedDict<'a, T, K, V>
where
    T: KvWrite,
    K: ByteCoder,
    V: ByteCoder,
{
    /// Set the value of `key`, or remove it with `None`.
    ///
    /// Removing an absent key does nothing. On a duplicate database, setting
    /// adds a duplicate and removing drops every duplicate of the key.
    pub fn set(&self, key: &CodedItem<K>, value: Option<&CodedItem<V>>) -> Result<(), T::Error> {
        match value {
            Some(value) => self.db.put(self.txn, key, value),
            None => self.db.delete(self.txn, key, None).map(drop),
        }
    }

    /// Write `value` under `key` and return the value it replaces.
    ///
    /// Uses one cursor for the read and the write. On a duplicate database
    /// the first duplicate is replaced.
    pub fn update_value(
        &self,
        key: &CodedItem<K>,
        value: &CodedItem<V>,
    ) -> Result<Option<CodedItem<V>>, T::Error> {
        let mut cursor = self.db.cursor_mut(self.txn)?;
        let previous = cursor.seek(Precision::Exactly, key, None)?.map(|(_, value)| value);
        if previous.is_some() && self.db.config().is_dupsort() {
            cursor.delete(Target::Value)?;
        }
        cursor.put(key, value, true)?;
        Ok(previous)
    }

    /// Remove `key` and return its value, if it had one. On a duplicate
    /// database every duplicate is removed and the first is returned.
    pub fn remove_value(&self, key: &CodedItem<K>) -> Result<Option<CodedItem<V>>, T::Error> {
        let mut cursor = self.db.cursor_mut(self.txn)?;
        let Some((_, value)) = cursor.seek(Precision::Exactly, key, None)? else {
            return Ok(None);
        };
        cursor.delete(Target::Key)?;
        Ok(Some(value))
    }

    /// Remove the entry at `index` and return it.
    ///
    /// # Panics
    ///
    /// If `index` is the end index or unpositioned.
    pub fn remove_at(&self, index: Index<'a, T>) -> Result<Entry<K, V>, T::Error> {
        let entry = self.element_at(&index)?;
        let (Some(key), value) = (index.key(), index.value()) else {
            unreachable!("element_at checked the index");
        };
        self.txn.raw_delete(self.db.handle(), key, value)?;
        Ok(entry)
    }

    /// Merge `entries` into the dictionary. Where a key already has a value,
    /// `combine(existing, incoming)` decides the value to keep.
    pub fn merge<I, F>(&self, entries: I, mut combine: F) -> Result<(), T::Error>
    where
        I: IntoIterator<Item = Entry<K, V>>,
        F: FnMut(CodedItem<V>, CodedItem<V>) -> CodedItem<V>,
    {
        let dupsort = self.db.config().is_dupsort();
        let mut cursor = self.db.cursor_mut(self.txn)?;
        for (key, incoming) in entries {
            let merged = match cursor.seek(Precision::Exactly, &key, None)? {
                Some((_, existing)) => {
                    if dupsort {
                        cursor.delete(Target::Value)?;
                    }
                    combine(existing, incoming)
                }
                None => incoming,
            };
            cursor.put(&key, &merged, true)?;
        }
        Ok(())
    }

    /// Remove every entry. The database itself stays open.
    pub fn remove_all(&self) -> Result<(), T::Error> {
        self.db.clear(self.txn)
    }
}

// ============================================================================
// Iter
// ============================================================================

/// Forward iterator over the entries of a [`SortedDict`].
///
/// Owns its own cursor. The first error ends the iteration.
pub struct Iter<'a, T: KvRead + 'a, K, V> {
    cursor: Cursor<T::Cursor<'a>, T::Error>,
    schema: &'a Schema<K, V>,
    start: Option<Vec<u8>>,
    started: bool,
    done: bool,
}

impl<T: KvRead, K, V> core::fmt::Debug for Iter<'_, T, K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Iter")
            .field("start", &self.start)
            .field("started", &self.started)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<'a, T: KvRead, K, V> Iter<'a, T, K, V> {
    fn new(txn: &'a T, db: &'a Database<K, V>, start: Option<Vec<u8>>) -> Result<Self, T::Error> {
        let cursor = Cursor::new(txn.raw_cursor(db.handle())?, db.config());
        Ok(Self { cursor, schema: db.schema(), start, started: false, done: false })
    }
}

impl<T, K, V> Iterator for Iter<'_, T, K, V>
where
    T: KvRead,
    K: ByteCoder,
    V: ByteCoder,
{
    type Item = Result<Entry<K, V>, T::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let found = if self.started {
            self.cursor.step(RelativePosition::Next, None)
        } else {
            self.started = true;
            match &self.start {
                Some(key) => self.cursor.seek(Precision::Nearby, key, None),
                None => self.cursor.move_to(AbsolutePosition::First, Target::Key),
            }
        };
        let item = match found {
            Ok(Some(pair)) => self.schema.decode_pair(pair).map_err(Into::into),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(err) => Err(err),
        };
        self.done = item.is_err();
        Some(item)
    }
}

impl<T, K, V> core::iter::FusedIterator for Iter<'_, T, K, V>
where
    T: KvRead,
    K: ByteCoder,
    V: ByteCoder,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codable_schema,
        mem::MemKv,
        model::{DbConfig, DuplicateConfig, KvEnv},
    };
    use durable_codec::{IntCoder, StringCoder};

    fn s(value: &str) -> String {
        value.to_string()
    }

    #[test]
    fn map_operations() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let schema = codable_schema::<String, i32>();
        let db = Database::create(&writer, None, DbConfig::new(), schema).unwrap();
        let dict = db.dict(&writer);

        assert!(dict.is_empty().unwrap());
        dict.set(&s("jaden"), Some(&10)).unwrap();
        assert_eq!(dict.get(&s("jaden")).unwrap(), Some(10));
        assert_eq!(dict.get_or(&s("sawyer"), || 0).unwrap(), 0);

        let sawyer = dict.get_or(&s("sawyer"), || 0).unwrap() + 1;
        dict.set(&s("sawyer"), Some(&sawyer)).unwrap();
        assert_eq!(dict.update_value(&s("sawyer"), &5).unwrap(), Some(1));
        assert_eq!(dict.get(&s("sawyer")).unwrap(), Some(5));
        assert_eq!(dict.len().unwrap(), 2);

        dict.set(&s("nobody"), None).unwrap();
        assert_eq!(dict.remove_value(&s("jaden")).unwrap(), Some(10));
        assert_eq!(dict.remove_value(&s("jaden")).unwrap(), None);
        assert!(!dict.contains_key(&s("jaden")).unwrap());
        writer.commit().unwrap();
    }

    #[test]
    fn merge_combines_existing_first() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let db = Database::create(&writer, None, DbConfig::new(), codable_schema::<u8, u32>())
            .unwrap();
        let dict = db.dict(&writer);
        dict.set(&1, Some(&100)).unwrap();

        dict.merge([(1, 5), (2, 7)], |existing, incoming| existing * 10 + incoming).unwrap();
        assert_eq!(dict.get(&1).unwrap(), Some(1005));
        assert_eq!(dict.get(&2).unwrap(), Some(7));
        writer.commit().unwrap();
    }

    #[test]
    fn iteration_and_index_arithmetic() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let db = Database::create(&writer, None, DbConfig::new(), codable_schema::<u8, u8>())
            .unwrap();
        for key in [3, 1, 2] {
            db.put(&writer, &key, &(key + 10)).unwrap();
        }
        let dict = db.dict(&writer);

        let entries: Vec<_> = dict.iter().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(entries, vec![(1, 11), (2, 12), (3, 13)]);
        let keys: Vec<_> = dict.keys().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(keys, vec![1, 2, 3]);
        let tail: Vec<_> = dict.iter_from(&2).unwrap().map(Result::unwrap).collect();
        assert_eq!(tail, vec![(2, 12), (3, 13)]);

        let start = dict.start_index().unwrap();
        let end = dict.end_index().unwrap();
        assert!(start < end);
        assert_eq!(dict.element_at(&start).unwrap(), (1, 11));

        let second = dict.index_after(&start).unwrap();
        assert_eq!(dict.element_at(&second).unwrap(), (2, 12));
        assert_eq!(dict.index_before(&second).unwrap(), start);

        let last = dict.index_before(&end).unwrap();
        assert_eq!(dict.element_at(&last).unwrap(), (3, 13));
        assert_eq!(dict.index_after(&last).unwrap(), end);

        let mut walker = dict.start_index().unwrap();
        let mut steps = 0;
        while walker != end {
            dict.form_index_after(&mut walker).unwrap();
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(dict.distance(&start, &end).unwrap(), 3);
        assert_eq!(dict.distance(&last, &end).unwrap(), 1);

        assert!(dict.index_for_key(&9).unwrap().is_none());
        assert_eq!(dict.index_at_or_after(&0).unwrap(), start);
        assert!(dict.index_at_or_after(&4).unwrap().is_end());
        assert_eq!(dict.first().unwrap(), Some((1, 11)));
        assert_eq!(dict.last().unwrap(), Some((3, 13)));
    }

    #[test]
    fn concurrent_iterations_do_not_interfere() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let db = Database::create(&writer, None, DbConfig::new(), codable_schema::<u8, u8>())
            .unwrap();
        for key in 0..4 {
            db.put(&writer, &key, &key).unwrap();
        }
        writer.commit().unwrap();

        let reader = env.reader().unwrap();
        let dict = db.dict(&reader);
        let mut outer = dict.keys().unwrap();
        let mut inner = dict.keys().unwrap();
        assert_eq!(outer.next().unwrap().unwrap(), 0);
        assert_eq!(outer.next().unwrap().unwrap(), 1);
        assert_eq!(inner.next().unwrap().unwrap(), 0);
        assert_eq!(outer.next().unwrap().unwrap(), 2);
    }

    #[test]
    fn remove_at_and_remove_all() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let schema = Schema::new(StringCoder, IntCoder::<u16>::big_endian());
        let db = Database::create(&writer, Some("t"), DbConfig::new(), schema).unwrap();
        let dict = db.dict(&writer);
        dict.set(&s("a"), Some(&1)).unwrap();
        dict.set(&s("b"), Some(&2)).unwrap();

        let index = dict.index_for_key(&s("a")).unwrap().unwrap();
        assert_eq!(dict.remove_at(index).unwrap(), (s("a"), 1));
        assert_eq!(dict.len().unwrap(), 1);

        dict.remove_all().unwrap();
        assert!(dict.get(&s("b")).unwrap().is_none());
        assert!(dict.start_index().unwrap().is_end());
        // the database is still usable
        dict.set(&s("c"), Some(&3)).unwrap();
        assert_eq!(dict.len().unwrap(), 1);
        writer.commit().unwrap();
    }

    #[test]
    fn duplicates_are_iterated_in_value_order() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let config = DbConfig::new().with_duplicates(DuplicateConfig::default());
        let db = Database::create(&writer, None, config, codable_schema::<u8, u8>()).unwrap();
        let dict = db.dict(&writer);
        for value in [1, 3, 2] {
            dict.set(&5, Some(&value)).unwrap();
        }
        dict.set(&4, Some(&0)).unwrap();

        let entries: Vec<_> = dict.iter().unwrap().map(Result::unwrap).collect();
        assert_eq!(entries, vec![(4, 0), (5, 1), (5, 2), (5, 3)]);
        assert_eq!(dict.len().unwrap(), 4);

        // the first duplicate is replaced
        assert_eq!(dict.update_value(&5, &9).unwrap(), Some(1));
        let values: Vec<_> = dict.values().unwrap().map(Result::unwrap).collect();
        assert_eq!(values, vec![0, 2, 3, 9]);

        assert_eq!(dict.remove_value(&5).unwrap(), Some(2));
        assert_eq!(dict.len().unwrap(), 1);
        writer.commit().unwrap();
    }

    #[test]
    fn index_arithmetic_moves_between_keys() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let config = DbConfig::new().with_duplicates(DuplicateConfig::default());
        let db = Database::create(&writer, None, config, codable_schema::<u8, u8>()).unwrap();
        for (key, value) in [(1, 1), (1, 2), (2, 1)] {
            db.put(&writer, &key, &value).unwrap();
        }
        let dict = db.dict(&writer);

        let start = dict.start_index().unwrap();
        let end = dict.end_index().unwrap();
        assert_eq!(dict.element_at(&start).unwrap(), (1, 1));

        let second = dict.index_after(&start).unwrap();
        assert!(second > start);
        assert_eq!(dict.element_at(&second).unwrap(), (2, 1));
        assert_eq!(dict.index_after(&second).unwrap(), end);

        let last = dict.index_before(&end).unwrap();
        assert_eq!(last, second);
        assert_eq!(dict.element_at(&last).unwrap(), (2, 1));
        let first = dict.index_before(&last).unwrap();
        assert_eq!(first, start);
        assert_eq!(dict.element_at(&first).unwrap(), (1, 1));

        assert_eq!(dict.distance(&start, &end).unwrap(), 2);
        // iteration still yields every pair
        assert_eq!(dict.iter().unwrap().count(), 3);
    }

    #[test]
    #[should_panic(expected = "before the start")]
    fn index_before_start_panics() {
        let env = MemKv::new();
        let writer = env.writer().unwrap();
        let db = Database::create(&writer, None, DbConfig::new(), codable_schema::<u8, u8>())
            .unwrap();
        db.put(&writer, &1, &1).unwrap();
        let dict = db.dict(&writer);
        let start = dict.start_index().unwrap();
        let _ = dict.index_before(&start);
    }
}
