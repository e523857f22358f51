use crate::{
    AbsolutePosition, Cursor, Precision, RelativePosition, Target,
    model::{Db, KvRead},
};
use core::cmp::Ordering;

/// An owned copy of a pair, taken before the cursor moves again.
type Entry = (Vec<u8>, Vec<u8>);

/// A position in the ordered key space of one database in one transaction.
///
/// An index owns a private cursor and is in one of three states:
///
/// - unpositioned: freshly created, before the first move.
/// - positioned: on an entry, whose bytes it keeps a copy of.
/// - end: one past the last entry.
///
/// An index addresses a key. Moves and steps land on the first duplicate of
/// a key and skip its other duplicates, so every step changes the key.
///
/// Indices of the same database and transaction are totally ordered by the
/// database's key order, with the end index after every positioned index.
/// Only keys take part in the order. An index seeked to a later duplicate
/// compares equal to one on the first duplicate of the same key.
///
/// # Panics
///
/// Comparing indices of different transactions or databases, comparing an
/// unpositioned index, and stepping forward from the end all panic.
pub struct Index<'d, T: KvRead> {
    txn: &'d T,
    db: Db,
    cursor: Cursor<T::Cursor<'d>, T::Error>,
    current: Option<Entry>,
    is_end: bool,
}

impl<T: KvRead> core::fmt::Debug for Index<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Index")
            .field("db", &self.db)
            .field("current", &self.current)
            .field("is_end", &self.is_end)
            .finish()
    }
}

impl<'d, T: KvRead> Index<'d, T> {
    /// Create an unpositioned index.
    pub fn new(txn: &'d T, db: Db) -> Result<Self, T::Error> {
        let cursor = Cursor::new(txn.raw_cursor(db)?, db.config());
        Ok(Self { txn, db, cursor, current: None, is_end: false })
    }

    /// Create an index at the end.
    pub fn end(txn: &'d T, db: Db) -> Result<Self, T::Error> {
        let mut index = Self::new(txn, db)?;
        index.move_to_end();
        Ok(index)
    }

    /// True if this is the end index.
    pub const fn is_end(&self) -> bool {
        self.is_end
    }

    /// True if the index sits on an entry.
    pub const fn is_positioned(&self) -> bool {
        self.current.is_some()
    }

    /// The encoded key of the entry, if positioned.
    pub fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(key, _)| key.as_slice())
    }

    /// The encoded value of the entry, if positioned.
    pub fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, value)| value.as_slice())
    }

    /// The database the index belongs to.
    pub const fn db(&self) -> Db {
        self.db
    }

    /// The transaction the index belongs to.
    pub const fn txn(&self) -> &'d T {
        self.txn
    }

    fn settle(&mut self, found: Option<Entry>) -> bool {
        self.is_end = found.is_none();
        self.current = found;
        !self.is_end
    }

    /// Move to the end.
    pub fn move_to_end(&mut self) {
        self.current = None;
        self.is_end = true;
    }

    /// Move to the first or last key. On an empty database this is the end.
    pub fn move_to(&mut self, position: AbsolutePosition) -> Result<bool, T::Error> {
        if self.cursor.move_to(position, Target::Key)?.is_none() {
            return Ok(self.settle(None));
        }
        // the last key starts on its last duplicate
        if position == AbsolutePosition::Last && self.db.config().is_dupsort() {
            self.cursor.move_to(AbsolutePosition::First, Target::Value)?;
        }
        let found = self.cursor.current()?.map(owned);
        Ok(self.settle(found))
    }

    /// Step to the next or previous key, returning whether the index is
    /// positioned afterwards.
    ///
    /// Stepping forward from the last key reaches the end. Stepping back
    /// from the end reaches the last key. Stepping back from the first key
    /// returns `false` and leaves the index where it was.
    ///
    /// # Panics
    ///
    /// Stepping forward from the end.
    pub fn step(&mut self, direction: RelativePosition) -> Result<bool, T::Error> {
        match (self.is_end, direction) {
            (true, RelativePosition::Next) => panic!("cannot advance past the end index"),
            (true, RelativePosition::Previous) => self.move_to(AbsolutePosition::Last),
            (false, RelativePosition::Next) => {
                let found =
                    self.cursor.step(RelativePosition::Next, Some(Target::Key))?.map(owned);
                Ok(self.settle(found))
            }
            (false, RelativePosition::Previous) => {
                let step = self.cursor.step(RelativePosition::Previous, Some(Target::Key))?;
                let Some(found) = step.map(owned) else {
                    return Ok(false);
                };
                self.current = Some(found);
                Ok(true)
            }
        }
    }

    /// Seek to a key, or a key and duplicate value. A miss moves the index to
    /// the end.
    pub fn seek(
        &mut self,
        precision: Precision,
        key: &[u8],
        value: Option<&[u8]>,
    ) -> Result<bool, T::Error> {
        let found = self.cursor.seek(precision, key, value)?.map(owned);
        Ok(self.settle(found))
    }

    /// Create an independent index at the same position.
    ///
    /// The copy gets its own cursor, seeked to this index's entry. If that
    /// entry was deleted in the meantime, the copy lands on the next entry.
    pub fn try_clone(&self) -> Result<Self, T::Error> {
        let mut index = Self::new(self.txn, self.db)?;
        if self.is_end {
            index.move_to_end();
        } else if let Some((key, value)) = &self.current {
            let value = self.db.config().is_dupsort().then_some(value.as_slice());
            if !index.seek(Precision::Exactly, key, value)? {
                index.seek(Precision::Nearby, key, value)?;
            }
        }
        Ok(index)
    }

    #[track_caller]
    fn assert_compatible(&self, other: &Self) {
        assert!(
            core::ptr::eq(self.txn, other.txn),
            "invalid comparison between indices of separate transactions"
        );
        assert!(self.db == other.db, "invalid comparison between indices of separate databases");
    }
}

fn owned((key, value): crate::model::RawKeyValue<'_>) -> Entry {
    (key.into_owned(), value.into_owned())
}

impl<T: KvRead> PartialEq for Index<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: KvRead> Eq for Index<'_, T> {}

impl<T: KvRead> PartialOrd for Index<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: KvRead> Ord for Index<'_, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.assert_compatible(other);
        match (self.is_end, other.is_end) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let (Some(a), Some(b)) = (self.key(), other.key()) else {
                    panic!("cannot compare an unpositioned index");
                };
                self.txn.compare_keys(self.db, a, b)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mem::MemKv,
        model::{DbConfig, DuplicateConfig, KvEnv, KvWrite, SortOrder},
    };

    fn fill(env: &MemKv, config: DbConfig, pairs: &[(&str, &str)]) -> Db {
        let writer = env.writer().unwrap();
        let db = writer.create_db(Some("t"), config).unwrap();
        for (key, value) in pairs {
            writer.raw_put(db, key.as_bytes(), value.as_bytes(), None).unwrap();
        }
        writer.commit().unwrap();
        db
    }

    #[test]
    fn walks_to_the_end_and_back() {
        let env = MemKv::new();
        let db = fill(&env, DbConfig::new(), &[("a", "1"), ("b", "2")]);
        let reader = env.reader().unwrap();

        let mut index = Index::new(&reader, db).unwrap();
        assert!(index.move_to(AbsolutePosition::First).unwrap());
        assert_eq!(index.key(), Some(b"a" as &[u8]));
        assert!(index.step(RelativePosition::Next).unwrap());
        assert!(!index.step(RelativePosition::Next).unwrap());
        assert!(index.is_end());
        assert_eq!(index, Index::end(&reader, db).unwrap());

        assert!(index.step(RelativePosition::Previous).unwrap());
        assert_eq!(index.key(), Some(b"b" as &[u8]));
        assert!(index.step(RelativePosition::Previous).unwrap());
        // no entry before the first, the index stays put
        assert!(!index.step(RelativePosition::Previous).unwrap());
        assert_eq!(index.key(), Some(b"a" as &[u8]));
    }

    #[test]
    fn empty_database_starts_at_the_end() {
        let env = MemKv::new();
        let db = fill(&env, DbConfig::new(), &[]);
        let reader = env.reader().unwrap();
        let mut index = Index::new(&reader, db).unwrap();
        assert!(!index.move_to(AbsolutePosition::First).unwrap());
        assert!(index.is_end());
    }

    #[test]
    #[should_panic(expected = "past the end")]
    fn stepping_past_the_end_panics() {
        let env = MemKv::new();
        let db = fill(&env, DbConfig::new(), &[("a", "1")]);
        let reader = env.reader().unwrap();
        let mut index = Index::end(&reader, db).unwrap();
        let _ = index.step(RelativePosition::Next);
    }

    #[test]
    fn ordering_follows_the_key_order() {
        let env = MemKv::new();
        let config = DbConfig::new().with_key_order(SortOrder::Reverse);
        let db = fill(&env, config, &[("ab", "1"), ("ba", "2")]);
        let reader = env.reader().unwrap();

        let mut first = Index::new(&reader, db).unwrap();
        first.move_to(AbsolutePosition::First).unwrap();
        let mut last = Index::new(&reader, db).unwrap();
        last.move_to(AbsolutePosition::Last).unwrap();
        let end = Index::end(&reader, db).unwrap();

        // reverse order compares from the last byte
        assert_eq!(first.key(), Some(b"ba" as &[u8]));
        assert!(first < last);
        assert!(last < end);
        assert!(first < end);
        assert_eq!(first.cmp(&first.try_clone().unwrap()), Ordering::Equal);
    }

    #[test]
    fn steps_skip_the_duplicates_of_a_key() {
        let env = MemKv::new();
        let config = DbConfig::new().with_duplicates(DuplicateConfig::default());
        let db = fill(&env, config, &[("k", "1"), ("k", "2"), ("m", "1"), ("m", "2")]);
        let reader = env.reader().unwrap();

        let mut start = Index::new(&reader, db).unwrap();
        start.move_to(AbsolutePosition::First).unwrap();
        assert_eq!(start.value(), Some(b"1" as &[u8]));

        let mut after = start.try_clone().unwrap();
        assert!(after.step(RelativePosition::Next).unwrap());
        assert_eq!(after.key(), Some(b"m" as &[u8]));
        assert_eq!(after.value(), Some(b"1" as &[u8]));
        assert!(start < after);
        assert!(!after.try_clone().unwrap().step(RelativePosition::Next).unwrap());

        // back from the end lands on the first duplicate of the last key
        let mut back = Index::end(&reader, db).unwrap();
        assert!(back.step(RelativePosition::Previous).unwrap());
        assert_eq!(back, after);
        assert_eq!(back.value(), Some(b"1" as &[u8]));
        assert!(back.step(RelativePosition::Previous).unwrap());
        assert_eq!(back, start);
        assert_eq!(back.value(), Some(b"1" as &[u8]));

        // a later duplicate shares the key's place in the order
        let mut seeked = Index::new(&reader, db).unwrap();
        assert!(seeked.seek(Precision::Exactly, b"k", Some(b"2")).unwrap());
        assert_eq!(seeked, start);
        assert_eq!(seeked.try_clone().unwrap().value(), Some(b"2" as &[u8]));
    }

    #[test]
    fn seek_miss_moves_to_the_end() {
        let env = MemKv::new();
        let db = fill(&env, DbConfig::new(), &[("cat", "meow")]);
        let reader = env.reader().unwrap();
        let mut index = Index::new(&reader, db).unwrap();
        assert!(!index.seek(Precision::Exactly, b"dog", None).unwrap());
        assert!(index.is_end());
        assert!(index.seek(Precision::Nearby, b"ant", None).unwrap());
        assert_eq!(index.value(), Some(b"meow" as &[u8]));
    }

    #[test]
    #[should_panic(expected = "separate transactions")]
    fn comparing_across_transactions_panics() {
        let env = MemKv::new();
        let db = fill(&env, DbConfig::new(), &[("a", "1")]);
        let one = env.reader().unwrap();
        let two = env.reader().unwrap();
        let a = Index::end(&one, db).unwrap();
        let b = Index::end(&two, db).unwrap();
        let _ = a == b;
    }
}
