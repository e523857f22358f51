use crate::model::{KvReadError, PutPrecondition, RawKeyValue, RawValue};

/// Raw cursor primitives of an LMDB-style engine.
///
/// Method names follow the engine operations (`MDB_FIRST`, `MDB_NEXT_DUP`,
/// ...). Every move returns `Ok(None)` when there is nothing to land on.
/// Returned bytes borrow the cursor, so they are gone by the next move.
///
/// Unless noted otherwise:
/// - a failed absolute move or seek leaves the cursor unpositioned.
/// - a failed relative move leaves the cursor where it was.
/// - `next` and `prev` on an unpositioned cursor behave like `first` and
///   `last`.
/// - duplicate-only moves on a database without duplicates fail with
///   [`StoreError::NotDupSort`].
///
/// [`StoreError::NotDupSort`]: crate::model::StoreError::NotDupSort
pub trait KvCursor<E: KvReadError> {
    /// Move to the first pair of the database.
    fn first<'a>(&'a mut self) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the last pair of the database.
    fn last<'a>(&'a mut self) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the first duplicate of the current key.
    fn first_dup<'a>(&'a mut self) -> Result<Option<RawValue<'a>>, E>;

    /// Move to the last duplicate of the current key.
    fn last_dup<'a>(&'a mut self) -> Result<Option<RawValue<'a>>, E>;

    /// Move to the next pair, crossing into the next key after the last
    /// duplicate.
    fn next<'a>(&'a mut self) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the previous pair, crossing into the previous key before the
    /// first duplicate.
    fn prev<'a>(&'a mut self) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the next duplicate of the current key.
    fn next_dup<'a>(&'a mut self) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the previous duplicate of the current key.
    fn prev_dup<'a>(&'a mut self) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the first duplicate of the next key.
    fn next_nodup<'a>(&'a mut self) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the last duplicate of the previous key.
    fn prev_nodup<'a>(&'a mut self) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the first duplicate of exactly `key`.
    fn set<'a>(&'a mut self, key: &[u8]) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the first duplicate of the smallest key `>= key`.
    fn set_range<'a>(&'a mut self, key: &[u8]) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to exactly the pair `(key, value)`.
    fn get_both<'a>(&'a mut self, key: &[u8], value: &[u8])
    -> Result<Option<RawKeyValue<'a>>, E>;

    /// Move to the smallest duplicate `>= value` of exactly `key`. Does not
    /// cross into the next key.
    fn get_both_range<'a>(
        &'a mut self,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<RawKeyValue<'a>>, E>;

    /// The pair at the current position, or `None` if the cursor is
    /// unpositioned or its pair was deleted.
    fn get_current<'a>(&'a mut self) -> Result<Option<RawKeyValue<'a>>, E>;

    /// Number of values under the current key, or `None` if unpositioned.
    fn count(&mut self) -> Result<Option<usize>, E>;
}

/// Raw cursor primitives with write access.
pub trait KvCursorMut<E: KvReadError>: KvCursor<E> {
    /// Store a pair and move the cursor onto it.
    ///
    /// With a precondition, fails with [`StoreError::KeyExists`] instead of
    /// overwriting.
    ///
    /// [`StoreError::KeyExists`]: crate::model::StoreError::KeyExists
    fn put(
        &mut self,
        key: &[u8],
        value: &[u8],
        precondition: Option<PutPrecondition>,
    ) -> Result<(), E>;

    /// Delete the pair at the current position.
    ///
    /// The cursor keeps the deleted position, so relative moves continue
    /// from it, but [`KvCursor::get_current`] returns `None`.
    fn del(&mut self) -> Result<(), E>;

    /// Delete every duplicate of the current key.
    fn del_all_dups(&mut self) -> Result<(), E>;
}
