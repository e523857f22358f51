use crate::model::{
    Db, DbConfig, KvCursor, KvCursorMut, KvReadError, PutPrecondition, RawValue, Stat,
};
use core::cmp::Ordering;

/// A transactional sorted key-value environment.
///
/// This is the top-level trait for storage engines. It hands out read-only
/// transactions, which may run concurrently and each see a consistent
/// snapshot, and read-write transactions, of which at most one is live.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait KvEnv {
    /// Error type shared by the environment and its transactions.
    type Error: KvReadError;
    /// The read-only transaction type.
    type RoTx: KvRead<Error = Self::Error>;
    /// The read-write transaction type.
    type RwTx: KvWrite<Error = Self::Error>;

    /// Begin a read-only transaction.
    fn reader(&self) -> Result<Self::RoTx, Self::Error>;

    /// Begin a read-write transaction.
    ///
    /// Engines that cannot queue writers fail with
    /// [`StoreError::WriteLocked`] while another write transaction is live.
    ///
    /// [`StoreError::WriteLocked`]: crate::model::StoreError::WriteLocked
    fn writer(&self) -> Result<Self::RwTx, Self::Error>;

    /// Largest key, in bytes, the engine accepts. Values of duplicate
    /// databases share this limit.
    fn max_key_size(&self) -> usize;

    /// Run `f` inside a read-only transaction.
    fn read<T, F>(&self, f: F) -> Result<T, Self::Error>
    where
        F: FnOnce(&Self::RoTx) -> Result<T, Self::Error>,
    {
        let tx = self.reader()?;
        f(&tx)
    }

    /// Run `f` inside a read-write transaction. The transaction commits if
    /// `f` returns `Ok`, and aborts otherwise.
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<Self::Error>,
        F: FnOnce(&Self::RwTx) -> Result<T, E>,
    {
        let tx = self.writer()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.abort();
                Err(err)
            }
        }
    }
}

/// A transaction with read access.
///
/// Returned values borrow the transaction and cannot outlive it.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait KvRead {
    /// Error type for read operations.
    type Error: KvReadError;

    /// The cursor type for traversing a database.
    type Cursor<'a>: KvCursor<Self::Error>
    where
        Self: 'a;

    /// The transaction id. Readers see the id of the last committed write,
    /// writers get the next one.
    fn id(&self) -> u64;

    /// Open an existing database. `None` names the unnamed main database.
    ///
    /// Returns `Ok(None)` if no database of that name exists.
    fn open_db(&self, name: Option<&str>) -> Result<Option<Db>, Self::Error>;

    /// Get the first value stored under `key`.
    fn raw_get<'a>(&'a self, db: Db, key: &[u8]) -> Result<Option<RawValue<'a>>, Self::Error>;

    /// Open an unpositioned cursor on `db`.
    fn raw_cursor<'a>(&'a self, db: Db) -> Result<Self::Cursor<'a>, Self::Error>;

    /// Compare two encoded keys under the key order of `db`.
    fn compare_keys(&self, db: Db, a: &[u8], b: &[u8]) -> Ordering {
        db.config().key_order.compare(a, b)
    }

    /// Compare two encoded duplicate values under the value order of `db`.
    fn compare_values(&self, db: Db, a: &[u8], b: &[u8]) -> Ordering {
        db.config().value_order().compare(a, b)
    }

    /// Statistics of `db` as seen by this transaction.
    fn stat(&self, db: Db) -> Result<Stat, Self::Error>;
}

/// A transaction with write access.
///
/// Dropping a write transaction without calling [`KvWrite::commit`] discards
/// its changes.
pub trait KvWrite: KvRead {
    /// The mutable cursor type for traversing and modifying a database.
    type CursorMut<'a>: KvCursorMut<Self::Error>
    where
        Self: 'a;

    /// Open a database, creating it if needed.
    ///
    /// Fails if the database exists with a different configuration.
    fn create_db(&self, name: Option<&str>, config: DbConfig) -> Result<Db, Self::Error>;

    /// Store a pair.
    ///
    /// Without a precondition, a database without duplicates overwrites the
    /// existing value, and a duplicate database adds `value` to the set of
    /// values under `key`.
    fn raw_put(
        &self,
        db: Db,
        key: &[u8],
        value: &[u8],
        precondition: Option<PutPrecondition>,
    ) -> Result<(), Self::Error>;

    /// Delete every value under `key`, or only `value` if given and `db`
    /// stores duplicates. Returns whether anything was deleted.
    fn raw_delete(&self, db: Db, key: &[u8], value: Option<&[u8]>) -> Result<bool, Self::Error>;

    /// Delete every pair in `db`. With `close`, also delete the database
    /// itself and invalidate the handle.
    fn drop_db(&self, db: Db, close: bool) -> Result<(), Self::Error>;

    /// Open an unpositioned cursor with write access on `db`.
    fn raw_cursor_mut<'a>(&'a self, db: Db) -> Result<Self::CursorMut<'a>, Self::Error>;

    /// Commit the transaction.
    fn commit(self) -> Result<(), Self::Error>;

    /// Discard the transaction.
    fn abort(self);
}
