//! In-memory key-value environment.
//!
//! This is not a good implementation for production use, but it follows the
//! semantics of an LMDB-style engine closely enough to test everything built
//! on the [`model`] traits:
//!
//! - read transactions see the snapshot committed when they began.
//! - at most one write transaction is live, and it sees its own writes.
//! - databases may store sorted duplicates, and may use reverse or integer
//!   key orders.
//! - map size, reader count and named database count are bounded.
//!
//! [`model`]: crate::model

mod cursor;
pub use cursor::MemKvCursor;

mod table;
use table::{PutRefusal, Table};

use crate::model::{
    Db, DbConfig, KvEnv, KvRead, KvReadError, KvWrite, PutPrecondition, RawValue, Stat,
    StoreError, ThreadAffinity,
};
use durable_codec::CodecError;
use parking_lot::RwLock;
use std::{
    borrow::Cow,
    cell::{Ref, RefCell, RefMut},
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// 1 KB in bytes
pub const KILOBYTE: usize = 1024;
/// 1 MB in bytes
pub const MEGABYTE: usize = KILOBYTE * 1024;
/// 1 GB in bytes
pub const GIGABYTE: usize = MEGABYTE * 1024;

/// Maximum key size, and maximum value size in duplicate databases.
pub const MAX_KEY_SIZE: usize = 511;

/// Default upper bound on stored bytes.
pub const DEFAULT_MAP_SIZE: usize = 10 * MEGABYTE;
/// Default maximum number of concurrent read transactions.
pub const DEFAULT_MAX_READERS: usize = 126;
/// Default maximum number of named databases.
pub const DEFAULT_MAX_DBS: usize = 32;

const MAIN_DB: u32 = 0;
const PAGE_SIZE: usize = 4096;
const PAGE_FANOUT: usize = 64;
const TRACING_TARGET: &str = "durable_kv::mem";

/// Arguments for opening a [`MemKv`] environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvArguments {
    /// Upper bound on the bytes of keys and values stored across all
    /// databases.
    map_size: usize,
    /// Maximum number of live read transactions.
    max_readers: usize,
    /// Maximum number of named databases. The unnamed main database does not
    /// count.
    max_dbs: usize,
}

impl Default for EnvArguments {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvArguments {
    /// Create arguments with the default limits.
    pub const fn new() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
            max_readers: DEFAULT_MAX_READERS,
            max_dbs: DEFAULT_MAX_DBS,
        }
    }

    /// Sets the upper bound on stored bytes.
    pub const fn with_map_size(mut self, map_size: Option<usize>) -> Self {
        if let Some(map_size) = map_size {
            self.map_size = map_size;
        }
        self
    }

    /// Set `max_readers` limit.
    pub const fn with_max_readers(mut self, max_readers: Option<usize>) -> Self {
        if let Some(max_readers) = max_readers {
            self.max_readers = max_readers;
        }
        self
    }

    /// Set the maximum number of named databases.
    pub const fn with_max_dbs(mut self, max_dbs: Option<usize>) -> Self {
        if let Some(max_dbs) = max_dbs {
            self.max_dbs = max_dbs;
        }
        self
    }

    /// The configured map size.
    pub const fn map_size(&self) -> usize {
        self.map_size
    }

    /// The configured reader limit.
    pub const fn max_readers(&self) -> usize {
        self.max_readers
    }

    /// The configured named database limit.
    pub const fn max_dbs(&self) -> usize {
        self.max_dbs
    }

    /// Open an empty environment with these arguments.
    pub fn open(self) -> MemKv {
        MemKv {
            inner: Arc::new(EnvInner {
                args: self,
                committed: RwLock::new(Arc::new(Snapshot::genesis())),
                writer: AtomicBool::new(false),
                readers: AtomicUsize::new(0),
            }),
        }
    }
}

/// Error type for [`MemKv`] operations.
#[derive(Debug, thiserror::Error)]
pub enum MemKvError {
    /// Backend-independent error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Codec error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The handle names a database that was dropped.
    #[error("unknown database handle {0}")]
    UnknownDb(u32),

    /// A database was reopened with a different configuration.
    #[error("database exists with an incompatible configuration")]
    Incompatible,

    /// A key is empty or too long, a value does not fit a duplicate
    /// database, or an integer key or value is not 4 or 8 bytes.
    #[error("unsupported size of key or value: {size} bytes")]
    BadValueSize {
        /// Size of the offending key or value.
        size: usize,
    },

    /// The write would exceed the map size.
    #[error("map size limit of {limit} bytes reached")]
    MapFull {
        /// The configured map size.
        limit: usize,
    },

    /// The named database limit is reached.
    #[error("named database limit of {max} reached")]
    DbsFull {
        /// The configured limit.
        max: usize,
    },

    /// The reader limit is reached.
    #[error("reader limit of {max} reached")]
    ReadersFull {
        /// The configured limit.
        max: usize,
    },

    /// A move relative to the current position, or a delete, on an
    /// unpositioned cursor.
    #[error("cursor is not positioned")]
    Unpositioned,
}

impl KvReadError for MemKvError {
    fn into_store_error(self) -> StoreError {
        match self {
            Self::Store(err) => err,
            Self::Codec(err) => StoreError::Codec(err),
            other => StoreError::from_err(other),
        }
    }

    fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

const fn refused(refusal: PutRefusal) -> MemKvError {
    match refusal {
        PutRefusal::KeyExists => MemKvError::Store(StoreError::KeyExists),
        PutRefusal::BadValueSize(size) => MemKvError::BadValueSize { size },
    }
}

fn check_key(config: DbConfig, key: &[u8]) -> Result<(), MemKvError> {
    let size = key.len();
    let bad_integer = config.key_order.is_integer() && !matches!(size, 4 | 8);
    if size == 0 || size > MAX_KEY_SIZE || bad_integer {
        return Err(MemKvError::BadValueSize { size });
    }
    Ok(())
}

fn check_value(config: DbConfig, value: &[u8]) -> Result<(), MemKvError> {
    let Some(dup) = config.duplicates else {
        return Ok(());
    };
    let size = value.len();
    if size > MAX_KEY_SIZE || (dup.order.is_integer() && !matches!(size, 4 | 8)) {
        return Err(MemKvError::BadValueSize { size });
    }
    Ok(())
}

/// Page statistics approximated from the stored bytes.
fn stat_of(table: &Table) -> Stat {
    let leaf_pages = table.bytes().div_ceil(PAGE_SIZE);
    let branch_pages = if leaf_pages > 1 { leaf_pages.div_ceil(PAGE_FANOUT) } else { 0 };
    let depth = match (table.pairs(), branch_pages) {
        (0, _) => 0,
        (_, 0) => 1,
        _ => 2,
    };
    Stat {
        page_size: PAGE_SIZE as u32,
        depth,
        branch_pages,
        leaf_pages,
        overflow_pages: 0,
        entries: table.pairs(),
    }
}

/// A committed (or in-progress) state of every database.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    txn_id: u64,
    names: BTreeMap<String, u32>,
    tables: BTreeMap<u32, Arc<Table>>,
    next_id: u32,
}

impl Snapshot {
    fn genesis() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(MAIN_DB, Arc::new(Table::new(DbConfig::new())));
        Self { txn_id: 0, names: BTreeMap::new(), tables, next_id: MAIN_DB + 1 }
    }

    fn lookup(&self, name: Option<&str>) -> Option<Db> {
        let id = match name {
            Some(name) => *self.names.get(name)?,
            None => MAIN_DB,
        };
        self.tables.get(&id).map(|table| Db::new(id, table.config()))
    }

    pub(crate) fn table(&self, db: Db) -> Result<&Table, MemKvError> {
        self.tables.get(&db.id()).map(|table| &**table).ok_or(MemKvError::UnknownDb(db.id()))
    }

    fn table_mut(&mut self, db: Db) -> Result<&mut Table, MemKvError> {
        self.tables.get_mut(&db.id()).map(Arc::make_mut).ok_or(MemKvError::UnknownDb(db.id()))
    }

    fn bytes(&self) -> usize {
        self.tables.values().map(|table| table.bytes()).sum()
    }
}

#[derive(Debug)]
struct EnvInner {
    args: EnvArguments,
    committed: RwLock<Arc<Snapshot>>,
    writer: AtomicBool,
    readers: AtomicUsize,
}

/// An in-memory environment of sorted databases.
///
/// Readers share the last committed [`Snapshot`] behind an [`RwLock`]. A
/// writer works on a private copy-on-write clone, which replaces the shared
/// snapshot on commit. Only one writer can be live. A second
/// [`KvEnv::writer`] call fails with [`StoreError::WriteLocked`].
#[derive(Debug, Clone)]
pub struct MemKv {
    inner: Arc<EnvInner>,
}

impl Default for MemKv {
    fn default() -> Self {
        Self::new()
    }
}

impl MemKv {
    /// Create a new empty environment with default arguments.
    pub fn new() -> Self {
        EnvArguments::new().open()
    }

    /// The arguments the environment was opened with.
    pub fn arguments(&self) -> &EnvArguments {
        &self.inner.args
    }

    /// Number of live read transactions.
    pub fn readers(&self) -> usize {
        self.inner.readers.load(Ordering::Acquire)
    }

    fn begin_read(env: &Arc<EnvInner>) -> Result<MemKvRoTx, MemKvError> {
        let max = env.args.max_readers;
        env.readers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .map_err(|_| MemKvError::ReadersFull { max })?;

        let snapshot = env.committed.read().clone();
        tracing::trace!(target: TRACING_TARGET, txn_id = snapshot.txn_id, "began read transaction");
        Ok(MemKvRoTx { env: env.clone(), snapshot })
    }
}

impl KvEnv for MemKv {
    type Error = MemKvError;
    type RoTx = MemKvRoTx;
    type RwTx = MemKvRwTx;

    fn reader(&self) -> Result<Self::RoTx, Self::Error> {
        Self::begin_read(&self.inner)
    }

    fn writer(&self) -> Result<Self::RwTx, Self::Error> {
        self.inner
            .writer
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StoreError::WriteLocked)?;

        let committed = self.inner.committed.read().clone();
        let mut snapshot = Snapshot::clone(&committed);
        snapshot.txn_id += 1;

        let txn_id = snapshot.txn_id;
        tracing::debug!(target: TRACING_TARGET, txn_id, "began write transaction");
        Ok(MemKvRwTx {
            env: self.inner.clone(),
            state: RefCell::new(snapshot),
            affinity: ThreadAffinity::current(),
            finished: false,
        })
    }

    fn max_key_size(&self) -> usize {
        MAX_KEY_SIZE
    }
}

// ============================================================================
// Read transactions
// ============================================================================

/// Read-only transaction for [`MemKv`].
///
/// Holds the snapshot committed when it began. Values it returns borrow
/// that snapshot.
pub struct MemKvRoTx {
    env: Arc<EnvInner>,
    snapshot: Arc<Snapshot>,
}

impl core::fmt::Debug for MemKvRoTx {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemKvRoTx").field("txn_id", &self.snapshot.txn_id).finish()
    }
}

impl Drop for MemKvRoTx {
    fn drop(&mut self) {
        self.env.readers.fetch_sub(1, Ordering::AcqRel);
    }
}

impl MemKvRoTx {
    /// Release the snapshot and the reader slot, keeping the handle for a
    /// later [`MemKvResetTx::renew`].
    pub fn reset(self) -> MemKvResetTx {
        let txn_id = self.snapshot.txn_id;
        tracing::trace!(target: TRACING_TARGET, txn_id, "reset read transaction");
        MemKvResetTx { env: self.env.clone() }
    }
}

/// A read-only transaction released by [`MemKvRoTx::reset`].
pub struct MemKvResetTx {
    env: Arc<EnvInner>,
}

impl core::fmt::Debug for MemKvResetTx {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemKvResetTx").finish_non_exhaustive()
    }
}

impl MemKvResetTx {
    /// Begin reading again, from the latest committed snapshot.
    pub fn renew(self) -> Result<MemKvRoTx, MemKvError> {
        MemKv::begin_read(&self.env)
    }
}

impl KvRead for MemKvRoTx {
    type Error = MemKvError;

    type Cursor<'a> = MemKvCursor<'a>;

    fn id(&self) -> u64 {
        self.snapshot.txn_id
    }

    fn open_db(&self, name: Option<&str>) -> Result<Option<Db>, Self::Error> {
        Ok(self.snapshot.lookup(name))
    }

    fn raw_get<'a>(&'a self, db: Db, key: &[u8]) -> Result<Option<RawValue<'a>>, Self::Error> {
        Ok(self.snapshot.table(db)?.get(key).map(Cow::Borrowed))
    }

    fn raw_cursor<'a>(&'a self, db: Db) -> Result<Self::Cursor<'a>, Self::Error> {
        self.snapshot.table(db)?;
        Ok(MemKvCursor::read(&self.snapshot, db))
    }

    fn stat(&self, db: Db) -> Result<Stat, Self::Error> {
        self.snapshot.table(db).map(stat_of)
    }
}

// ============================================================================
// Write transactions
// ============================================================================

/// Read-write transaction for [`MemKv`].
///
/// Changes are visible to this transaction immediately and to others after
/// [`KvWrite::commit`]. The transaction must be used from the thread that
/// opened it: every call panics otherwise.
pub struct MemKvRwTx {
    env: Arc<EnvInner>,
    state: RefCell<Snapshot>,
    affinity: ThreadAffinity,
    finished: bool,
}

impl core::fmt::Debug for MemKvRwTx {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemKvRwTx")
            .field("txn_id", &self.state.borrow().txn_id)
            .field("affinity", &self.affinity)
            .finish()
    }
}

impl Drop for MemKvRwTx {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                target: TRACING_TARGET,
                txn_id = self.state.borrow().txn_id,
                "write transaction dropped without commit or abort, discarding changes"
            );
        }
        self.env.writer.store(false, Ordering::Release);
    }
}

impl MemKvRwTx {
    /// The thread this transaction is bound to.
    pub const fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    #[track_caller]
    pub(crate) fn state(&self) -> Ref<'_, Snapshot> {
        self.affinity.assert_current();
        self.state.borrow()
    }

    #[track_caller]
    fn state_mut(&self) -> RefMut<'_, Snapshot> {
        self.affinity.assert_current();
        self.state.borrow_mut()
    }
}

impl KvRead for MemKvRwTx {
    type Error = MemKvError;

    type Cursor<'a> = MemKvCursor<'a>;

    fn id(&self) -> u64 {
        self.state().txn_id
    }

    fn open_db(&self, name: Option<&str>) -> Result<Option<Db>, Self::Error> {
        Ok(self.state().lookup(name))
    }

    fn raw_get<'a>(&'a self, db: Db, key: &[u8]) -> Result<Option<RawValue<'a>>, Self::Error> {
        let state = self.state();
        let value = state.table(db)?.get(key).map(|value| Cow::Owned(value.to_vec()));
        Ok(value)
    }

    fn raw_cursor<'a>(&'a self, db: Db) -> Result<Self::Cursor<'a>, Self::Error> {
        self.state().table(db)?;
        Ok(MemKvCursor::write(self, db))
    }

    fn stat(&self, db: Db) -> Result<Stat, Self::Error> {
        let state = self.state();
        state.table(db).map(stat_of)
    }
}

impl KvWrite for MemKvRwTx {
    type CursorMut<'a> = MemKvCursor<'a>;

    fn create_db(&self, name: Option<&str>, config: DbConfig) -> Result<Db, Self::Error> {
        let mut state = self.state_mut();

        let Some(name) = name else {
            let main = Db::new(MAIN_DB, config);
            let table = state.table_mut(main)?;
            if table.config() != config {
                if table.pairs() > 0 {
                    return Err(MemKvError::Incompatible);
                }
                *table = Table::new(config);
            }
            return Ok(main);
        };

        if let Some(&id) = state.names.get(name) {
            let db = Db::new(id, config);
            return if state.table(db)?.config() == config {
                Ok(db)
            } else {
                Err(MemKvError::Incompatible)
            };
        }

        let max = self.env.args.max_dbs;
        if state.names.len() >= max {
            return Err(MemKvError::DbsFull { max });
        }
        let id = state.next_id;
        state.next_id += 1;
        state.names.insert(name.to_owned(), id);
        state.tables.insert(id, Arc::new(Table::new(config)));

        tracing::debug!(target: TRACING_TARGET, name, id, ?config, "created database");
        Ok(Db::new(id, config))
    }

    fn raw_put(
        &self,
        db: Db,
        key: &[u8],
        value: &[u8],
        precondition: Option<PutPrecondition>,
    ) -> Result<(), Self::Error> {
        let mut state = self.state_mut();
        let used = state.bytes();
        let table = state.table_mut(db)?;
        check_key(table.config(), key)?;
        check_value(table.config(), value)?;

        let limit = self.env.args.map_size;
        if used + table.growth(key, value) > limit {
            tracing::warn!(target: TRACING_TARGET, limit, used, "map size limit reached");
            return Err(MemKvError::MapFull { limit });
        }
        table.put(key, value, precondition).map_err(refused)
    }

    fn raw_delete(&self, db: Db, key: &[u8], value: Option<&[u8]>) -> Result<bool, Self::Error> {
        let mut state = self.state_mut();
        Ok(state.table_mut(db)?.delete(key, value))
    }

    fn drop_db(&self, db: Db, close: bool) -> Result<(), Self::Error> {
        let mut state = self.state_mut();
        if close && db.id() != MAIN_DB {
            state.table(db)?;
            state.tables.remove(&db.id());
            state.names.retain(|_, id| *id != db.id());
        } else {
            state.table_mut(db)?.clear();
        }
        tracing::debug!(target: TRACING_TARGET, id = db.id(), close, "dropped database");
        Ok(())
    }

    fn raw_cursor_mut<'a>(&'a self, db: Db) -> Result<Self::CursorMut<'a>, Self::Error> {
        self.raw_cursor(db)
    }

    fn commit(mut self) -> Result<(), Self::Error> {
        self.affinity.assert_current();
        let snapshot = self.state.take();
        let txn_id = snapshot.txn_id;
        *self.env.committed.write() = Arc::new(snapshot);
        self.finished = true;

        tracing::debug!(target: TRACING_TARGET, txn_id, "committed write transaction");
        Ok(())
    }

    fn abort(mut self) {
        self.affinity.assert_current();
        self.finished = true;
        let txn_id = self.state.borrow().txn_id;
        tracing::debug!(target: TRACING_TARGET, txn_id, "aborted write transaction");
    }
}
