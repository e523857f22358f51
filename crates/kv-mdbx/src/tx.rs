//! Transaction wrapper for libmdbx.
use crate::{
    Cursor, MdbxError, TRACING_TARGET,
    db_info::{DbNames, check_key, check_pair, compatible, config_of, flags_of, write_flags},
};
use durable_kv::model::{Db, DbConfig, KvRead, KvWrite, PutPrecondition, RawValue, Stat};
use signet_libmdbx::{Database, MdbxError as LibMdbxError, Rw, TransactionKind};
use std::borrow::Cow;

/// Wrapper around [`signet_libmdbx::tx::Tx`], sharing the environment's
/// database names.
///
/// A [`Db`] carries the MDBX dbi. Each operation reopens the database under
/// the name remembered for that dbi, which libmdbx caches per transaction.
pub struct Tx<K: TransactionKind> {
    /// Libmdbx transaction.
    inner: signet_libmdbx::tx::Tx<K>,

    /// Id captured when the transaction began.
    id: u64,

    /// Database names of the environment.
    names: DbNames,
}

impl<K: TransactionKind> std::fmt::Debug for Tx<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<K: TransactionKind> Tx<K> {
    /// Wraps a freshly started transaction.
    pub(crate) fn new(inner: signet_libmdbx::tx::Tx<K>, names: DbNames) -> Result<Self, MdbxError> {
        let id = inner.id()?;
        Ok(Self { inner, id, names })
    }

    /// The underlying libmdbx transaction.
    pub const fn inner(&self) -> &signet_libmdbx::tx::Tx<K> {
        &self.inner
    }

    fn remember(&self, name: Option<&str>, handle: Database) {
        self.names.write().insert(handle.dbi(), name.map(str::to_owned));
    }

    /// Reopen the MDBX database behind `db` in this transaction.
    fn handle(&self, db: Db) -> Result<Database, MdbxError> {
        let name = self.names.read().get(&db.id()).cloned();
        let Some(name) = name else {
            return Err(MdbxError::UnknownDb(db.id()));
        };
        match self.inner.open_db(name.as_deref()) {
            Ok(handle) => Ok(handle),
            // created by a transaction that was aborted, or dropped since
            Err(LibMdbxError::NotFound) => Err(MdbxError::UnknownDb(db.id())),
            Err(err) => Err(err.into()),
        }
    }
}

impl<K> KvRead for Tx<K>
where
    K: TransactionKind,
{
    type Error = MdbxError;

    type Cursor<'a>
        = Cursor<'a, K>
    where
        Self: 'a;

    fn id(&self) -> u64 {
        self.id
    }

    fn open_db(&self, name: Option<&str>) -> Result<Option<Db>, Self::Error> {
        match self.inner.open_db(name) {
            Ok(handle) => {
                self.remember(name, handle);
                Ok(Some(Db::new(handle.dbi(), config_of(handle.flags()))))
            }
            Err(LibMdbxError::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn raw_get<'a>(&'a self, db: Db, key: &[u8]) -> Result<Option<RawValue<'a>>, Self::Error> {
        let handle = self.handle(db)?;
        let result: Result<Option<Cow<'_, [u8]>>, _> = self.inner.get(handle.dbi(), key);
        result.map_err(MdbxError::from)
    }

    fn raw_cursor<'a>(&'a self, db: Db) -> Result<Self::Cursor<'a>, Self::Error> {
        let handle = self.handle(db)?;
        Ok(Cursor::new(self.inner.cursor(handle)?, db))
    }

    fn stat(&self, db: Db) -> Result<Stat, Self::Error> {
        let handle = self.handle(db)?;
        let stat = self.inner.db_stat(&handle)?;
        Ok(Stat {
            page_size: stat.page_size(),
            depth: stat.depth(),
            branch_pages: stat.branch_pages(),
            leaf_pages: stat.leaf_pages(),
            overflow_pages: stat.overflow_pages(),
            entries: stat.entries(),
        })
    }
}

impl KvWrite for Tx<Rw> {
    type CursorMut<'a>
        = Cursor<'a, Rw>
    where
        Self: 'a;

    fn create_db(&self, name: Option<&str>, config: DbConfig) -> Result<Db, Self::Error> {
        match self.inner.open_db(name) {
            Ok(existing) if compatible(existing.flags(), config) => {
                self.remember(name, existing);
                return Ok(Db::new(existing.dbi(), config));
            }
            Ok(_) => return Err(MdbxError::Incompatible),
            Err(LibMdbxError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }

        let handle = self.inner.create_db(name, flags_of(config))?;
        self.remember(name, handle);
        tracing::debug!(target: TRACING_TARGET, ?name, dbi = handle.dbi(), "created database");
        Ok(Db::new(handle.dbi(), config))
    }

    fn raw_put(
        &self,
        db: Db,
        key: &[u8],
        value: &[u8],
        precondition: Option<PutPrecondition>,
    ) -> Result<(), Self::Error> {
        check_pair(db, key, value)?;
        let handle = self.handle(db)?;
        self.inner.put(handle, key, value, write_flags(db, precondition))?;
        Ok(())
    }

    fn raw_delete(&self, db: Db, key: &[u8], value: Option<&[u8]>) -> Result<bool, Self::Error> {
        check_key(db, key)?;
        let handle = self.handle(db)?;
        let value = value.filter(|_| db.config().is_dupsort());
        Ok(self.inner.del(handle, key, value)?)
    }

    fn drop_db(&self, db: Db, close: bool) -> Result<(), Self::Error> {
        let handle = self.handle(db)?;
        let main = self.names.read().get(&db.id()).is_some_and(Option::is_none);
        if close && !main {
            // SAFETY: cursors borrow the transaction, so none outlives this
            // call, and the forgotten name keeps later calls from reopening
            // the dbi.
            unsafe { self.inner.drop_db(handle)? };
            self.names.write().remove(&db.id());
        } else {
            self.inner.clear_db(handle)?;
        }
        tracing::debug!(target: TRACING_TARGET, dbi = db.id(), close, "dropped database");
        Ok(())
    }

    fn raw_cursor_mut<'a>(&'a self, db: Db) -> Result<Self::CursorMut<'a>, Self::Error> {
        self.raw_cursor(db)
    }

    fn commit(self) -> Result<(), Self::Error> {
        let id = self.id;
        self.inner.commit()?;
        tracing::trace!(target: TRACING_TARGET, id, "committed");
        Ok(())
    }

    fn abort(self) {
        tracing::trace!(target: TRACING_TARGET, id = self.id, "aborted");
    }
}
