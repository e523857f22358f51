//! MDBX storage engine for `durable-kv`, built on [`signet_libmdbx`].
//!
//! ## Notes on implementation
//!
//! [`DatabaseEnv`] wraps an MDBX [`Environment`] and implements the
//! [`KvEnv`] trait. Read-only transactions are [`Tx<Ro>`] and read-write
//! transactions are [`Tx<Rw>`]. Neither can leave the thread that began it,
//! which the compiler enforces for the writer. [`DatabaseArguments`]
//! configures the geometry, sync mode and limits of the environment.
//!
//! ### Database handles
//!
//! A [`Db`] handle carries the MDBX dbi and the configuration recovered from
//! the database flags. The environment remembers the name behind every dbi it
//! has opened, and each transaction reopens handles by that name, so a handle
//! from one transaction keeps working in later ones.
//!
//! ### Cursors
//!
//! [`Cursor`] remembers the pair it sits on and repositions the MDBX cursor
//! from it before every relative move. Misses, refused puts and deletes
//! therefore leave it where the [`KvCursor`] contract says, rather than where
//! MDBX happens to park it.
//!
//! Rough Edges:
//! - The name cache does not respect aborted transactions. A handle to a
//!   database created in an aborted transaction fails with
//!   [`MdbxError::UnknownDb`] instead of naming a missing database.
//! - Integer duplicates are always created `DUP_FIXED`, so reopening such a
//!   database reports a fixed-size configuration.
//!
//! [`Db`]: durable_kv::model::Db
//! [`KvCursor`]: durable_kv::model::KvCursor

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use durable_kv::model::KvEnv;
use parking_lot::RwLock;
use signet_libmdbx::{
    Environment, EnvironmentFlags, Geometry, Mode, Ro, Rw, SyncMode, ffi,
    sys::{HandleSlowReadersReturnCode, PageSize},
};
use std::{collections::HashMap, ops::Range, path::Path, sync::Arc};

mod cursor;
pub use cursor::{Cursor, CursorRo, CursorRw};

mod db_info;
pub use db_info::{DbNames, config_of, flags_of};

mod error;
pub use error::MdbxError;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod tx;
pub use tx::Tx;

/// 1 KB in bytes
pub const KILOBYTE: usize = 1024;
/// 1 MB in bytes
pub const MEGABYTE: usize = KILOBYTE * 1024;
/// 1 GB in bytes
pub const GIGABYTE: usize = MEGABYTE * 1024;
/// 1 TB in bytes
pub const TERABYTE: usize = GIGABYTE * 1024;

/// Maximum key size, and maximum value size in duplicate databases. MDBX
/// allows more on large pages; this keeps every page size alike.
pub const MAX_KEY_SIZE: usize = 511;

/// MDBX allows up to 32767 readers (`MDBX_READERS_LIMIT`), but we limit it to slightly below that
const DEFAULT_MAX_READERS: u64 = 32_000;

/// Default maximum number of named databases.
const DEFAULT_MAX_DBS: usize = 64;

/// Space that a read-only transaction can occupy until the warning is emitted.
/// See [`signet_libmdbx::EnvironmentBuilder::set_handle_slow_readers`] for more
/// information.
const MAX_SAFE_READER_SPACE: usize = 10 * GIGABYTE;

const TRACING_TARGET: &str = "durable_kv_mdbx";

/// Environment used when opening a MDBX environment. Read-only or Read-write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DatabaseEnvKind {
    /// Read-only MDBX environment.
    RO,
    /// Read-write MDBX environment.
    RW,
}

impl DatabaseEnvKind {
    /// Returns `true` if the environment is read-write.
    pub const fn is_rw(&self) -> bool {
        matches!(self, Self::RW)
    }
}

/// Arguments for database initialization.
#[derive(Clone, Debug)]
pub struct DatabaseArguments {
    /// Database geometry settings.
    geometry: Geometry<Range<usize>>,
    /// Open environment in exclusive mode, or return `MDBX_BUSY` if another
    /// process uses it. If [None], the default value is used.
    exclusive: Option<bool>,
    /// MDBX allows up to 32767 readers (`MDBX_READERS_LIMIT`). This arg is to configure the max
    /// readers.
    max_readers: Option<u64>,
    /// Maximum number of named databases.
    max_dbs: usize,
    /// Defines the synchronization strategy used when writing data to disk.
    ///
    /// - [`SyncMode::Durable`]: every commit is flushed before it returns.
    /// - [`SyncMode::SafeNoSync`]: skips some fsyncs. The database stays
    ///   intact, but the latest commits may be lost on a system crash.
    sync_mode: SyncMode,
}

impl Default for DatabaseArguments {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseArguments {
    /// Create new database arguments with the default geometry.
    pub const fn new() -> Self {
        Self {
            geometry: Geometry {
                size: Some(0..(8 * TERABYTE)),
                growth_step: Some(4 * GIGABYTE as isize),
                shrink_threshold: Some(0),
                page_size: None,
            },
            exclusive: None,
            max_readers: None,
            max_dbs: DEFAULT_MAX_DBS,
            sync_mode: SyncMode::Durable,
        }
    }

    /// Sets the upper size limit of the db environment, the maximum database size in bytes.
    pub const fn with_geometry_max_size(mut self, max_size: Option<usize>) -> Self {
        if let Some(max_size) = max_size {
            self.geometry.size = Some(0..max_size);
        }
        self
    }

    /// Sets the database page size value.
    pub const fn with_geometry_page_size(mut self, page_size: Option<usize>) -> Self {
        if let Some(size) = page_size {
            self.geometry.page_size = Some(PageSize::Set(size));
        }

        self
    }

    /// Sets the database sync mode.
    pub const fn with_sync_mode(mut self, sync_mode: Option<SyncMode>) -> Self {
        if let Some(sync_mode) = sync_mode {
            self.sync_mode = sync_mode;
        }

        self
    }

    /// Configures the database growth step in bytes.
    pub const fn with_growth_step(mut self, growth_step: Option<usize>) -> Self {
        if let Some(growth_step) = growth_step {
            self.geometry.growth_step = Some(growth_step as isize);
        }
        self
    }

    /// Set the mdbx exclusive flag.
    pub const fn with_exclusive(mut self, exclusive: Option<bool>) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Set `max_readers` flag.
    pub const fn with_max_readers(mut self, max_readers: Option<u64>) -> Self {
        self.max_readers = max_readers;
        self
    }

    /// Set the maximum number of named databases.
    pub const fn with_max_dbs(mut self, max_dbs: Option<usize>) -> Self {
        if let Some(max_dbs) = max_dbs {
            self.max_dbs = max_dbs;
        }
        self
    }

    /// Open a read-only database at `path` with the current arguments
    pub fn open_ro(self, path: &Path) -> Result<DatabaseEnv, MdbxError> {
        DatabaseEnv::open(path, DatabaseEnvKind::RO, self)
    }

    /// Open a read-write database at `path` with the current arguments
    pub fn open_rw(self, path: &Path) -> Result<DatabaseEnv, MdbxError> {
        DatabaseEnv::open(path, DatabaseEnvKind::RW, self)
    }
}

/// MDBX database environment. Wraps the low-level [Environment], and
/// implements the [`KvEnv`] trait.
#[derive(Debug)]
pub struct DatabaseEnv {
    /// Libmdbx environment.
    inner: Environment,
    /// Names of the databases opened so far, by dbi.
    names: DbNames,
}

impl DatabaseEnv {
    /// Opens the database at the specified path with the given `EnvKind`.
    pub fn open(
        path: &Path,
        kind: DatabaseEnvKind,
        args: DatabaseArguments,
    ) -> Result<Self, MdbxError> {
        let mut inner_env = Environment::builder();

        let mode = match kind {
            DatabaseEnvKind::RO => Mode::ReadOnly,
            DatabaseEnvKind::RW => {
                // enable writemap mode in RW mode
                inner_env.write_map();
                Mode::ReadWrite { sync_mode: args.sync_mode }
            }
        };

        inner_env.set_max_dbs(args.max_dbs);
        inner_env.set_geometry(args.geometry);

        extern "C" fn handle_slow_readers(
            _env: *const ffi::MDBX_env,
            _txn: *const ffi::MDBX_txn,
            process_id: ffi::mdbx_pid_t,
            thread_id: ffi::mdbx_tid_t,
            read_txn_id: u64,
            gap: std::ffi::c_uint,
            space: usize,
            retry: std::ffi::c_int,
        ) -> HandleSlowReadersReturnCode {
            if space > MAX_SAFE_READER_SPACE {
                tracing::warn!(
                    target: TRACING_TARGET,
                    ?process_id,
                    ?thread_id,
                    ?read_txn_id,
                    ?gap,
                    ?space,
                    ?retry,
                    "long-lived read transaction grows the database file"
                )
            }

            HandleSlowReadersReturnCode::ProceedWithoutKillingReader
        }
        inner_env.set_handle_slow_readers(handle_slow_readers);

        inner_env.set_flags(EnvironmentFlags {
            mode,
            coalesce: true,
            exclusive: args.exclusive.unwrap_or_default(),
            ..Default::default()
        });
        inner_env.set_max_readers(args.max_readers.unwrap_or(DEFAULT_MAX_READERS));

        let inner = inner_env.open(path)?;
        tracing::debug!(target: TRACING_TARGET, ?path, ?kind, "opened environment");
        Ok(Self { inner, names: Arc::new(RwLock::new(HashMap::new())) })
    }

    /// Start a new read-only transaction.
    pub fn tx(&self) -> Result<Tx<Ro>, MdbxError> {
        Tx::new(self.inner.begin_ro_unsync()?, self.names.clone())
    }

    /// Start a new read-write transaction. Blocks while another thread holds
    /// the write transaction.
    pub fn tx_rw(&self) -> Result<Tx<Rw>, MdbxError> {
        Tx::new(self.inner.begin_rw_unsync()?, self.names.clone())
    }

    /// The underlying libmdbx environment.
    pub const fn inner(&self) -> &Environment {
        &self.inner
    }
}

impl KvEnv for DatabaseEnv {
    type Error = MdbxError;
    type RoTx = Tx<Ro>;
    type RwTx = Tx<Rw>;

    fn reader(&self) -> Result<Self::RoTx, Self::Error> {
        self.tx()
    }

    fn writer(&self) -> Result<Self::RwTx, Self::Error> {
        self.tx_rw()
    }

    fn max_key_size(&self) -> usize {
        MAX_KEY_SIZE
    }
}
