//! The storage-engine interface.
//!
//! Everything above this module (cursors, indices, dictionaries) is written
//! against these traits, never against a concrete engine. The primary traits
//! are:
//!
//! - [`KvEnv`]: the environment, a factory for read and write transactions.
//! - [`KvRead`]: a transaction with read access. Opens databases, reads raw
//!   values and creates raw cursors.
//! - [`KvWrite`]: a transaction with write access. Creates and drops
//!   databases, writes and deletes raw entries, and commits or aborts.
//! - [`KvCursor`] and [`KvCursorMut`]: the raw cursor primitives of an
//!   LMDB-style engine.
//!
//! Raw reads return [`RawValue`]s. These borrow either from the engine or from
//! the cursor, and the borrow checker keeps them from outliving the
//! transaction or the next cursor move.
//!
//! ## Errors
//!
//! Not-found is never an error: every lookup and cursor move returns
//! `Ok(None)` when nothing is there. Engine errors implement [`KvReadError`],
//! which erases them into a [`StoreError`] on demand and lets generic callers
//! detect the "already exists" condition of insert-only writes.

mod config;
pub use config::{Db, DbConfig, DuplicateConfig, PutPrecondition, SortOrder, Stat};

mod cursor;
pub use cursor::{KvCursor, KvCursorMut};

mod error;
pub use error::{KvReadError, StoreError, StoreResult};

mod thread;
pub use thread::ThreadAffinity;

mod traits;
pub use traits::{KvEnv, KvRead, KvWrite};

use std::borrow::Cow;

/// A raw key-value pair.
pub type RawKeyValue<'a> = (Cow<'a, [u8]>, RawValue<'a>);

/// A raw value.
pub type RawValue<'a> = Cow<'a, [u8]>;
