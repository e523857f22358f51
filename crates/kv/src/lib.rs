//! Typed, ordered dictionaries over a transactional sorted key-value store.
//!
//! This crate layers ordered-collection semantics on top of an LMDB-style
//! engine: bidirectional traversal, exact and nearest seeks, duplicate
//! values, comparable positions, and map-like updates. Keys and values are
//! encoded with [`durable_codec`] codecs.
//!
//! # Quick Start
//!
//! ```
//! use durable_kv::{Database, codable_schema, mem::MemKv, model::{DbConfig, KvEnv}};
//!
//! let env = MemKv::new();
//! env.write(|txn| {
//!     let sounds = Database::create(
//!         txn,
//!         Some("sounds"),
//!         DbConfig::new(),
//!         codable_schema::<String, String>(),
//!     )?;
//!     let dict = sounds.dict(txn);
//!     dict.set(&"cat".to_string(), Some(&"meow".to_string()))?;
//!     dict.set(&"dog".to_string(), Some(&"bark".to_string()))?;
//!
//!     let first = dict.first()?;
//!     assert_eq!(first, Some(("cat".to_string(), "meow".to_string())));
//!     Ok::<_, durable_kv::mem::MemKvError>(())
//! })
//! .unwrap();
//! ```
//!
//! # Layers
//!
//! ```text
//! model::KvEnv / KvRead / KvWrite  ← engine interface (transactions, raw bytes)
//!   └─ model::KvCursor             ← raw cursor primitives
//!        └─ Cursor                 ← moves by position, target and precision
//!             ├─ TypedCursor       ← the same, through a Schema
//!             └─ Index             ← comparable position with an end sentinel
//!                  └─ SortedDict   ← map and ordered-collection view
//! ```
//!
//! [`Database`] ties a raw [`model::Db`] handle to a [`Schema`], and hands
//! out cursors, [`ValueCell`]s and [`SortedDict`] views for a transaction.
//!
//! ## Errors
//!
//! Not-found is never an error. Lookups, seeks and moves return `Ok(None)`.
//! Engine and codec failures are propagated as the engine's error type,
//! which converts into [`model::StoreError`]. Misuse (a write transaction
//! used from another thread, comparing indices of different transactions,
//! stepping past the end index) panics.
//!
//! # Feature Flags
//!
//! - **`in-memory`**: Enables the [`mem`] module, providing an in-memory
//!   [`KvEnv`] backend.
//! - **`test-utils`**: Enables the [`conformance`] module with backend
//!   conformance tests. Implies `in-memory`.
//!
//! [`KvEnv`]: model::KvEnv

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

/// Conformance tests for storage backends.
#[cfg(any(test, feature = "test-utils"))]
pub mod conformance;

mod cell;
pub use cell::ValueCell;

mod cursor;
pub use cursor::{AbsolutePosition, Cursor, Precision, RelativePosition, Target, TypedCursor};

mod database;
pub use database::Database;

mod dict;
pub use dict::{Iter, SortedDict};

mod index;
pub use index::Index;

pub mod model;

mod schema;
pub use schema::{Schema, codable_schema};

#[cfg(any(test, feature = "in-memory"))]
pub mod mem;
