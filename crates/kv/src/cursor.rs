//! Cursor navigation by position, target and precision.
//!
//! [`Cursor`] turns the raw primitives of a [`KvCursor`] into three kinds of
//! movement:
//!
//! - absolute: the first or last key, or the first or last duplicate of the
//!   current key.
//! - relative: the next or previous pair, key, or duplicate.
//! - seek: exactly onto a key (or key and value), or onto the smallest entry
//!   at or after it.
//!
//! [`TypedCursor`] adds a [`Schema`] on top, so keys and values go in and come
//! out as decoded items.

use crate::{
    Schema,
    model::{
        DbConfig, KvCursor, KvCursorMut, KvReadError, PutPrecondition, RawKeyValue, StoreError,
    },
};
use core::marker::PhantomData;
use durable_codec::{ByteCoder, CodedItem};

/// An absolute cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsolutePosition {
    /// The smallest entry.
    First,
    /// The largest entry.
    Last,
}

/// A direction relative to the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativePosition {
    /// Towards larger entries.
    Next,
    /// Towards smaller entries.
    Previous,
}

/// What a move is constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Distinct keys. Duplicate runs are skipped.
    Key,
    /// Duplicates of the current key. Never crosses into another key.
    Value,
}

/// How closely a seek must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// The key (or key and value) must be present.
    Exactly,
    /// The smallest entry at or after the target is accepted.
    Nearby,
}

/// A cursor over one database of one transaction.
///
/// Every move returns `Ok(None)` when there is nothing to land on. The
/// returned bytes borrow the cursor and are gone by the next move.
#[derive(Debug)]
pub struct Cursor<C, E> {
    inner: C,
    config: DbConfig,
    _marker: PhantomData<fn() -> E>,
}

impl<C, E> Cursor<C, E> {
    /// Wrap a raw cursor over a database with the given configuration.
    pub const fn new(inner: C, config: DbConfig) -> Self {
        Self { inner, config, _marker: PhantomData }
    }

    /// The configuration of the database the cursor is bound to.
    pub const fn config(&self) -> DbConfig {
        self.config
    }

    /// Get a reference to the raw cursor.
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    /// Get a mutable reference to the raw cursor.
    pub const fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the wrapper and return the raw cursor.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C, E> Cursor<C, E>
where
    C: KvCursor<E>,
    E: KvReadError,
{
    /// Move to an absolute position.
    ///
    /// With [`Target::Key`] this is the first or last entry of the database.
    /// With [`Target::Value`] it is the first or last duplicate of the
    /// current key, which requires a positioned cursor on a duplicate
    /// database.
    pub fn move_to(
        &mut self,
        position: AbsolutePosition,
        target: Target,
    ) -> Result<Option<RawKeyValue<'_>>, E> {
        match (position, target) {
            (AbsolutePosition::First, Target::Key) => self.inner.first(),
            (AbsolutePosition::Last, Target::Key) => self.inner.last(),
            (AbsolutePosition::First, Target::Value) => {
                if self.inner.first_dup()?.is_none() {
                    return Ok(None);
                }
                self.inner.get_current()
            }
            (AbsolutePosition::Last, Target::Value) => {
                if self.inner.last_dup()?.is_none() {
                    return Ok(None);
                }
                self.inner.get_current()
            }
        }
    }

    /// Move relative to the current position.
    ///
    /// - no target: the next or previous pair, duplicates first.
    /// - [`Target::Key`]: the first duplicate of the next or previous key.
    /// - [`Target::Value`]: the next or previous duplicate of the current
    ///   key. Returns `None` at the edge of the duplicate run.
    ///
    /// A miss leaves the cursor where it was.
    pub fn step(
        &mut self,
        direction: RelativePosition,
        target: Option<Target>,
    ) -> Result<Option<RawKeyValue<'_>>, E> {
        match (direction, target) {
            (RelativePosition::Next, None) => self.inner.next(),
            (RelativePosition::Previous, None) => self.inner.prev(),
            (RelativePosition::Next, Some(Target::Key)) => self.inner.next_nodup(),
            (RelativePosition::Previous, Some(Target::Key)) => {
                if self.inner.prev_nodup()?.is_none() {
                    return Ok(None);
                }
                // prev_nodup lands on the last duplicate
                if self.config.is_dupsort() {
                    self.inner.first_dup()?;
                }
                self.inner.get_current()
            }
            (RelativePosition::Next, Some(Target::Value)) => self.inner.next_dup(),
            (RelativePosition::Previous, Some(Target::Value)) => self.inner.prev_dup(),
        }
    }

    /// Seek to a key, or to a key and one of its duplicates.
    ///
    /// A value target orders entries by key, then by value. Seeking with a
    /// value on a database without duplicates fails with
    /// [`StoreError::NotDupSort`].
    pub fn seek(
        &mut self,
        precision: Precision,
        key: &[u8],
        value: Option<&[u8]>,
    ) -> Result<Option<RawKeyValue<'_>>, E> {
        let Some(value) = value else {
            return match precision {
                Precision::Exactly => self.inner.set(key),
                Precision::Nearby => self.inner.set_range(key),
            };
        };
        if !self.config.is_dupsort() {
            return Err(StoreError::NotDupSort.into());
        }
        if precision == Precision::Exactly {
            return self.inner.get_both(key, value);
        }

        let same_key = match self.inner.set_range(key)? {
            Some((found, _)) => found.as_ref() == key,
            None => return Ok(None),
        };
        if !same_key {
            return self.inner.get_current();
        }
        if self.inner.get_both_range(key, value)?.is_some() {
            return self.inner.get_current();
        }
        // every duplicate of `key` sorts before `value`
        if self.inner.set(key)?.is_none() {
            return Ok(None);
        }
        self.inner.next_nodup()
    }

    /// The entry at the current position, or `None` if the cursor is
    /// unpositioned or its entry was deleted.
    pub fn current(&mut self) -> Result<Option<RawKeyValue<'_>>, E> {
        self.inner.get_current()
    }

    /// Number of values stored under the current key, or `None` if the
    /// cursor is not on a key.
    pub fn duplicate_count(&mut self) -> Result<Option<usize>, E> {
        self.inner.count()
    }
}

impl<C, E> Cursor<C, E>
where
    C: KvCursorMut<E>,
    E: KvReadError,
{
    /// Store a pair and move onto it.
    ///
    /// Without `overwrite`, an existing key (or, on a duplicate database, an
    /// existing pair) fails with [`StoreError::KeyExists`] and nothing is
    /// written.
    pub fn put(&mut self, key: &[u8], value: &[u8], overwrite: bool) -> Result<(), E> {
        let precondition = (!overwrite).then_some(if self.config.is_dupsort() {
            PutPrecondition::UniqueKeyValue
        } else {
            PutPrecondition::UniqueKey
        });
        self.inner.put(key, value, precondition)
    }

    /// Store a pair with an explicit precondition.
    pub fn put_with(
        &mut self,
        key: &[u8],
        value: &[u8],
        precondition: Option<PutPrecondition>,
    ) -> Result<(), E> {
        self.inner.put(key, value, precondition)
    }

    /// Delete the current duplicate ([`Target::Value`]) or every duplicate of
    /// the current key ([`Target::Key`]).
    ///
    /// The position afterwards is only good for relative moves.
    pub fn delete(&mut self, target: Target) -> Result<(), E> {
        match target {
            Target::Value => self.inner.del(),
            Target::Key => self.inner.del_all_dups(),
        }
    }
}

// ============================================================================
// TypedCursor
// ============================================================================

/// A [`Cursor`] that encodes and decodes through a [`Schema`].
#[derive(Debug)]
pub struct TypedCursor<'s, C, K, V, E> {
    cursor: Cursor<C, E>,
    schema: &'s Schema<K, V>,
}

impl<'s, C, K, V, E> TypedCursor<'s, C, K, V, E> {
    /// Wrap a cursor.
    pub const fn new(cursor: Cursor<C, E>, schema: &'s Schema<K, V>) -> Self {
        Self { cursor, schema }
    }

    /// The untyped cursor.
    pub const fn raw(&mut self) -> &mut Cursor<C, E> {
        &mut self.cursor
    }

    /// Consume the wrapper and return the untyped cursor.
    pub fn into_raw(self) -> Cursor<C, E> {
        self.cursor
    }
}

type Entry<K, V> = (CodedItem<K>, CodedItem<V>);

fn decode<K, V, E>(
    schema: &Schema<K, V>,
    found: Option<RawKeyValue<'_>>,
) -> Result<Option<Entry<K, V>>, E>
where
    K: ByteCoder,
    V: ByteCoder,
    E: KvReadError,
{
    found.map(|pair| schema.decode_pair(pair)).transpose().map_err(Into::into)
}

impl<C, K, V, E> TypedCursor<'_, C, K, V, E>
where
    C: KvCursor<E>,
    K: ByteCoder,
    V: ByteCoder,
    E: KvReadError,
{
    /// Typed [`Cursor::move_to`].
    pub fn move_to(
        &mut self,
        position: AbsolutePosition,
        target: Target,
    ) -> Result<Option<Entry<K, V>>, E> {
        decode(self.schema, self.cursor.move_to(position, target)?)
    }

    /// The first entry.
    pub fn first(&mut self) -> Result<Option<Entry<K, V>>, E> {
        self.move_to(AbsolutePosition::First, Target::Key)
    }

    /// The last entry.
    pub fn last(&mut self) -> Result<Option<Entry<K, V>>, E> {
        self.move_to(AbsolutePosition::Last, Target::Key)
    }

    /// Typed [`Cursor::step`].
    pub fn step(
        &mut self,
        direction: RelativePosition,
        target: Option<Target>,
    ) -> Result<Option<Entry<K, V>>, E> {
        decode(self.schema, self.cursor.step(direction, target)?)
    }

    /// Typed [`Cursor::seek`].
    pub fn seek(
        &mut self,
        precision: Precision,
        key: &CodedItem<K>,
        value: Option<&CodedItem<V>>,
    ) -> Result<Option<Entry<K, V>>, E> {
        let schema = self.schema;
        let key = schema.encode_key(key)?;
        let value = value.map(|value| schema.encode_value(value)).transpose()?;
        decode(schema, self.cursor.seek(precision, &key, value.as_deref())?)
    }

    /// Typed [`Cursor::current`].
    pub fn current(&mut self) -> Result<Option<Entry<K, V>>, E> {
        decode(self.schema, self.cursor.current()?)
    }

    /// Number of values stored under the current key.
    pub fn duplicate_count(&mut self) -> Result<Option<usize>, E> {
        self.cursor.duplicate_count()
    }
}

impl<C, K, V, E> TypedCursor<'_, C, K, V, E>
where
    C: KvCursorMut<E>,
    K: ByteCoder,
    V: ByteCoder,
    E: KvReadError,
{
    /// Typed [`Cursor::put`].
    pub fn put(
        &mut self,
        key: &CodedItem<K>,
        value: &CodedItem<V>,
        overwrite: bool,
    ) -> Result<(), E> {
        let key = self.schema.encode_key(key)?;
        let value = self.schema.encode_value(value)?;
        self.cursor.put(&key, &value, overwrite)
    }

    /// Typed [`Cursor::delete`].
    pub fn delete(&mut self, target: Target) -> Result<(), E> {
        self.cursor.delete(target)
    }
}
