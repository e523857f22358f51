//! Cursor wrapper for libmdbx.

use crate::{
    MdbxError,
    db_info::{check_pair, write_flags},
};
use durable_kv::model::{
    Db, KvCursor, KvCursorMut, PutPrecondition, RawKeyValue, RawValue, StoreError,
};
use signet_libmdbx::{ReadResult, Ro, Rw, TransactionKind, tx::WriteMarker};
use std::borrow::Cow;

/// Read only cursor.
pub type CursorRo<'a> = Cursor<'a, Ro>;

/// Read write cursor.
pub type CursorRw<'a> = Cursor<'a, Rw>;

/// An owned copy of the pair the cursor sits on.
type Anchor = (Vec<u8>, Vec<u8>);

type Inner<'a, K> = signet_libmdbx::Cursor<'a, K>;

/// Cursor wrapper over a database of a [`Tx`].
///
/// MDBX leaves a cursor in an unspecified place after a miss, a refused put
/// or a delete. This wrapper keeps its own copy of the pair it sits on and
/// repositions the MDBX cursor from it before every relative move, so those
/// moves behave the same whether or not the pair is still stored.
///
/// [`Tx`]: crate::Tx
pub struct Cursor<'a, K: TransactionKind> {
    /// Inner `libmdbx` cursor.
    inner: Inner<'a, K>,
    db: Db,
    position: Option<Anchor>,
}

impl<K: TransactionKind> std::fmt::Debug for Cursor<'_, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("db", &self.db)
            .field("positioned", &self.position.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a, K: TransactionKind> Cursor<'a, K> {
    /// Creates a new unpositioned `Cursor` wrapping the given `libmdbx`
    /// cursor.
    pub(crate) const fn new(inner: Inner<'a, K>, db: Db) -> Self {
        Self { inner, db, position: None }
    }

    /// The database this cursor traverses.
    pub const fn db(&self) -> Db {
        self.db
    }

    /// Absolute move. Unpositions on a miss.
    fn land(&mut self, found: Option<Anchor>) -> Option<RawKeyValue<'_>> {
        self.position = found;
        self.pair()
    }

    /// Relative move. Keeps the position on a miss.
    fn advance(&mut self, found: Option<Anchor>) -> Option<RawKeyValue<'_>> {
        if found.is_none() {
            return None;
        }
        self.position = found;
        self.pair()
    }

    fn pair(&self) -> Option<RawKeyValue<'_>> {
        self.position
            .as_ref()
            .map(|(key, value)| (Cow::Borrowed(key.as_slice()), Cow::Borrowed(value.as_slice())))
    }

    const fn dupsort(&self) -> bool {
        self.db.config().is_dupsort()
    }

    fn require_dupsort(&self) -> Result<(), MdbxError> {
        if self.dupsort() { Ok(()) } else { Err(StoreError::NotDupSort.into()) }
    }
}

// ============================================================================
// Positioning helpers
// ============================================================================

fn anchored(position: &Option<Anchor>) -> Result<&Anchor, MdbxError> {
    position.as_ref().ok_or(MdbxError::Unpositioned)
}

/// Pair a value-only result with the key it was looked up under.
fn keyed(key: &[u8], value: Option<Vec<u8>>) -> Option<Anchor> {
    value.map(|value| (key.to_vec(), value))
}

/// Put `inner` on exactly the anchor. Without duplicates only the key has
/// to match.
fn reseek<K: TransactionKind>(
    inner: &mut Inner<'_, K>,
    dupsort: bool,
    (key, value): &Anchor,
) -> ReadResult<bool> {
    let found =
        if dupsort { inner.get_both::<()>(key, value)? } else { inner.set::<()>(key)? };
    Ok(found.is_some())
}

/// Put `inner` on the smallest pair after an anchor that is no longer
/// stored.
fn successor<K: TransactionKind>(
    inner: &mut Inner<'_, K>,
    dupsort: bool,
    (key, value): &Anchor,
) -> ReadResult<Option<Anchor>> {
    if dupsort {
        if let Some(found) = inner.get_both_range::<Vec<u8>>(key, value)? {
            return Ok(Some((key.clone(), found)));
        }
    }
    match inner.set_range::<Vec<u8>, Vec<u8>>(key)? {
        // every remaining duplicate of the key sorts before the anchor
        Some((found, _)) if found == *key => inner.next_nodup(),
        other => Ok(other),
    }
}

impl<K: TransactionKind> KvCursor<MdbxError> for Cursor<'_, K> {
    fn first<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let found = self.inner.first()?;
        Ok(self.land(found))
    }

    fn last<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let found = self.inner.last()?;
        Ok(self.land(found))
    }

    fn first_dup<'b>(&'b mut self) -> Result<Option<RawValue<'b>>, MdbxError> {
        self.require_dupsort()?;
        let (key, _) = anchored(&self.position)?;
        let found = match self.inner.set::<()>(key)? {
            Some(()) => keyed(key, self.inner.first_dup()?),
            None => None,
        };
        Ok(self.advance(found).map(|(_, value)| value))
    }

    fn last_dup<'b>(&'b mut self) -> Result<Option<RawValue<'b>>, MdbxError> {
        self.require_dupsort()?;
        let (key, _) = anchored(&self.position)?;
        let found = match self.inner.set::<()>(key)? {
            Some(()) => keyed(key, self.inner.last_dup()?),
            None => None,
        };
        Ok(self.advance(found).map(|(_, value)| value))
    }

    fn next<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let dupsort = self.dupsort();
        let found = match &self.position {
            None => self.inner.first()?,
            Some(anchor) if reseek(&mut self.inner, dupsort, anchor)? => self.inner.next()?,
            Some(anchor) => successor(&mut self.inner, dupsort, anchor)?,
        };
        Ok(self.advance(found))
    }

    fn prev<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let dupsort = self.dupsort();
        let found = match &self.position {
            None => self.inner.last()?,
            Some(anchor) if reseek(&mut self.inner, dupsort, anchor)? => self.inner.prev()?,
            Some(anchor) => match successor(&mut self.inner, dupsort, anchor)? {
                Some(_) => self.inner.prev()?,
                None => self.inner.last()?,
            },
        };
        Ok(self.advance(found))
    }

    fn next_dup<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        self.require_dupsort()?;
        let anchor = anchored(&self.position)?;
        let found = if reseek(&mut self.inner, true, anchor)? {
            self.inner.next_dup()?
        } else {
            let (key, value) = anchor;
            keyed(key, self.inner.get_both_range(key, value)?)
        };
        Ok(self.advance(found))
    }

    fn prev_dup<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        self.require_dupsort()?;
        let anchor = anchored(&self.position)?;
        let (key, value) = anchor;
        let found = if reseek(&mut self.inner, true, anchor)? {
            self.inner.prev_dup()?
        } else if self.inner.get_both_range::<()>(key, value)?.is_some() {
            self.inner.prev_dup()?
        } else if self.inner.set::<()>(key)?.is_some() {
            keyed(key, self.inner.last_dup()?)
        } else {
            None
        };
        Ok(self.advance(found))
    }

    fn next_nodup<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let found = match &self.position {
            None => self.inner.first()?,
            Some((key, _)) => match self.inner.set_range::<Vec<u8>, Vec<u8>>(key)? {
                Some((found, _)) if found == *key => self.inner.next_nodup()?,
                other => other,
            },
        };
        Ok(self.advance(found))
    }

    fn prev_nodup<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let found = match &self.position {
            None => self.inner.last()?,
            Some((key, _)) => match self.inner.set_range::<Vec<u8>, ()>(key)? {
                Some((found, ())) if found == *key => self.inner.prev_nodup()?,
                Some(_) => self.inner.prev()?,
                None => self.inner.last()?,
            },
        };
        Ok(self.advance(found))
    }

    fn set<'b>(&'b mut self, key: &[u8]) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let found = self.inner.set_key(key)?;
        Ok(self.land(found))
    }

    fn set_range<'b>(&'b mut self, key: &[u8]) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let found = self.inner.set_range(key)?;
        Ok(self.land(found))
    }

    fn get_both<'b>(
        &'b mut self,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let found = if self.dupsort() {
            keyed(key, self.inner.get_both(key, value)?)
        } else {
            self.inner
                .set_key::<Vec<u8>, Vec<u8>>(key)?
                .filter(|(_, stored)| stored.as_slice() == value)
        };
        Ok(self.land(found))
    }

    fn get_both_range<'b>(
        &'b mut self,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let found = if self.dupsort() {
            keyed(key, self.inner.get_both_range(key, value)?)
        } else {
            let order = self.db.config().value_order();
            self.inner
                .set_key::<Vec<u8>, Vec<u8>>(key)?
                .filter(|(_, stored)| order.compare(stored, value).is_ge())
        };
        Ok(self.land(found))
    }

    fn get_current<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MdbxError> {
        let Some((key, value)) = &self.position else {
            return Ok(None);
        };
        let found = if self.dupsort() {
            keyed(key, self.inner.get_both(key, value)?)
        } else {
            self.inner.set_key(key)?
        };
        Ok(self.advance(found))
    }

    fn count(&mut self) -> Result<Option<usize>, MdbxError> {
        let Some((key, _)) = &self.position else {
            return Ok(None);
        };
        if self.inner.set::<()>(key)?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.inner.dup_count()?))
    }
}

impl<K: TransactionKind + WriteMarker> KvCursorMut<MdbxError> for Cursor<'_, K> {
    fn put(
        &mut self,
        key: &[u8],
        value: &[u8],
        precondition: Option<PutPrecondition>,
    ) -> Result<(), MdbxError> {
        check_pair(self.db, key, value)?;
        self.inner.put(key, value, write_flags(self.db, precondition))?;
        self.position = Some((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn del(&mut self) -> Result<(), MdbxError> {
        let dupsort = self.dupsort();
        let anchor = anchored(&self.position)?;
        if reseek(&mut self.inner, dupsort, anchor)? {
            self.inner.del()?;
        }
        Ok(())
    }

    fn del_all_dups(&mut self) -> Result<(), MdbxError> {
        let (key, _) = anchored(&self.position)?;
        if self.inner.set::<()>(key)?.is_none() {
            return Ok(());
        }
        if self.dupsort() {
            self.inner.del_all_dups()?;
        } else {
            self.inner.del()?;
        }
        Ok(())
    }
}
