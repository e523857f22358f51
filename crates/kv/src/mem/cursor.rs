use super::{MemKvError, MemKvRwTx, Snapshot, table::Table};
use crate::{
    mem::table::Pos,
    model::{
        Db, KvCursor, KvCursorMut, KvWrite, PutPrecondition, RawKeyValue, RawValue, StoreError,
    },
};
use std::borrow::Cow;

/// An owned copy of the pair the cursor sits on.
type Anchor = (Vec<u8>, Vec<u8>);

enum Source<'a> {
    Read(&'a Snapshot),
    Write(&'a MemKvRwTx),
}

/// Cursor over a database of a [`MemKv`] transaction.
///
/// The cursor remembers the pair it sits on rather than an index, so it stays
/// valid while the owning write transaction modifies the database. Each move
/// searches relative to that pair.
///
/// Cursors of read-only transactions panic on any write.
///
/// [`MemKv`]: crate::mem::MemKv
pub struct MemKvCursor<'a> {
    source: Source<'a>,
    db: Db,
    position: Option<Anchor>,
}

impl core::fmt::Debug for MemKvCursor<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemKvCursor")
            .field("db", &self.db)
            .field("positioned", &self.position.is_some())
            .finish()
    }
}

impl<'a> MemKvCursor<'a> {
    pub(crate) const fn read(snapshot: &'a Snapshot, db: Db) -> Self {
        Self { source: Source::Read(snapshot), db, position: None }
    }

    pub(crate) const fn write(tx: &'a MemKvRwTx, db: Db) -> Self {
        Self { source: Source::Write(tx), db, position: None }
    }

    /// Run `f` against the current state of the table.
    fn inspect<T>(&self, f: impl FnOnce(&Table) -> T) -> Result<T, MemKvError> {
        match self.source {
            Source::Read(snapshot) => Ok(f(snapshot.table(self.db)?)),
            Source::Write(tx) => {
                let state = tx.state();
                Ok(f(state.table(self.db)?))
            }
        }
    }

    /// Copy out the pair found by `f`.
    fn locate(&self, f: impl FnOnce(&Table) -> Option<Pos>) -> Result<Option<Anchor>, MemKvError> {
        self.inspect(|table| {
            f(table).map(|pos| {
                let (key, value) = table.pair(pos);
                (key.to_vec(), value.to_vec())
            })
        })
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

    fn require_dupsort(&self) -> Result<(), MemKvError> {
        if self.db.config().is_dupsort() {
            Ok(())
        } else {
            Err(StoreError::NotDupSort.into())
        }
    }

    fn anchor(&self) -> Result<&Anchor, MemKvError> {
        self.position.as_ref().ok_or(MemKvError::Unpositioned)
    }

    #[track_caller]
    fn writer(&self) -> &'a MemKvRwTx {
        match self.source {
            Source::Write(tx) => tx,
            Source::Read(_) => panic!("cursor of a read-only transaction cannot write"),
        }
    }
}

impl KvCursor<MemKvError> for MemKvCursor<'_> {
    fn first<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = self.locate(Table::first)?;
        Ok(self.land(found))
    }

    fn last<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = self.locate(Table::last)?;
        Ok(self.land(found))
    }

    fn first_dup<'b>(&'b mut self) -> Result<Option<RawValue<'b>>, MemKvError> {
        self.require_dupsort()?;
        let (key, _) = self.anchor()?;
        let found = self.locate(|table| table.first_dup(key))?;
        Ok(self.advance(found).map(|(_, value)| value))
    }

    fn last_dup<'b>(&'b mut self) -> Result<Option<RawValue<'b>>, MemKvError> {
        self.require_dupsort()?;
        let (key, _) = self.anchor()?;
        let found = self.locate(|table| table.last_dup(key))?;
        Ok(self.advance(found).map(|(_, value)| value))
    }

    fn next<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = match &self.position {
            Some((key, value)) => self.locate(|table| table.after(key, value))?,
            None => self.locate(Table::first)?,
        };
        Ok(self.advance(found))
    }

    fn prev<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = match &self.position {
            Some((key, value)) => self.locate(|table| table.before(key, value))?,
            None => self.locate(Table::last)?,
        };
        Ok(self.advance(found))
    }

    fn next_dup<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        self.require_dupsort()?;
        let (key, value) = self.anchor()?;
        let found = self.locate(|table| table.next_dup(key, value))?;
        Ok(self.advance(found))
    }

    fn prev_dup<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        self.require_dupsort()?;
        let (key, value) = self.anchor()?;
        let found = self.locate(|table| table.prev_dup(key, value))?;
        Ok(self.advance(found))
    }

    fn next_nodup<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = match &self.position {
            Some((key, _)) => self.locate(|table| table.next_key(key))?,
            None => self.locate(Table::first)?,
        };
        Ok(self.advance(found))
    }

    fn prev_nodup<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = match &self.position {
            Some((key, _)) => self.locate(|table| table.prev_key(key))?,
            None => self.locate(Table::last)?,
        };
        Ok(self.advance(found))
    }

    fn set<'b>(&'b mut self, key: &[u8]) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = self.locate(|table| table.set(key))?;
        Ok(self.land(found))
    }

    fn set_range<'b>(&'b mut self, key: &[u8]) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = self.locate(|table| table.set_range(key))?;
        Ok(self.land(found))
    }

    fn get_both<'b>(
        &'b mut self,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = self.locate(|table| table.exact(key, value))?;
        Ok(self.land(found))
    }

    fn get_both_range<'b>(
        &'b mut self,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let found = self.locate(|table| table.both_range(key, value))?;
        Ok(self.land(found))
    }

    fn get_current<'b>(&'b mut self) -> Result<Option<RawKeyValue<'b>>, MemKvError> {
        let Some((key, value)) = &self.position else {
            return Ok(None);
        };
        let dupsort = self.db.config().is_dupsort();
        let found = self.locate(|table| {
            if dupsort { table.exact(key, value) } else { table.set(key) }
        })?;
        Ok(self.advance(found))
    }

    fn count(&mut self) -> Result<Option<usize>, MemKvError> {
        let Some((key, _)) = &self.position else {
            return Ok(None);
        };
        let count = self.inspect(|table| table.count(key))?;
        Ok((count > 0).then_some(count))
    }
}

impl KvCursorMut<MemKvError> for MemKvCursor<'_> {
    fn put(
        &mut self,
        key: &[u8],
        value: &[u8],
        precondition: Option<PutPrecondition>,
    ) -> Result<(), MemKvError> {
        self.writer().raw_put(self.db, key, value, precondition)?;
        self.position = Some((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn del(&mut self) -> Result<(), MemKvError> {
        let tx = self.writer();
        let (key, value) = self.anchor()?;
        tx.raw_delete(self.db, key, Some(value))?;
        Ok(())
    }

    fn del_all_dups(&mut self) -> Result<(), MemKvError> {
        let tx = self.writer();
        let (key, _) = self.anchor()?;
        tx.raw_delete(self.db, key, None)?;
        Ok(())
    }
}
