//! Sorted storage of one database.

use crate::model::{DbConfig, PutPrecondition};

/// Position of a pair: index of the key, index of the value under it.
pub(crate) type Pos = (usize, usize);

/// Why a put was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PutRefusal {
    KeyExists,
    BadValueSize(usize),
}

#[derive(Debug, Clone)]
struct KeyEntry {
    key: Vec<u8>,
    // Sorted by the value order, never empty.
    values: Vec<Vec<u8>>,
}

/// One database: keys sorted by the key order, each with its sorted values.
#[derive(Debug, Clone)]
pub(crate) struct Table {
    config: DbConfig,
    entries: Vec<KeyEntry>,
    pairs: usize,
    bytes: usize,
}

impl Table {
    pub(crate) const fn new(config: DbConfig) -> Self {
        Self { config, entries: Vec::new(), pairs: 0, bytes: 0 }
    }

    pub(crate) const fn config(&self) -> DbConfig {
        self.config
    }

    /// Number of pairs, counting duplicates.
    pub(crate) const fn pairs(&self) -> usize {
        self.pairs
    }

    /// Bytes of keys and values stored.
    pub(crate) const fn bytes(&self) -> usize {
        self.bytes
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.pairs = 0;
        self.bytes = 0;
    }

    fn find_key(&self, key: &[u8]) -> Result<usize, usize> {
        let order = self.config.key_order;
        self.entries.binary_search_by(|entry| order.compare(&entry.key, key))
    }

    fn find_value(&self, index: usize, value: &[u8]) -> Result<usize, usize> {
        let order = self.config.value_order();
        self.entries[index].values.binary_search_by(|stored| order.compare(stored, value))
    }

    fn last_of(&self, index: usize) -> Pos {
        (index, self.entries[index].values.len() - 1)
    }

    /// Key and value at a position returned by this table.
    pub(crate) fn pair(&self, (key, value): Pos) -> (&[u8], &[u8]) {
        let entry = &self.entries[key];
        (&entry.key, &entry.values[value])
    }

    pub(crate) fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let index = self.find_key(key).ok()?;
        Some(&self.entries[index].values[0])
    }

    /// Bytes a put of this pair would add.
    pub(crate) fn growth(&self, key: &[u8], value: &[u8]) -> usize {
        match self.find_key(key) {
            Ok(index) if !self.config.is_dupsort() => {
                value.len().saturating_sub(self.entries[index].values[0].len())
            }
            Ok(_) => value.len(),
            Err(_) => key.len() + value.len(),
        }
    }

    pub(crate) fn put(
        &mut self,
        key: &[u8],
        value: &[u8],
        precondition: Option<PutPrecondition>,
    ) -> Result<(), PutRefusal> {
        let index = match self.find_key(key) {
            Ok(index) => index,
            Err(index) => {
                let entry = KeyEntry { key: key.to_vec(), values: vec![value.to_vec()] };
                self.entries.insert(index, entry);
                self.pairs += 1;
                self.bytes += key.len() + value.len();
                return Ok(());
            }
        };

        let Some(dup) = self.config.duplicates else {
            if precondition.is_some() {
                return Err(PutRefusal::KeyExists);
            }
            let stored = &mut self.entries[index].values[0];
            self.bytes = self.bytes - stored.len() + value.len();
            *stored = value.to_vec();
            return Ok(());
        };

        match self.find_value(index, value) {
            Ok(_) if precondition.is_some() => Err(PutRefusal::KeyExists),
            Ok(_) => Ok(()),
            Err(_) if precondition == Some(PutPrecondition::UniqueKey) => {
                Err(PutRefusal::KeyExists)
            }
            Err(slot) => {
                let values = &mut self.entries[index].values;
                if dup.fixed_size && values[0].len() != value.len() {
                    return Err(PutRefusal::BadValueSize(value.len()));
                }
                values.insert(slot, value.to_vec());
                self.pairs += 1;
                self.bytes += value.len();
                Ok(())
            }
        }
    }

    /// Delete all values of `key`, or one value of a duplicate database.
    /// Databases without duplicates ignore `value`.
    pub(crate) fn delete(&mut self, key: &[u8], value: Option<&[u8]>) -> bool {
        let Ok(index) = self.find_key(key) else {
            return false;
        };
        if let (Some(value), true) = (value, self.config.is_dupsort()) {
            let Ok(slot) = self.find_value(index, value) else {
                return false;
            };
            let entry = &mut self.entries[index];
            if entry.values.len() > 1 {
                entry.values.remove(slot);
                self.pairs -= 1;
                self.bytes -= value.len();
                return true;
            }
        }
        let entry = self.entries.remove(index);
        self.pairs -= entry.values.len();
        self.bytes -= entry.key.len() + entry.values.iter().map(Vec::len).sum::<usize>();
        true
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub(crate) fn first(&self) -> Option<Pos> {
        (!self.entries.is_empty()).then_some((0, 0))
    }

    pub(crate) fn last(&self) -> Option<Pos> {
        self.entries.len().checked_sub(1).map(|index| self.last_of(index))
    }

    /// The pair at exactly `(key, value)`.
    pub(crate) fn exact(&self, key: &[u8], value: &[u8]) -> Option<Pos> {
        let index = self.find_key(key).ok()?;
        let slot = self.find_value(index, value).ok()?;
        Some((index, slot))
    }

    /// First value of exactly `key`.
    pub(crate) fn set(&self, key: &[u8]) -> Option<Pos> {
        self.find_key(key).ok().map(|index| (index, 0))
    }

    /// First value of the smallest key `>= key`.
    pub(crate) fn set_range(&self, key: &[u8]) -> Option<Pos> {
        let index = self.find_key(key).unwrap_or_else(|index| index);
        (index < self.entries.len()).then_some((index, 0))
    }

    /// Smallest value `>= value` under exactly `key`.
    pub(crate) fn both_range(&self, key: &[u8], value: &[u8]) -> Option<Pos> {
        let index = self.find_key(key).ok()?;
        let slot = self.find_value(index, value).unwrap_or_else(|slot| slot);
        (slot < self.entries[index].values.len()).then_some((index, slot))
    }

    /// The smallest pair strictly after `(key, value)`. The anchor pair need
    /// not be present. Without duplicates only the key is considered.
    pub(crate) fn after(&self, key: &[u8], value: &[u8]) -> Option<Pos> {
        if !self.config.is_dupsort() {
            return self.next_key(key);
        }
        match self.find_key(key) {
            Ok(index) => {
                let slot = match self.find_value(index, value) {
                    Ok(slot) => slot + 1,
                    Err(slot) => slot,
                };
                if slot < self.entries[index].values.len() {
                    Some((index, slot))
                } else {
                    (index + 1 < self.entries.len()).then_some((index + 1, 0))
                }
            }
            Err(index) => (index < self.entries.len()).then_some((index, 0)),
        }
    }

    /// The largest pair strictly before `(key, value)`.
    pub(crate) fn before(&self, key: &[u8], value: &[u8]) -> Option<Pos> {
        if !self.config.is_dupsort() {
            return self.prev_key(key);
        }
        let index = match self.find_key(key) {
            Ok(index) => {
                let slot = self.find_value(index, value).unwrap_or_else(|slot| slot);
                if slot > 0 {
                    return Some((index, slot - 1));
                }
                index
            }
            Err(index) => index,
        };
        index.checked_sub(1).map(|index| self.last_of(index))
    }

    /// The next value under `key` after `value`.
    pub(crate) fn next_dup(&self, key: &[u8], value: &[u8]) -> Option<Pos> {
        let index = self.find_key(key).ok()?;
        let slot = match self.find_value(index, value) {
            Ok(slot) => slot + 1,
            Err(slot) => slot,
        };
        (slot < self.entries[index].values.len()).then_some((index, slot))
    }

    /// The previous value under `key` before `value`.
    pub(crate) fn prev_dup(&self, key: &[u8], value: &[u8]) -> Option<Pos> {
        let index = self.find_key(key).ok()?;
        let slot = self.find_value(index, value).unwrap_or_else(|slot| slot);
        slot.checked_sub(1).map(|slot| (index, slot))
    }

    /// First value of the smallest key strictly after `key`.
    pub(crate) fn next_key(&self, key: &[u8]) -> Option<Pos> {
        let index = match self.find_key(key) {
            Ok(index) => index + 1,
            Err(index) => index,
        };
        (index < self.entries.len()).then_some((index, 0))
    }

    /// Last value of the largest key strictly before `key`.
    pub(crate) fn prev_key(&self, key: &[u8]) -> Option<Pos> {
        let index = self.find_key(key).unwrap_or_else(|index| index);
        index.checked_sub(1).map(|index| self.last_of(index))
    }

    /// First value of `key`, if present.
    pub(crate) fn first_dup(&self, key: &[u8]) -> Option<Pos> {
        self.set(key)
    }

    /// Last value of `key`, if present.
    pub(crate) fn last_dup(&self, key: &[u8]) -> Option<Pos> {
        self.find_key(key).ok().map(|index| self.last_of(index))
    }

    /// Number of values under `key`.
    pub(crate) fn count(&self, key: &[u8]) -> usize {
        self.find_key(key).map_or(0, |index| self.entries[index].values.len())
    }
}
