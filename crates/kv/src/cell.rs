use crate::model::{Db, KvRead, KvWrite};
use durable_codec::{ByteCoder, CodedItem};

/// A single value stored at a fixed key.
///
/// The key is encoded once, when the cell is created. The cell is not bound
/// to a transaction, so the same cell can be read and written in many.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCell<V> {
    handle: Db,
    key: Vec<u8>,
    value: V,
}

impl<V> ValueCell<V> {
    /// Create a cell for the encoded `key` of a database.
    pub const fn new(handle: Db, key: Vec<u8>, value: V) -> Self {
        Self { handle, key, value }
    }

    /// The encoded key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Reinterpret the stored value with another codec.
    pub fn rebind<W>(self, value: W) -> ValueCell<W> {
        ValueCell { handle: self.handle, key: self.key, value }
    }
}

impl<V: ByteCoder> ValueCell<V> {
    /// Read the value, if set.
    pub fn get<T: KvRead>(&self, txn: &T) -> Result<Option<CodedItem<V>>, T::Error> {
        txn.raw_get(self.handle, &self.key)?
            .map(|bytes| self.value.decode(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    /// Set the value, overwriting any previous one.
    pub fn put<T: KvWrite>(&self, txn: &T, value: &CodedItem<V>) -> Result<(), T::Error> {
        let value = self.value.encode(value)?;
        txn.raw_put(self.handle, &self.key, &value, None)
    }

    /// Clear the value. Returns whether it was set.
    pub fn delete<T: KvWrite>(&self, txn: &T) -> Result<bool, T::Error> {
        txn.raw_delete(self.handle, &self.key, None)
    }
}
