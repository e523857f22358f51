use crate::model::RawKeyValue;
use durable_codec::{ByteCodable, ByteCoder, CodecError, CodedItem};

/// The key and value codecs of a database.
///
/// The schema fully determines the stored byte layout. Keys are ordered by
/// the database's key order applied to their encodings, so a key codec
/// should produce encodings that sort the way the keys should.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schema<K, V> {
    key: K,
    value: V,
}

impl<K, V> Schema<K, V> {
    /// Create a schema from a key codec and a value codec.
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// The key codec.
    pub const fn key_coder(&self) -> &K {
        &self.key
    }

    /// The value codec.
    pub const fn value_coder(&self) -> &V {
        &self.value
    }

    /// Replace the value codec, keeping the key codec.
    pub fn with_value<W>(self, value: W) -> Schema<K, W> {
        Schema { key: self.key, value }
    }
}

impl<K, V> Schema<K, V>
where
    K: ByteCoder,
    V: ByteCoder,
{
    /// Encode a key.
    pub fn encode_key(&self, key: &CodedItem<K>) -> Result<Vec<u8>, CodecError> {
        self.key.encode(key)
    }

    /// Encode a value.
    pub fn encode_value(&self, value: &CodedItem<V>) -> Result<Vec<u8>, CodecError> {
        self.value.encode(value)
    }

    /// Decode a key.
    pub fn decode_key(&self, bytes: &[u8]) -> Result<CodedItem<K>, CodecError> {
        self.key.decode(bytes)
    }

    /// Decode a value.
    pub fn decode_value(&self, bytes: &[u8]) -> Result<CodedItem<V>, CodecError> {
        self.value.decode(bytes)
    }

    /// Decode a raw pair returned by a cursor.
    pub fn decode_pair(
        &self,
        (key, value): RawKeyValue<'_>,
    ) -> Result<(CodedItem<K>, CodedItem<V>), CodecError> {
        Ok((self.decode_key(&key)?, self.decode_value(&value)?))
    }
}

/// The schema of the canonical codecs of `K` and `V`.
pub fn codable_schema<K, V>() -> Schema<K::Coder, V::Coder>
where
    K: ByteCodable,
    V: ByteCodable,
{
    Schema::new(K::coder(), V::coder())
}
