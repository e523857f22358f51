use durable_codec::CodecError;
use durable_kv::model::{KvReadError, StoreError};
use signet_libmdbx::{MdbxError as LibMdbxError, ReadError};

/// Error type for [`signet_libmdbx`] based storage.
#[derive(Debug, thiserror::Error)]
pub enum MdbxError {
    /// Inner error
    #[error(transparent)]
    Mdbx(LibMdbxError),

    /// Backend-independent error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Codec error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The handle names a database this environment never opened, or one
    /// that was dropped.
    #[error("unknown database handle {0}")]
    UnknownDb(u32),

    /// A database was reopened with a different configuration.
    #[error("database exists with an incompatible configuration")]
    Incompatible,

    /// A key is empty or too long, a value does not fit a duplicate
    /// database, or an integer key or value is not 4 or 8 bytes.
    #[error("unsupported size of key or value: {size} bytes")]
    BadValueSize {
        /// Size of the offending key or value.
        size: usize,
    },

    /// A move relative to the current position, or a delete, on an
    /// unpositioned cursor.
    #[error("cursor is not positioned")]
    Unpositioned,
}

impl From<LibMdbxError> for MdbxError {
    fn from(err: LibMdbxError) -> Self {
        match err {
            LibMdbxError::KeyExist => Self::Store(StoreError::KeyExists),
            LibMdbxError::RequiresDupSort => Self::Store(StoreError::NotDupSort),
            LibMdbxError::Incompatible => Self::Incompatible,
            other => Self::Mdbx(other),
        }
    }
}

impl From<ReadError> for MdbxError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Mdbx(e) => e.into(),
            ReadError::Decoding(e) => Self::Codec(CodecError::Boxed(e)),
        }
    }
}

impl KvReadError for MdbxError {
    fn into_store_error(self) -> StoreError {
        match self {
            Self::Store(err) => err,
            Self::Codec(err) => StoreError::Codec(err),
            other => StoreError::from_err(other),
        }
    }

    fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}
