use durable_codec::CodecError;

/// Backend-independent storage error.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Boxed error. Indicates an issue with the storage engine.
    #[error(transparent)]
    Inner(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// Codec error. Indicates a key or value that does not match its schema.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// An insert-only write found the key (or key and value) already present.
    #[error("key already exists")]
    KeyExists,

    /// A duplicate-value operation was invoked on a database that is not
    /// configured for duplicates.
    #[error("tried to invoke a DUPSORT operation on a database that is not flagged DUPSORT")]
    NotDupSort,

    /// Indicates that a write transaction is already in progress.
    #[error("a write transaction is already in progress")]
    WriteLocked,
}

impl StoreError {
    /// Internal helper to create a `StoreError::Inner` from any error.
    pub fn from_err<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Inner(Box::new(err))
    }
}

/// Trait implemented by every engine error type.
pub trait KvReadError:
    std::error::Error + From<CodecError> + From<StoreError> + Send + Sync + 'static
{
    /// Convert the error into a [`StoreError`].
    fn into_store_error(self) -> StoreError;

    /// Borrow the error as a [`StoreError`], if it is one.
    fn as_store_error(&self) -> Option<&StoreError>;

    /// True if this is the "already exists" condition of an insert-only
    /// write.
    fn is_key_exists(&self) -> bool {
        matches!(self.as_store_error(), Some(StoreError::KeyExists))
    }

    /// True if a duplicate-value operation hit a non-duplicate database.
    fn is_not_dup_sort(&self) -> bool {
        matches!(self.as_store_error(), Some(StoreError::NotDupSort))
    }
}

impl KvReadError for StoreError {
    fn into_store_error(self) -> StoreError {
        self
    }

    fn as_store_error(&self) -> Option<&StoreError> {
        Some(self)
    }
}

/// Result type for backend-independent storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
