/// Error type for encoding and decoding failures.
///
/// Codec errors indicate a schema mismatch or malformed data, never a storage
/// engine failure. Transform errors raised by mapped codecs are erased into
/// the [`CodecError::Boxed`] variant.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// Boxed error, usually raised by a mapped codec's transform.
    #[error(transparent)]
    Boxed(Box<dyn std::error::Error + Send + Sync + 'static>),

    /// String error message.
    #[error("{0}")]
    String(String),

    /// Decoding finished with bytes left in the window.
    #[error("inexact decode: {extra_bytes} extra bytes remaining")]
    InexactDecode {
        /// Number of bytes left unconsumed.
        extra_bytes: usize,
    },

    /// Not enough bytes in the window to complete decoding.
    #[error("insufficient data: needed {needed} bytes, but only {available} available")]
    InsufficientData {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// A fixed-count codec was handed the wrong number of elements.
    #[error("length mismatch: expected {expected} elements, found {found}")]
    LengthMismatch {
        /// Element count the codec was configured with.
        expected: usize,
        /// Element count of the input.
        found: usize,
    },
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::String(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::String(err)
    }
}

impl CodecError {
    /// Box an error into a `CodecError`.
    pub fn from_err<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Boxed(Box::new(err))
    }

    /// Check that a complete window holds exactly `expected` bytes.
    pub(crate) const fn check_exact(expected: usize, available: usize) -> Result<(), Self> {
        if available < expected {
            return Err(Self::InsufficientData { needed: expected, available });
        }
        if available > expected {
            return Err(Self::InexactDecode { extra_bytes: available - expected });
        }
        Ok(())
    }
}
