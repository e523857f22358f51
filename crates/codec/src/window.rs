use crate::CodecError;

/// A non-owning, forward-only view over a contiguous byte span.
///
/// Decoders carve prefixes off the front of the window. Carving never copies:
/// the returned slices borrow from the same memory the window borrows from,
/// which is usually owned by a storage transaction. The window cannot outlive
/// that memory.
///
/// ```
/// # use durable_codec::ByteWindow;
/// let mut window = ByteWindow::new(b"\x00\x2aanswer");
/// assert_eq!(window.carve(2).unwrap(), b"\x00\x2a");
/// assert_eq!(window.take_rest(), b"answer");
/// assert!(window.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWindow<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteWindow<'a> {
    /// Create a window over `bytes`.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Number of unconsumed bytes.
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if every byte has been consumed.
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The unconsumed bytes, without consuming them.
    pub const fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }

    /// Carve a `len`-byte prefix off the window and advance past it.
    ///
    /// Fails with [`CodecError::InsufficientData`] if fewer than `len` bytes
    /// remain. The window is left untouched on failure.
    pub fn carve(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        match self.bytes.split_at_checked(len) {
            Some((prefix, rest)) => {
                self.bytes = rest;
                Ok(prefix)
            }
            None => Err(CodecError::InsufficientData { needed: len, available: self.bytes.len() }),
        }
    }

    /// Consume and return every remaining byte.
    pub const fn take_rest(&mut self) -> &'a [u8] {
        let rest = self.bytes;
        self.bytes = &[];
        rest
    }

    /// Assert that the window was fully consumed.
    pub const fn finish(self) -> Result<(), CodecError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(CodecError::InexactDecode { extra_bytes: self.bytes.len() })
        }
    }

    /// The bytes consumed since `start` was taken from this window.
    ///
    /// `start` must be an earlier copy of this window.
    pub(crate) fn consumed_since(&self, start: Self) -> &'a [u8] {
        debug_assert!(start.len() >= self.len(), "window was not derived from start");
        &start.bytes[..start.len() - self.len()]
    }
}

impl<'a> From<&'a [u8]> for ByteWindow<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carve_advances() {
        let mut window = ByteWindow::new(&[1, 2, 3, 4, 5]);
        assert_eq!(window.carve(2).unwrap(), &[1, 2]);
        assert_eq!(window.len(), 3);
        assert_eq!(window.carve(0).unwrap(), &[] as &[u8]);
        assert_eq!(window.carve(3).unwrap(), &[3, 4, 5]);
        assert!(window.is_empty());
        window.finish().unwrap();
    }

    #[test]
    fn carve_past_end_fails_without_consuming() {
        let mut window = ByteWindow::new(&[1, 2, 3]);
        let err = window.carve(4).unwrap_err();
        assert!(matches!(err, CodecError::InsufficientData { needed: 4, available: 3 }));
        assert_eq!(window.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn finish_reports_leftovers() {
        let mut window = ByteWindow::new(&[9, 9, 9]);
        window.carve(1).unwrap();
        let err = window.finish().unwrap_err();
        assert!(matches!(err, CodecError::InexactDecode { extra_bytes: 2 }));
    }

    #[test]
    fn consumed_since_spans_multiple_carves() {
        let bytes = [1u8, 2, 3, 4];
        let mut window = ByteWindow::new(&bytes);
        let start = window;
        window.carve(1).unwrap();
        window.carve(2).unwrap();
        assert_eq!(window.consumed_since(start), &[1, 2, 3]);
    }
}
