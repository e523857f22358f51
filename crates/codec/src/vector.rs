use crate::{
    BoundedDecoder, ByteDecoder, ByteEncoder, ByteWindow, CodecError, FixedSizeDecoder,
    PrecountingEncoder,
};
use bytes::BufMut;

/// Codec for exactly `count` elements of a fixed-size element codec.
///
/// The encoding is the elements back to back, with no length header, so the
/// whole vector is itself fixed-size: `count * element.byte_count()` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorCoder<C> {
    element: C,
    count: usize,
}

impl<C> VectorCoder<C> {
    /// Create a codec for `count` elements encoded by `element`.
    pub const fn new(element: C, count: usize) -> Self {
        Self { element, count }
    }

    /// The number of elements every input and output holds.
    pub const fn count(&self) -> usize {
        self.count
    }

    /// The element codec.
    pub const fn element(&self) -> &C {
        &self.element
    }
}

impl<C> ByteEncoder for VectorCoder<C>
where
    C: ByteEncoder,
{
    type Input = Vec<C::Input>;

    fn encode_to<B>(&self, input: &Self::Input, buf: &mut B) -> Result<(), CodecError>
    where
        B: BufMut,
    {
        if input.len() != self.count {
            return Err(CodecError::LengthMismatch { expected: self.count, found: input.len() });
        }
        input.iter().try_for_each(|element| self.element.encode_to(element, buf))
    }
}

impl<C> PrecountingEncoder for VectorCoder<C>
where
    C: ByteEncoder + FixedSizeDecoder,
{
    fn underestimated_len(&self, _input: &Self::Input) -> usize {
        self.byte_count()
    }
}

impl<C> ByteDecoder for VectorCoder<C>
where
    C: FixedSizeDecoder,
{
    type Output = Vec<C::Output>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Output, CodecError> {
        CodecError::check_exact(self.byte_count(), bytes.len())?;
        self.decode_from(&mut ByteWindow::new(bytes))
    }
}

impl<C> BoundedDecoder for VectorCoder<C>
where
    C: FixedSizeDecoder,
{
    fn scan<'a>(&self, window: &mut ByteWindow<'a>) -> Result<&'a [u8], CodecError> {
        window.carve(self.byte_count())
    }

    fn decode_from(&self, window: &mut ByteWindow<'_>) -> Result<Self::Output, CodecError> {
        let mut body = ByteWindow::new(self.scan(window)?);
        (0..self.count).map(|_| self.element.decode_from(&mut body)).collect()
    }
}

impl<C> FixedSizeDecoder for VectorCoder<C>
where
    C: FixedSizeDecoder,
{
    fn byte_count(&self) -> usize {
        self.count * self.element.byte_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Endianness, IntCoder, TupleCoder};

    #[test]
    fn encodes_elements_back_to_back() {
        let coder = VectorCoder::new(IntCoder::<u16>::new(Endianness::Big), 3);
        let bytes = coder.encode_precounted(&vec![1, 2, 3]).unwrap();
        assert_eq!(bytes, vec![0, 1, 0, 2, 0, 3]);
        assert_eq!(coder.byte_count(), 6);
        assert_eq!(coder.decode(&bytes).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn wrong_input_length_is_rejected() {
        let coder = VectorCoder::new(IntCoder::<u8>::default(), 2);
        assert!(matches!(
            coder.encode(&vec![1]).unwrap_err(),
            CodecError::LengthMismatch { expected: 2, found: 1 }
        ));
    }

    #[test]
    fn empty_vector_takes_no_bytes() {
        let coder = VectorCoder::new(IntCoder::<u64>::default(), 0);
        assert!(coder.encode(&vec![]).unwrap().is_empty());
        assert!(coder.decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn vector_as_leading_tuple_field() {
        let values = VectorCoder::new(IntCoder::<u8>::default(), 2);
        let coder = TupleCoder::new(values, IntCoder::<u8>::default());
        let bytes = coder.encode(&(vec![4, 5], 6)).unwrap();
        assert_eq!(coder.decode(&bytes).unwrap(), (vec![4, 5], 6));
        assert_eq!(coder.byte_count(), 3);
    }

    #[test]
    fn short_window_fails_before_decoding() {
        let coder = VectorCoder::new(IntCoder::<u32>::default(), 2);
        assert!(matches!(
            coder.decode(&[0; 7]).unwrap_err(),
            CodecError::InsufficientData { needed: 8, available: 7 }
        ));
    }
}
