use crate::{
    BoundedDecoder, ByteDecoder, ByteEncoder, ByteWindow, CodecError, DynamicSizeDecoder,
    FixedSizeDecoder, PrecountingEncoder,
};
use bytes::BufMut;

/// Codec for a pair, encoded as the concatenation of both fields.
///
/// Decoding needs the first field to be [`BoundedDecoder`], so it can find
/// where the second field begins. The second field decodes whatever remains
/// and may be unbounded, e.g. a [`StringCoder`](crate::StringCoder).
///
/// ```
/// # use durable_codec::{ByteDecoder, ByteEncoder, IntCoder, StringCoder, TupleCoder};
/// let coder = TupleCoder::new(IntCoder::<u16>::big_endian(), StringCoder);
/// let bytes = coder.encode(&(7, "seven".to_string())).unwrap();
/// assert_eq!(&bytes[..2], &[0, 7]);
/// assert_eq!(coder.decode(&bytes).unwrap(), (7, "seven".to_string()));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TupleCoder<A, B> {
    first: A,
    second: B,
}

impl<A, B> TupleCoder<A, B> {
    /// Create a pair codec from the codecs for each field.
    pub const fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    /// The codec of the first field.
    pub const fn first(&self) -> &A {
        &self.first
    }

    /// The codec of the second field.
    pub const fn second(&self) -> &B {
        &self.second
    }
}

impl<A, B> ByteEncoder for TupleCoder<A, B>
where
    A: ByteEncoder,
    B: ByteEncoder,
{
    type Input = (A::Input, B::Input);

    fn encode_to<Buf>(&self, input: &Self::Input, buf: &mut Buf) -> Result<(), CodecError>
    where
        Buf: BufMut,
    {
        self.first.encode_to(&input.0, buf)?;
        self.second.encode_to(&input.1, buf)
    }
}

impl<A, B> PrecountingEncoder for TupleCoder<A, B>
where
    A: PrecountingEncoder,
    B: PrecountingEncoder,
{
    fn underestimated_len(&self, input: &Self::Input) -> usize {
        self.first.underestimated_len(&input.0) + self.second.underestimated_len(&input.1)
    }
}

impl<A, B> ByteDecoder for TupleCoder<A, B>
where
    A: BoundedDecoder,
    B: ByteDecoder,
{
    type Output = (A::Output, B::Output);

    fn decode(&self, bytes: &[u8]) -> Result<Self::Output, CodecError> {
        let mut window = ByteWindow::new(bytes);
        let first = self.first.decode_from(&mut window)?;
        let second = self.second.decode(window.take_rest())?;
        Ok((first, second))
    }
}

impl<A, B> BoundedDecoder for TupleCoder<A, B>
where
    A: BoundedDecoder,
    B: BoundedDecoder,
{
    fn scan<'a>(&self, window: &mut ByteWindow<'a>) -> Result<&'a [u8], CodecError> {
        let start = *window;
        self.first.scan(window)?;
        if let Err(err) = self.second.scan(window) {
            *window = start;
            return Err(err);
        }
        Ok(window.consumed_since(start))
    }

    fn decode_from(&self, window: &mut ByteWindow<'_>) -> Result<Self::Output, CodecError> {
        let first = self.first.decode_from(window)?;
        let second = self.second.decode_from(window)?;
        Ok((first, second))
    }
}

impl<A, B> FixedSizeDecoder for TupleCoder<A, B>
where
    A: FixedSizeDecoder,
    B: FixedSizeDecoder,
{
    fn byte_count(&self) -> usize {
        self.first.byte_count() + self.second.byte_count()
    }
}

impl<A, B> DynamicSizeDecoder for TupleCoder<A, B>
where
    A: BoundedDecoder,
    B: DynamicSizeDecoder,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IntCoder, LengthPrefixed, RawCoder, StringCoder};

    #[test]
    fn fixed_pair_consumes_exactly_both_fields() {
        let coder =
            TupleCoder::new(IntCoder::<u32>::big_endian(), IntCoder::<u16>::little_endian());
        let bytes = coder.encode_precounted(&(1, 2)).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 1, 2, 0]);
        assert_eq!(coder.byte_count(), 6);

        let mut framed = bytes.clone();
        framed.push(0xEE);
        let mut window = ByteWindow::new(&framed);
        assert_eq!(coder.decode_from(&mut window).unwrap(), (1, 2));
        assert_eq!(window.as_slice(), &[0xEE]);
    }

    #[test]
    fn unbounded_tail_takes_the_remainder() {
        let coder = TupleCoder::new(IntCoder::<u8>::default(), RawCoder);
        let bytes = coder.encode(&(9, vec![1, 2, 3])).unwrap();
        assert_eq!(coder.decode(&bytes).unwrap(), (9, vec![1, 2, 3]));
        assert_eq!(coder.decode(&[9]).unwrap(), (9, vec![]));
    }

    #[test]
    fn nested_pairs_scan_as_one_prefix() {
        let inner = TupleCoder::new(IntCoder::<u8>::default(), IntCoder::<u8>::default());
        let coder = TupleCoder::new(inner, StringCoder);
        let bytes = coder.encode(&((1, 2), "xy".to_string())).unwrap();

        let mut window = ByteWindow::new(&bytes);
        assert_eq!(coder.first().scan(&mut window).unwrap(), &[1, 2]);
        assert_eq!(window.as_slice(), b"xy");
        assert_eq!(coder.decode(&bytes).unwrap(), ((1, 2), "xy".to_string()));
    }

    #[test]
    fn truncated_first_field_fails() {
        let coder = TupleCoder::new(IntCoder::<u32>::default(), RawCoder);
        assert!(matches!(
            coder.decode(&[0, 0]).unwrap_err(),
            CodecError::InsufficientData { needed: 4, available: 2 }
        ));
    }

    #[test]
    fn failed_scan_restores_window() {
        let coder = TupleCoder::new(IntCoder::<u8>::default(), IntCoder::<u32>::default());
        let bytes = [1u8, 2];
        let mut window = ByteWindow::new(&bytes);
        assert!(coder.scan(&mut window).is_err());
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn dynamic_tail_must_be_consumed() {
        let coder = TupleCoder::new(IntCoder::<u8>::default(), LengthPrefixed::new(RawCoder));
        let mut bytes = coder.encode(&(1, vec![5, 6])).unwrap();
        assert_eq!(coder.decode_exact(&bytes).unwrap(), (1, vec![5, 6]));

        bytes.push(0);
        assert!(matches!(
            coder.decode_exact(&bytes).unwrap_err(),
            CodecError::InexactDecode { extra_bytes: 1 }
        ));
    }
}
