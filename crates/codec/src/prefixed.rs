use crate::{
    BoundedDecoder, ByteDecoder, ByteEncoder, ByteWindow, CodecError, DynamicSizeDecoder,
    PrecountingEncoder,
};
use bytes::BufMut;

/// Size of the length header written by [`LengthPrefixed`].
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Makes any codec self-delimiting by writing a big-endian `u32` byte length
/// ahead of its encoding.
///
/// This turns unbounded codecs such as [`RawCoder`] and [`StringCoder`] into
/// bounded ones, so they can lead a [`TupleCoder`].
///
/// ```
/// # use durable_codec::{ByteDecoder, ByteEncoder, LengthPrefixed, StringCoder, TupleCoder};
/// let coder = TupleCoder::new(LengthPrefixed::new(StringCoder), StringCoder);
/// let input = ("left".to_string(), "right".to_string());
/// let bytes = coder.encode(&input).unwrap();
/// assert_eq!(&bytes[..4], &[0, 0, 0, 4]);
/// assert_eq!(coder.decode(&bytes).unwrap(), input);
/// ```
///
/// [`RawCoder`]: crate::RawCoder
/// [`StringCoder`]: crate::StringCoder
/// [`TupleCoder`]: crate::TupleCoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthPrefixed<C> {
    inner: C,
}

impl<C> LengthPrefixed<C> {
    /// Wrap `inner` with a length header.
    pub const fn new(inner: C) -> Self {
        Self { inner }
    }

    /// The wrapped codec.
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    fn carve_body<'a>(&self, window: &mut ByteWindow<'a>) -> Result<&'a [u8], CodecError> {
        let start = *window;
        let header = window.carve(LENGTH_PREFIX_SIZE)?;
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        window.carve(len).inspect_err(|_| *window = start)
    }
}

impl<C> ByteEncoder for LengthPrefixed<C>
where
    C: ByteEncoder,
{
    type Input = C::Input;

    fn encode_to<B>(&self, input: &C::Input, buf: &mut B) -> Result<(), CodecError>
    where
        B: BufMut,
    {
        let body = self.inner.encode(input)?;
        let len = u32::try_from(body.len()).map_err(CodecError::from_err)?;
        buf.put_u32(len);
        buf.put_slice(&body);
        Ok(())
    }
}

impl<C> PrecountingEncoder for LengthPrefixed<C>
where
    C: PrecountingEncoder,
{
    fn underestimated_len(&self, input: &C::Input) -> usize {
        LENGTH_PREFIX_SIZE + self.inner.underestimated_len(input)
    }
}

impl<C> ByteDecoder for LengthPrefixed<C>
where
    C: ByteDecoder,
{
    type Output = C::Output;

    fn decode(&self, bytes: &[u8]) -> Result<C::Output, CodecError> {
        self.decode_exact(bytes)
    }
}

impl<C> BoundedDecoder for LengthPrefixed<C>
where
    C: ByteDecoder,
{
    fn scan<'a>(&self, window: &mut ByteWindow<'a>) -> Result<&'a [u8], CodecError> {
        let start = *window;
        self.carve_body(window)?;
        Ok(window.consumed_since(start))
    }

    fn decode_from(&self, window: &mut ByteWindow<'_>) -> Result<C::Output, CodecError> {
        let body = self.carve_body(window)?;
        self.inner.decode(body)
    }
}

impl<C> DynamicSizeDecoder for LengthPrefixed<C> where C: ByteDecoder {}
