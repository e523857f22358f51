//! Codecs that adapt a base codec to a user-domain type.
//!
//! [`MapInput`] transforms values before the base encodes them, and
//! [`MapOutput`] transforms values after the base decodes them. Both keep the
//! boundedness and fixed size of their base, so a mapped codec can sit
//! wherever the base could. Transform failures surface as [`CodecError`]s.

use crate::{
    BoundedDecoder, ByteDecoder, ByteEncoder, ByteWindow, CodecError, DynamicSizeDecoder,
    FixedSizeDecoder, PrecountingEncoder,
};
use bytes::BufMut;
use core::{fmt, marker::PhantomData};

// ============================================================================
// MapInput
// ============================================================================

/// Encodes `I` by transforming it into the base codec's input first.
#[derive(Clone, Copy)]
pub struct MapInput<C, I, F> {
    base: C,
    transform: F,
    _marker: PhantomData<fn(&I)>,
}

impl<C, I, F> fmt::Debug for MapInput<C, I, F>
where
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapInput").field("base", &self.base).finish_non_exhaustive()
    }
}

impl<C, I, F> MapInput<C, I, F>
where
    C: ByteEncoder,
    F: Fn(&I) -> Result<C::Input, CodecError>,
{
    /// Wrap `base`, encoding through `transform`.
    pub const fn new(base: C, transform: F) -> Self {
        Self { base, transform, _marker: PhantomData }
    }
}

impl<C, I, F> MapInput<C, I, F> {
    /// The wrapped codec.
    pub const fn base(&self) -> &C {
        &self.base
    }
}

impl<C, I, F> ByteEncoder for MapInput<C, I, F>
where
    C: ByteEncoder,
    F: Fn(&I) -> Result<C::Input, CodecError>,
{
    type Input = I;

    fn encode_to<B>(&self, input: &I, buf: &mut B) -> Result<(), CodecError>
    where
        B: BufMut,
    {
        let mapped = (self.transform)(input)?;
        self.base.encode_to(&mapped, buf)
    }
}

impl<C, I, F> PrecountingEncoder for MapInput<C, I, F>
where
    C: PrecountingEncoder,
    F: Fn(&I) -> Result<C::Input, CodecError>,
{
    fn underestimated_len(&self, input: &I) -> usize {
        // A failing transform fails the encode itself, so the estimate only
        // has to stay a lower bound.
        (self.transform)(input).map(|mapped| self.base.underestimated_len(&mapped)).unwrap_or(0)
    }
}

impl<C, I, F> ByteDecoder for MapInput<C, I, F>
where
    C: ByteDecoder,
{
    type Output = C::Output;

    fn decode(&self, bytes: &[u8]) -> Result<C::Output, CodecError> {
        self.base.decode(bytes)
    }
}

impl<C, I, F> BoundedDecoder for MapInput<C, I, F>
where
    C: BoundedDecoder,
{
    fn scan<'a>(&self, window: &mut ByteWindow<'a>) -> Result<&'a [u8], CodecError> {
        self.base.scan(window)
    }

    fn decode_from(&self, window: &mut ByteWindow<'_>) -> Result<C::Output, CodecError> {
        self.base.decode_from(window)
    }
}

impl<C, I, F> FixedSizeDecoder for MapInput<C, I, F>
where
    C: FixedSizeDecoder,
{
    fn byte_count(&self) -> usize {
        self.base.byte_count()
    }
}

impl<C, I, F> DynamicSizeDecoder for MapInput<C, I, F> where C: DynamicSizeDecoder {}

// ============================================================================
// MapOutput
// ============================================================================

/// Decodes into `O` by transforming the base codec's output.
#[derive(Clone, Copy)]
pub struct MapOutput<C, O, F> {
    base: C,
    transform: F,
    _marker: PhantomData<fn() -> O>,
}

impl<C, O, F> fmt::Debug for MapOutput<C, O, F>
where
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapOutput").field("base", &self.base).finish_non_exhaustive()
    }
}

impl<C, O, F> MapOutput<C, O, F>
where
    C: ByteDecoder,
    F: Fn(C::Output) -> Result<O, CodecError>,
{
    /// Wrap `base`, decoding through `transform`.
    pub const fn new(base: C, transform: F) -> Self {
        Self { base, transform, _marker: PhantomData }
    }
}

impl<C, O, F> MapOutput<C, O, F> {
    /// The wrapped codec.
    pub const fn base(&self) -> &C {
        &self.base
    }
}

impl<C, O, F> ByteDecoder for MapOutput<C, O, F>
where
    C: ByteDecoder,
    F: Fn(C::Output) -> Result<O, CodecError>,
{
    type Output = O;

    fn decode(&self, bytes: &[u8]) -> Result<O, CodecError> {
        self.base.decode(bytes).and_then(&self.transform)
    }
}

impl<C, O, F> BoundedDecoder for MapOutput<C, O, F>
where
    C: BoundedDecoder,
    F: Fn(C::Output) -> Result<O, CodecError>,
{
    fn scan<'a>(&self, window: &mut ByteWindow<'a>) -> Result<&'a [u8], CodecError> {
        self.base.scan(window)
    }

    fn decode_from(&self, window: &mut ByteWindow<'_>) -> Result<O, CodecError> {
        self.base.decode_from(window).and_then(&self.transform)
    }
}

impl<C, O, F> FixedSizeDecoder for MapOutput<C, O, F>
where
    C: FixedSizeDecoder,
    F: Fn(C::Output) -> Result<O, CodecError>,
{
    fn byte_count(&self) -> usize {
        self.base.byte_count()
    }
}

impl<C, O, F> DynamicSizeDecoder for MapOutput<C, O, F>
where
    C: DynamicSizeDecoder,
    F: Fn(C::Output) -> Result<O, CodecError>,
{
}

impl<C, O, F> ByteEncoder for MapOutput<C, O, F>
where
    C: ByteEncoder,
{
    type Input = C::Input;

    fn encode_to<B>(&self, input: &C::Input, buf: &mut B) -> Result<(), CodecError>
    where
        B: BufMut,
    {
        self.base.encode_to(input, buf)
    }
}

impl<C, O, F> PrecountingEncoder for MapOutput<C, O, F>
where
    C: PrecountingEncoder,
{
    fn underestimated_len(&self, input: &C::Input) -> usize {
        self.base.underestimated_len(input)
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Adapter methods available on every encoder.
pub trait EncoderExt: ByteEncoder + Sized {
    /// Encode `I` by first transforming it into this codec's input.
    fn map_input<I, F>(self, transform: F) -> MapInput<Self, I, F>
    where
        F: Fn(&I) -> Result<Self::Input, CodecError>,
    {
        MapInput::new(self, transform)
    }
}

impl<C: ByteEncoder> EncoderExt for C {}

/// Adapter methods available on every decoder.
pub trait DecoderExt: ByteDecoder + Sized {
    /// Decode into `O` by transforming this codec's output.
    fn map_output<O, F>(self, transform: F) -> MapOutput<Self, O, F>
    where
        F: Fn(Self::Output) -> Result<O, CodecError>,
    {
        MapOutput::new(self, transform)
    }
}

impl<C: ByteDecoder> DecoderExt for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IntCoder, StringCoder, TupleCoder};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Millis(u64);

    fn millis_coder() -> impl ByteEncoder<Input = Millis> + FixedSizeDecoder<Output = Millis> {
        IntCoder::<u64>::big_endian()
            .map_input(|m: &Millis| Ok(m.0))
            .map_output(|raw| Ok(Millis(raw)))
    }

    #[test]
    fn mapped_codec_keeps_fixed_size() {
        let coder = millis_coder();
        assert_eq!(coder.byte_count(), 8);
        let bytes = coder.encode(&Millis(1_700_000_000_000)).unwrap();
        assert_eq!(coder.decode(&bytes).unwrap(), Millis(1_700_000_000_000));
    }

    #[test]
    fn mapped_codec_composes_as_leading_field() {
        let coder = TupleCoder::new(millis_coder(), StringCoder);
        let input = (Millis(5), "tick".to_string());
        let bytes = coder.encode(&input).unwrap();
        assert_eq!(coder.decode(&bytes).unwrap(), input);
    }

    #[test]
    fn output_transform_errors_propagate() {
        let coder = IntCoder::<u8>::default().map_output(|raw| {
            if raw < 10 { Ok(raw) } else { Err(CodecError::from("digit out of range")) }
        });
        assert_eq!(coder.decode(&[3]).unwrap(), 3);
        let err = coder.decode(&[42]).unwrap_err();
        assert_eq!(err.to_string(), "digit out of range");
    }

    #[test]
    fn input_transform_errors_propagate() {
        let coder = IntCoder::<u8>::default()
            .map_input(|wide: &u32| u8::try_from(*wide).map_err(CodecError::from_err));
        assert_eq!(coder.encode(&200).unwrap(), vec![200]);
        assert!(matches!(coder.encode(&300).unwrap_err(), CodecError::Boxed(_)));
        assert_eq!(coder.underestimated_len(&300), 0);
    }
}
