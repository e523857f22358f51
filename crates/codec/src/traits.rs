use crate::{ByteWindow, CodecError};
use bytes::BufMut;

/// Encodes values of type [`Self::Input`] into bytes.
///
/// Encoding must be side-effect free on the input, and must write exactly the
/// bytes that the paired decoder turns back into an equivalent value.
pub trait ByteEncoder {
    /// The type this encoder accepts.
    type Input;

    /// Encode `input` by appending its bytes to `buf`.
    fn encode_to<B>(&self, input: &Self::Input, buf: &mut B) -> Result<(), CodecError>
    where
        B: BufMut;

    /// Encode `input` into a freshly allocated buffer.
    fn encode(&self, input: &Self::Input) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        self.encode_to(input, &mut buf)?;
        Ok(buf)
    }
}

/// An encoder that can estimate the size of its output before encoding.
///
/// The estimate must never exceed the real encoded length. It is used to
/// pre-size scratch buffers for composite encodes.
pub trait PrecountingEncoder: ByteEncoder {
    /// A lower bound on the number of bytes `input` encodes to.
    fn underestimated_len(&self, input: &Self::Input) -> usize;

    /// Encode `input` into a buffer reserved from the size estimate.
    fn encode_precounted(&self, input: &Self::Input) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(self.underestimated_len(input));
        self.encode_to(input, &mut buf)?;
        Ok(buf)
    }
}

/// Decodes a complete byte window into a value of type [`Self::Output`].
pub trait ByteDecoder {
    /// The type this decoder produces.
    type Output;

    /// Decode exactly one complete window.
    ///
    /// Every byte of `bytes` must be accounted for. Leftover bytes are a
    /// schema mismatch and fail with [`CodecError::InexactDecode`].
    fn decode(&self, bytes: &[u8]) -> Result<Self::Output, CodecError>;
}

/// A decoder that knows where its encoding ends inside a larger window.
///
/// Bounded decoders can sit anywhere in a composite encoding, because they can
/// carve their own prefix off a shared window and leave the rest for the
/// fields that follow.
pub trait BoundedDecoder: ByteDecoder {
    /// Carve this decoder's encoded prefix off `window` without decoding it.
    fn scan<'a>(&self, window: &mut ByteWindow<'a>) -> Result<&'a [u8], CodecError>;

    /// Carve this decoder's prefix off `window` and decode it.
    fn decode_from(&self, window: &mut ByteWindow<'_>) -> Result<Self::Output, CodecError> {
        let prefix = self.scan(window)?;
        self.decode(prefix)
    }
}

/// A bounded decoder whose encoding always spans the same number of bytes.
pub trait FixedSizeDecoder: BoundedDecoder {
    /// The exact encoded length.
    fn byte_count(&self) -> usize;
}

/// A bounded decoder whose encoding length depends on the value, e.g. because
/// it carries its own length prefix.
pub trait DynamicSizeDecoder: BoundedDecoder {
    /// Decode a standalone window, requiring it to be consumed entirely.
    fn decode_exact(&self, bytes: &[u8]) -> Result<Self::Output, CodecError> {
        let mut window = ByteWindow::new(bytes);
        let output = self.decode_from(&mut window)?;
        window.finish()?;
        Ok(output)
    }
}

/// A codec whose decoded type matches the type it encodes.
///
/// This is the requirement for keys and values of the collections built on
/// top of the codecs. It is implemented for every qualifying pair.
pub trait ByteCoder: ByteEncoder + ByteDecoder<Output = <Self as ByteEncoder>::Input> {}

impl<C> ByteCoder for C where C: ByteEncoder + ByteDecoder<Output = <C as ByteEncoder>::Input> {}

/// The shorthand for the value type of a [`ByteCoder`].
pub type CodedItem<C> = <C as ByteEncoder>::Input;
