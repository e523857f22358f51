//! Pass-through codecs for bytes and text.

use crate::{ByteDecoder, ByteEncoder, CodecError, PrecountingEncoder};
use bytes::BufMut;

/// Identity codec for callers that manage the byte layout themselves.
///
/// The encoding is the input itself, so it has no boundary of its own. Use it
/// as the last field of a composite, or wrap it in
/// [`LengthPrefixed`](crate::LengthPrefixed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCoder;

impl ByteEncoder for RawCoder {
    type Input = Vec<u8>;

    fn encode_to<B>(&self, input: &Vec<u8>, buf: &mut B) -> Result<(), CodecError>
    where
        B: BufMut,
    {
        buf.put_slice(input);
        Ok(())
    }
}

impl PrecountingEncoder for RawCoder {
    fn underestimated_len(&self, input: &Vec<u8>) -> usize {
        input.len()
    }
}

impl ByteDecoder for RawCoder {
    type Output = Vec<u8>;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 text codec consuming the rest of its window.
///
/// Decoding is lossy: invalid sequences become `U+FFFD` rather than failing,
/// so a corrupted value still reads back as text. Like [`RawCoder`], the
/// encoding is unbounded and must come last in a composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringCoder;

impl ByteEncoder for StringCoder {
    type Input = String;

    fn encode_to<B>(&self, input: &String, buf: &mut B) -> Result<(), CodecError>
    where
        B: BufMut,
    {
        buf.put_slice(input.as_bytes());
        Ok(())
    }
}

impl PrecountingEncoder for StringCoder {
    fn underestimated_len(&self, input: &String) -> usize {
        input.len()
    }
}

impl ByteDecoder for StringCoder {
    type Output = String;

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_is_identity() {
        let bytes = vec![0, 255, 7];
        assert_eq!(RawCoder.encode(&bytes).unwrap(), bytes);
        assert_eq!(RawCoder.decode(&bytes).unwrap(), bytes);
        assert_eq!(RawCoder.decode(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn string_is_utf8() {
        let text = "größe".to_string();
        let encoded = StringCoder.encode_precounted(&text).unwrap();
        assert_eq!(encoded, text.as_bytes());
        assert_eq!(StringCoder.underestimated_len(&text), 7);
        assert_eq!(StringCoder.decode(&encoded).unwrap(), text);
    }

    #[test]
    fn string_decode_is_lossy() {
        let decoded = StringCoder.decode(&[b'o', b'k', 0xFF]).unwrap();
        assert_eq!(decoded, "ok\u{FFFD}");
    }
}
