//! Fixed-width numeric codecs.

use crate::{
    BoundedDecoder, ByteDecoder, ByteEncoder, ByteWindow, CodecError, FixedSizeDecoder,
    PrecountingEncoder,
};
use bytes::BufMut;
use core::marker::PhantomData;

/// Byte order applied symmetrically on encode and decode.
///
/// Big-endian encodings of unsigned integers sort the same way as the
/// integers themselves under a lexicographic byte comparison, which makes
/// [`Endianness::Big`] the usual choice for keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    #[default]
    Big,
}

impl Endianness {
    /// The byte order of the current target.
    pub const NATIVE: Self = if cfg!(target_endian = "little") { Self::Little } else { Self::Big };
}

/// A number with a fixed-width byte representation.
///
/// This trait is sealed. It is implemented for the primitive integers and
/// floats.
pub trait Numeric: Copy + sealed::Sealed {
    /// Width of the representation in bytes.
    const SIZE: usize;

    /// Append the representation to `buf` in the given byte order.
    fn put<B: BufMut>(self, buf: &mut B, endianness: Endianness);

    /// Read the representation from exactly [`Self::SIZE`] bytes.
    fn read(bytes: &[u8], endianness: Endianness) -> Self;
}

/// Marker for primitive integers.
pub trait Integer: Numeric {}

/// Marker for primitive floats.
pub trait Float: Numeric {}

#[allow(unreachable_pub)]
mod sealed {
    pub trait Sealed {}
}

macro_rules! numeric {
    ($marker:ident: $($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Numeric for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                fn put<B: BufMut>(self, buf: &mut B, endianness: Endianness) {
                    match endianness {
                        Endianness::Little => buf.put_slice(&self.to_le_bytes()),
                        Endianness::Big => buf.put_slice(&self.to_be_bytes()),
                    }
                }

                fn read(bytes: &[u8], endianness: Endianness) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    match endianness {
                        Endianness::Little => <$ty>::from_le_bytes(raw),
                        Endianness::Big => <$ty>::from_be_bytes(raw),
                    }
                }
            }

            impl $marker for $ty {}
        )*
    };
}

numeric!(Integer: u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);
numeric!(Float: f32, f64);

macro_rules! numeric_coder {
    ($(#[$doc:meta])* $name:ident, $bound:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name<T> {
            endianness: Endianness,
            _marker: PhantomData<fn() -> T>,
        }

        impl<T: $bound> $name<T> {
            /// Create a codec with the given byte order.
            pub const fn new(endianness: Endianness) -> Self {
                Self { endianness, _marker: PhantomData }
            }

            /// Create a big-endian codec.
            pub const fn big_endian() -> Self {
                Self::new(Endianness::Big)
            }

            /// Create a little-endian codec.
            pub const fn little_endian() -> Self {
                Self::new(Endianness::Little)
            }

            /// The byte order of this codec.
            pub const fn endianness(&self) -> Endianness {
                self.endianness
            }
        }

        impl<T: $bound> Default for $name<T> {
            fn default() -> Self {
                Self::new(Endianness::default())
            }
        }

        impl<T: $bound> ByteEncoder for $name<T> {
            type Input = T;

            fn encode_to<B>(&self, input: &T, buf: &mut B) -> Result<(), CodecError>
            where
                B: BufMut,
            {
                input.put(buf, self.endianness);
                Ok(())
            }
        }

        impl<T: $bound> PrecountingEncoder for $name<T> {
            fn underestimated_len(&self, _input: &T) -> usize {
                T::SIZE
            }
        }

        impl<T: $bound> ByteDecoder for $name<T> {
            type Output = T;

            fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
                CodecError::check_exact(T::SIZE, bytes.len())?;
                Ok(T::read(bytes, self.endianness))
            }
        }

        impl<T: $bound> BoundedDecoder for $name<T> {
            fn scan<'a>(&self, window: &mut ByteWindow<'a>) -> Result<&'a [u8], CodecError> {
                window.carve(T::SIZE)
            }
        }

        impl<T: $bound> FixedSizeDecoder for $name<T> {
            fn byte_count(&self) -> usize {
                T::SIZE
            }
        }
    };
}

numeric_coder!(
    /// Codec for primitive integers with a configurable byte order.
    IntCoder,
    Integer
);

numeric_coder!(
    /// Codec for primitive floats with a configurable byte order.
    ///
    /// Floats are stored as their IEEE-754 bit pattern. The encoding does not
    /// sort numerically under a byte comparison.
    FloatCoder,
    Float
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_layout() {
        let coder = IntCoder::<u32>::big_endian();
        assert_eq!(coder.encode(&0x0102_0304).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(coder.decode(&[1, 2, 3, 4]).unwrap(), 0x0102_0304);
    }

    #[test]
    fn little_endian_layout() {
        let coder = IntCoder::<u16>::little_endian();
        assert_eq!(coder.encode(&0xBEEF).unwrap(), vec![0xEF, 0xBE]);
        assert_eq!(coder.decode(&[0xEF, 0xBE]).unwrap(), 0xBEEF);
    }

    #[test]
    fn signed_and_wide_values_survive() {
        let coder = IntCoder::<i128>::little_endian();
        for value in [i128::MIN, -1, 0, 1, i128::MAX] {
            assert_eq!(coder.decode(&coder.encode(&value).unwrap()).unwrap(), value);
        }
    }

    #[test]
    fn big_endian_unsigned_sorts_bytewise() {
        let coder = IntCoder::<u64>::big_endian();
        let small = coder.encode(&255).unwrap();
        let large = coder.encode(&256).unwrap();
        assert!(small < large);
    }

    #[test]
    fn floats_keep_their_bits() {
        let coder = FloatCoder::<f64>::big_endian();
        let encoded = coder.encode(&-0.5).unwrap();
        assert_eq!(encoded.len(), 8);
        assert_eq!(coder.decode(&encoded).unwrap(), -0.5);

        let nan = FloatCoder::<f32>::little_endian();
        assert!(nan.decode(&nan.encode(&f32::NAN).unwrap()).unwrap().is_nan());
    }

    #[test]
    fn short_window_fails() {
        let coder = IntCoder::<u32>::default();
        let err = coder.decode(&[0, 1]).unwrap_err();
        assert!(matches!(err, CodecError::InsufficientData { needed: 4, available: 2 }));
    }

    #[test]
    fn long_window_fails() {
        let coder = IntCoder::<u8>::default();
        let err = coder.decode(&[0, 1]).unwrap_err();
        assert!(matches!(err, CodecError::InexactDecode { extra_bytes: 1 }));
    }

    #[test]
    fn decode_from_leaves_the_rest() {
        let coder = IntCoder::<u16>::big_endian();
        let mut window = ByteWindow::new(&[0, 7, 0xAA]);
        assert_eq!(coder.decode_from(&mut window).unwrap(), 7);
        assert_eq!(window.as_slice(), &[0xAA]);
        assert_eq!(coder.byte_count(), 2);
    }
}
