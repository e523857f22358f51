use crate::{ByteCoder, FloatCoder, IntCoder, RawCoder, StringCoder};

/// A type with a canonical codec.
///
/// Integers use the big-endian [`IntCoder`], whose byte order sorts unsigned
/// values numerically under the standard byte comparison.
pub trait ByteCodable: Sized {
    /// The canonical codec for this type.
    type Coder: ByteCoder<Input = Self>;

    /// Instantiate the canonical codec.
    fn coder() -> Self::Coder;
}

macro_rules! codable_numeric {
    ($coder:ident: $($ty:ty),* $(,)?) => {
        $(
            impl ByteCodable for $ty {
                type Coder = $coder<$ty>;

                fn coder() -> Self::Coder {
                    $coder::big_endian()
                }
            }
        )*
    };
}

codable_numeric!(IntCoder: u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);
codable_numeric!(FloatCoder: f32, f64);

impl ByteCodable for String {
    type Coder = StringCoder;

    fn coder() -> Self::Coder {
        StringCoder
    }
}

impl ByteCodable for Vec<u8> {
    type Coder = RawCoder;

    fn coder() -> Self::Coder {
        RawCoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ByteDecoder, ByteEncoder};

    fn round_trip<T: ByteCodable + PartialEq + core::fmt::Debug>(value: T) {
        let coder = T::coder();
        let bytes = coder.encode(&value).unwrap();
        assert_eq!(coder.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn canonical_coders_round_trip() {
        round_trip(0xABu8);
        round_trip(-12_345i32);
        round_trip(u128::MAX);
        round_trip(2.5f64);
        round_trip("héllo".to_string());
        round_trip(vec![0u8, 1, 2]);
    }

    #[test]
    fn unsigned_encodings_sort_numerically() {
        let coder = u64::coder();
        let small = coder.encode(&255).unwrap();
        let large = coder.encode(&256).unwrap();
        assert!(small < large);
    }
}
