//! Composable binary codecs over borrowed byte windows.
//!
//! A codec turns values into bytes and back. Small codecs for numbers, text
//! and raw bytes compose into codecs for pairs, fixed-count vectors and
//! user-domain types, so a single codec value fully describes the byte layout
//! of a key or value.
//!
//! # Trait Model
//!
//! ```text
//! ByteEncoder                 ← encode Input into a BufMut
//!   └─ PrecountingEncoder     ← lower-bound size estimate
//! ByteDecoder                 ← decode one complete window into Output
//!   └─ BoundedDecoder         ← carve own prefix off a shared ByteWindow
//!        ├─ FixedSizeDecoder  ← always byte_count() bytes
//!        └─ DynamicSizeDecoder← length depends on the value
//! ByteCoder                   ← encoder + decoder with Output == Input
//! ```
//!
//! Decoding a complete window must account for every byte. A composite codec
//! consumes its window in field order, and only an unbounded final field may
//! take "the rest".
//!
//! ```
//! use durable_codec::{ByteDecoder, ByteEncoder, IntCoder, StringCoder, TupleCoder};
//!
//! let coder = TupleCoder::new(IntCoder::<u32>::big_endian(), StringCoder);
//! let bytes = coder.encode(&(42, "answer".to_string())).unwrap();
//! assert_eq!(coder.decode(&bytes).unwrap(), (42, "answer".to_string()));
//! ```

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod codable;
pub use codable::ByteCodable;

mod error;
pub use error::CodecError;

pub mod map;
pub use map::{DecoderExt, EncoderExt, MapInput, MapOutput};

mod num;
pub use num::{Endianness, Float, FloatCoder, IntCoder, Integer, Numeric};

mod prefixed;
pub use prefixed::{LENGTH_PREFIX_SIZE, LengthPrefixed};

mod raw;
pub use raw::{RawCoder, StringCoder};

mod traits;
pub use traits::{
    BoundedDecoder, ByteCoder, ByteDecoder, ByteEncoder, CodedItem, DynamicSizeDecoder,
    FixedSizeDecoder, PrecountingEncoder,
};

mod tuple;
pub use tuple::TupleCoder;

mod vector;
pub use vector::VectorCoder;

mod window;
pub use window::ByteWindow;
