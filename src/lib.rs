//! Lossless encoder and decoder for the QOI ("Quite OK Image") format.
//!
//! Decoding produces straight 8-bit RGBA; encoding accepts anything that
//! implements [`PixelSource`]. The encoder can split the image into
//! horizontal strips and encode them concurrently, which trades a little
//! compression at strip boundaries for throughput. Every strip
//! configuration decodes to the same pixels.
//!
//! ```
//! let img = quoi::Image::from_fn(16, 16, |x, y| [x as u8 * 16, y as u8 * 16, 0, 255])?;
//! let bytes = quoi::encode_to_vec(&img)?;
//! assert_eq!(quoi::decode_from_slice(&bytes)?, img);
//! # Ok::<(), quoi::Error>(())
//! ```
#![forbid(unsafe_code)]

mod decode;
mod encode;
mod error;
mod grid;
mod header;
mod op;
mod pixel;

pub use crate::decode::{decode, decode_from_slice, decode_header, Decoder};
pub use crate::encode::{
    encode, encode_to_vec, encode_to_vec_with, encode_with, EncodeOptions, Parallelism,
    STRIPS_PER_THREAD,
};
pub use crate::error::{Error, Phase, Result};
pub use crate::grid::{Image, PixelSource};
pub use crate::header::{Header, HEADER_SIZE, MAGIC, MAX_PIXELS};
pub use crate::op::{Op, Tag, END_MARKER, MAX_RUN};
pub use crate::pixel::{Pixel, PixelCache, CACHE_SIZE};
