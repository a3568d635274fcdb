use std::io::{Read, Write};

use crate::error::{Error, Phase, Result};

pub const MAGIC: [u8; 4] = *b"qoif";
pub const HEADER_SIZE: usize = 14;

/// Channel count written by the encoder. Images are always stored as RGBA.
pub const CHANNELS_RGBA: u8 = 4;
/// Colorspace written by the encoder: all channels linear.
pub const COLORSPACE_LINEAR: u8 = 1;

/// Largest pixel count the decoder will allocate for. Headers are untrusted
/// input, so anything bigger is refused before reading the body.
pub const MAX_PIXELS: usize = 400_000_000;

/// The fixed 14-byte QOI header.
///
/// `channels` and `colorspace` are informative only; the decoder keeps
/// whatever the stream says and always produces RGBA output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub colorspace: u8,
}

impl Header {
    pub fn new(width: u32, height: u32) -> Self {
        Header {
            width,
            height,
            channels: CHANNELS_RGBA,
            colorspace: COLORSPACE_LINEAR,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|header| header.try_into().ok())
            .ok_or(Error::TruncatedInput {
                phase: Phase::ReadHeader,
                offset: bytes.len() as u64,
            })?;

        let magic = [header[0], header[1], header[2], header[3]];
        if magic != MAGIC {
            return Err(Error::InvalidMagic { found: magic });
        }

        Ok(Header {
            width: u32::from_be_bytes([header[4], header[5], header[6], header[7]]),
            height: u32::from_be_bytes([header[8], header[9], header[10], header[11]]),
            channels: header[12],
            colorspace: header[13],
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0; HEADER_SIZE];
        bytes[..4].copy_from_slice(&MAGIC);
        bytes[4..8].copy_from_slice(&self.width.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.height.to_be_bytes());
        bytes[12] = self.channels;
        bytes[13] = self.colorspace;
        bytes
    }

    /// Reads exactly [`HEADER_SIZE`] bytes from `reader` and parses them.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        reader
            .take(HEADER_SIZE as u64)
            .read_to_end(&mut bytes)
            .map_err(|e| Error::read(Phase::ReadHeader, bytes.len() as u64, e))?;
        Header::from_bytes(&bytes)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer
            .write_all(&self.to_bytes())
            .map_err(|e| Error::write(Phase::WriteHeader, e))
    }

    /// Number of pixels in the image, or `None` if it overflows `usize`.
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Whether a decoder should refuse to allocate for this image.
    pub fn exceeds_pixel_limit(&self) -> bool {
        self.pixel_count().map_or(true, |n| n > MAX_PIXELS)
    }

    /// Size of the decoded RGBA buffer, or `None` if it overflows `usize`.
    pub fn buffer_len(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(CHANNELS_RGBA as usize)
    }
}
