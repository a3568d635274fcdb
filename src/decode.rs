use std::io::{BufReader, Read};

use crate::error::{Error, Phase, Result};
use crate::grid::Image;
use crate::header::{Header, HEADER_SIZE};
use crate::op::{Op, Tag, MAX_RUN, QOI_PAYLOAD_6};
use crate::pixel::{Pixel, PixelCache};

/// Reads the header only, leaving the body untouched.
pub fn decode_header<R: Read>(reader: R) -> Result<Header> {
    Header::read_from(reader)
}

/// Decodes a complete QOI stream into an RGBA image.
pub fn decode<R: Read>(reader: R) -> Result<Image> {
    Decoder::new(reader)?.decode()
}

pub fn decode_from_slice(bytes: &[u8]) -> Result<Image> {
    Decoder::from_slice(bytes)?.decode()
}

/// A decoder that has already consumed the header.
///
/// Inspect [`Decoder::header`] before committing to the allocation made by
/// [`Decoder::decode`].
pub struct Decoder<R> {
    reader: R,
    header: Header,
    offset: u64,
}

impl<R: Read> Decoder<BufReader<R>> {
    pub fn new(reader: R) -> Result<Self> {
        Decoder::from_reader(BufReader::new(reader))
    }
}

impl<'a> Decoder<&'a [u8]> {
    pub fn from_slice(bytes: &'a [u8]) -> Result<Self> {
        Decoder::from_reader(bytes)
    }
}

impl<R: Read> Decoder<R> {
    fn from_reader(mut reader: R) -> Result<Self> {
        let header = Header::read_from(&mut reader)?;
        Ok(Decoder {
            reader,
            header,
            offset: HEADER_SIZE as u64,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Replays the instruction stream until every pixel is filled. Bytes after
    /// the last pixel, normally the end marker, are not read.
    pub fn decode(mut self) -> Result<Image> {
        let Header { width, height, .. } = self.header;
        let too_large = Error::ImageTooLarge { width, height };
        if self.header.exceeds_pixel_limit() {
            return Err(too_large);
        }
        let len = self.header.buffer_len().ok_or(too_large)?;
        log::trace!("decoding {}x{} image ({} bytes)", width, height, len);

        let mut pixels: Vec<u8> = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| Error::ImageTooLarge { width, height })?;
        pixels.resize(len, 0);
        let mut cache = PixelCache::new();
        let mut px = Pixel::START;
        let mut pos = 0;

        while pos < len {
            let byte = self.next_byte()?;
            let mut count = 1;
            match Tag::of(byte) {
                Tag::Rgb => {
                    let [r, g, b] = self.read_array()?;
                    px = px.with_rgb(r, g, b);
                }
                Tag::Rgba => {
                    px = Pixel::from_rgba(self.read_array()?);
                }
                Tag::Index => {
                    px = cache.get(byte & QOI_PAYLOAD_6);
                }
                Tag::Diff => {
                    px = Op::diff(byte).apply(&px);
                }
                Tag::Luma => {
                    let b2 = self.next_byte()?;
                    px = Op::luma(byte, b2).apply(&px);
                }
                Tag::Run => {
                    count = run_length(byte, self.offset - 1)? as usize;
                }
            }

            let end = len.min(pos + count * 4);
            for chunk in pixels[pos..end].chunks_exact_mut(4) {
                chunk.copy_from_slice(&px.rgba());
                cache.insert(px);
            }
            pos = end;
        }

        Image::new(width, height, pixels)
    }

    fn next_byte(&mut self) -> Result<u8> {
        let [byte] = self.read_array()?;
        Ok(byte)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0; N];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| Error::read(Phase::ReadBody, self.offset, e))?;
        self.offset += N as u64;
        Ok(buf)
    }
}

fn run_length(byte: u8, offset: u64) -> Result<u8> {
    let length = Op::run_length(byte);
    if length > MAX_RUN {
        return Err(Error::IllegalRunLength { length, offset });
    }
    Ok(length)
}
