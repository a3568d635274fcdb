use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::ops::Range;

use crate::error::{Error, Phase, Result};
use crate::grid::PixelSource;
use crate::header::Header;
use crate::op::{Op, END_MARKER, MAX_RUN};
use crate::pixel::{Pixel, PixelCache};

mod parallel;

/// Strips per available hardware thread when [`Parallelism::Auto`] is used.
pub const STRIPS_PER_THREAD: usize = 8;

/// How the body of an image is split up for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// One pass over the whole image on the calling thread.
    Serial,
    /// A fixed number of horizontal strips, encoded concurrently.
    Strips(NonZeroUsize),
    /// [`STRIPS_PER_THREAD`] strips per available hardware thread.
    #[default]
    Auto,
}

impl Parallelism {
    pub fn strip_count(self) -> usize {
        match self {
            Parallelism::Serial => 1,
            Parallelism::Strips(n) => n.get(),
            Parallelism::Auto => {
                let threads = std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1);
                threads * STRIPS_PER_THREAD
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    parallelism: Parallelism,
}

impl EncodeOptions {
    pub fn new() -> Self {
        EncodeOptions::default()
    }

    pub fn serial() -> Self {
        EncodeOptions::new().parallelism(Parallelism::Serial)
    }

    /// `n` strips; zero is treated as one.
    pub fn strips(n: usize) -> Self {
        let parallelism = match NonZeroUsize::new(n) {
            Some(n) => Parallelism::Strips(n),
            None => Parallelism::Serial,
        };
        EncodeOptions::new().parallelism(parallelism)
    }

    pub fn parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn get_parallelism(&self) -> Parallelism {
        self.parallelism
    }
}

/// Encodes `source` into `writer` with the default, hardware-derived number
/// of strips.
pub fn encode<S, W>(source: &S, writer: W) -> Result<()>
where
    S: PixelSource + Sync + ?Sized,
    W: Write,
{
    encode_with(source, writer, &EncodeOptions::default())
}

/// Encodes `source` into `writer`.
///
/// The end marker is only written once the whole body has been produced; on
/// error the writer may hold a partial stream but never a terminated one.
pub fn encode_with<S, W>(source: &S, mut writer: W, options: &EncodeOptions) -> Result<()>
where
    S: PixelSource + Sync + ?Sized,
    W: Write,
{
    let (width, height) = source.dimensions();
    let strips = options.parallelism.strip_count();
    let bodies = if strips <= 1 || height <= 1 || width == 0 {
        None
    } else {
        Some(parallel::encode_strips(source, strips)?)
    };

    // Straight to the sink, so a rejected header is reported as such.
    Header::new(width, height).write_to(&mut writer)?;

    let mut out = BufWriter::new(writer);
    match bodies {
        Some(bodies) => {
            for strip in &bodies {
                out.write_all(strip)
                    .map_err(|e| Error::write(Phase::WriteBody, e))?;
            }
        }
        None => StripEncoder::starting_at(source, 0)
            .encode_rows(0..height, &mut out)
            .map_err(|e| Error::write(Phase::WriteBody, e))?,
    }

    out.write_all(&END_MARKER)
        .and_then(|()| out.flush())
        .map_err(|e| Error::write(Phase::WriteBody, e))
}

pub fn encode_to_vec<S>(source: &S) -> Result<Vec<u8>>
where
    S: PixelSource + Sync + ?Sized,
{
    encode_to_vec_with(source, &EncodeOptions::default())
}

pub fn encode_to_vec_with<S>(source: &S, options: &EncodeOptions) -> Result<Vec<u8>>
where
    S: PixelSource + Sync + ?Sized,
{
    let mut bytes = Vec::new();
    encode_with(source, &mut bytes, options)?;
    Ok(bytes)
}

/// Encoder state for one contiguous band of rows.
///
/// A band starting at row 0 takes opaque black as its previous pixel, like
/// the decoder; a band further down takes the last pixel of the row above.
/// The cache always starts cold: a slot only yields an index once this band
/// has written it, whatever the decoder's cache holds at that point.
pub(crate) struct StripEncoder<'a, S: ?Sized> {
    source: &'a S,
    width: u32,
    previous: Pixel,
    cache: PixelCache,
    run: u8,
}

impl<'a, S: PixelSource + ?Sized> StripEncoder<'a, S> {
    pub(crate) fn starting_at(source: &'a S, first_row: u32) -> Self {
        let (width, _) = source.dimensions();
        let previous = if first_row == 0 || width == 0 {
            Pixel::START
        } else {
            Pixel::from(source.pixel(width - 1, first_row - 1))
        };
        StripEncoder {
            source,
            width,
            previous,
            cache: PixelCache::cold(),
            run: 0,
        }
    }

    pub(crate) fn encode_rows<W: Write>(&mut self, rows: Range<u32>, out: &mut W) -> io::Result<()> {
        for y in rows {
            for x in 0..self.width {
                let px = Pixel::from(self.source.pixel(x, y));
                self.push(px, out)?;
            }
        }
        self.flush_run(out)
    }

    fn push<W: Write>(&mut self, px: Pixel, out: &mut W) -> io::Result<()> {
        if px == self.previous {
            self.run += 1;
            if self.run == MAX_RUN {
                self.flush_run(out)?;
            }
            return Ok(());
        }
        self.flush_run(out)?;

        let op = if self.cache.contains(&px) {
            Op::Index(px.hash())
        } else {
            self.cache.insert(px);
            Op::for_change(&self.previous, &px)
        };
        op.write_to(out)?;
        self.previous = px;
        Ok(())
    }

    fn flush_run<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.run > 0 {
            Op::Run(self.run).write_to(out)?;
            self.run = 0;
        }
        Ok(())
    }
}
