use std::ops::Range;

use rayon::prelude::*;

use super::StripEncoder;
use crate::error::{Error, Phase, Result};
use crate::grid::PixelSource;

/// Splits `height` rows into at most `strips` bands of `ceil(height / strips)`
/// rows. The last band takes whatever is left; bands that would be empty are
/// dropped.
pub(crate) fn strip_rows(height: u32, strips: usize) -> Vec<Range<u32>> {
    let strips = strips.max(1) as u64;
    let per_strip = (height as u64 + strips - 1) / strips;
    if per_strip == 0 {
        return Vec::new();
    }
    (0..strips)
        .map(|i| {
            let start = (i * per_strip).min(height as u64) as u32;
            let end = ((i + 1) * per_strip).min(height as u64) as u32;
            start..end
        })
        .filter(|rows| !rows.is_empty())
        .collect()
}

/// Encodes each band on the rayon pool and returns the bodies in band order.
/// The first failing band aborts the whole encode.
pub(crate) fn encode_strips<S>(source: &S, strips: usize) -> Result<Vec<Vec<u8>>>
where
    S: PixelSource + Sync + ?Sized,
{
    let (width, height) = source.dimensions();
    let bands = strip_rows(height, strips);
    log::debug!(
        "encoding {}x{} image in {} strips of up to {} rows",
        width,
        height,
        bands.len(),
        bands.first().map_or(0, |rows| rows.len())
    );

    let bodies = bands
        .into_par_iter()
        .enumerate()
        .map(|(index, rows)| encode_strip(source, index, rows))
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "strip bodies total {} bytes",
        bodies.iter().map(Vec::len).sum::<usize>()
    );
    Ok(bodies)
}

fn encode_strip<S>(source: &S, index: usize, rows: Range<u32>) -> Result<Vec<u8>>
where
    S: PixelSource + ?Sized,
{
    let (width, _) = source.dimensions();
    let mut out = Vec::with_capacity(width as usize * rows.len());
    StripEncoder::starting_at(source, rows.start)
        .encode_rows(rows.clone(), &mut out)
        .map_err(|e| Error::write(Phase::WriteBody, e))?;
    log::trace!("strip {} (rows {:?}) encoded to {} bytes", index, rows, out.len());
    Ok(out)
}
