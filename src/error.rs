use core::fmt;
use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The stage of a decode or encode in which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ReadHeader,
    ReadBody,
    WriteHeader,
    WriteBody,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::ReadHeader => "reading the header",
            Phase::ReadBody => "reading the image body",
            Phase::WriteHeader => "writing the header",
            Phase::WriteBody => "writing the image body",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid magic bytes (expected \"qoif\", found {found:?})")]
    InvalidMagic { found: [u8; 4] },

    /// The input ended before a header field or instruction payload was complete.
    #[error("input truncated while {phase} at byte {offset}")]
    TruncatedInput { phase: Phase, offset: u64 },

    /// A run instruction decoded to more than 62 repetitions.
    #[error("illegal run length {length} at byte {offset}")]
    IllegalRunLength { length: u8, offset: u64 },

    #[error("i/o error while {phase}: {source}")]
    Io {
        phase: Phase,
        #[source]
        source: io::Error,
    },

    #[error("pixel buffer holds {actual} bytes but a {width}x{height} RGBA image needs {expected}")]
    InvalidBufferLength {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("a {width}x{height} image does not fit in memory")]
    ImageTooLarge { width: u32, height: u32 },
}

impl Error {
    /// Classifies a failed read: running out of bytes is `TruncatedInput`,
    /// anything else is passed through as `Io`.
    pub(crate) fn read(phase: Phase, offset: u64, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedInput { phase, offset }
        } else {
            Error::Io { phase, source }
        }
    }

    pub(crate) fn write(phase: Phase, source: io::Error) -> Self {
        Error::Io { phase, source }
    }
}
