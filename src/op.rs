use std::io::{self, Write};

use crate::pixel::Pixel;

pub const QOI_OP_INDEX: u8 = 0b00000000;
pub const QOI_OP_DIFF: u8 = 0b01000000;
pub const QOI_OP_LUMA: u8 = 0b10000000;
pub const QOI_OP_RUN: u8 = 0b11000000;
pub const QOI_OP_RGB: u8 = 0b11111110;
pub const QOI_OP_RGBA: u8 = 0b11111111;

pub const QOI_MASK_2: u8 = 0b11000000;
pub const QOI_PAYLOAD_6: u8 = 0b00111111;

pub const END_MARKER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];

pub const DIFF_BIAS: i8 = 2;
pub const LUMA_GREEN_BIAS: i8 = 32;
pub const LUMA_BIAS: i8 = 8;
pub const RUN_BIAS: u8 = 1;

/// Longest run a single instruction may carry. 63 and 64 would collide with
/// the two literal tags.
pub const MAX_RUN: u8 = 62;

/// Leading-bit classification of an instruction byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Rgb,
    Rgba,
    Index,
    Diff,
    Luma,
    Run,
}

impl Tag {
    /// The eight-bit literal tags are checked first; every other byte is
    /// classified by its two leading bits.
    #[inline]
    pub fn of(byte: u8) -> Tag {
        match byte {
            QOI_OP_RGB => Tag::Rgb,
            QOI_OP_RGBA => Tag::Rgba,
            _ => match byte & QOI_MASK_2 {
                QOI_OP_INDEX => Tag::Index,
                QOI_OP_DIFF => Tag::Diff,
                QOI_OP_LUMA => Tag::Luma,
                _ => Tag::Run,
            },
        }
    }

    /// Payload bytes following the tag byte.
    pub fn payload_len(self) -> usize {
        match self {
            Tag::Rgb => 3,
            Tag::Rgba => 4,
            Tag::Luma => 1,
            Tag::Index | Tag::Diff | Tag::Run => 0,
        }
    }
}

/// One instruction of the body stream, with deltas held unbiased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Rgb { r: u8, g: u8, b: u8 },
    Rgba { r: u8, g: u8, b: u8, a: u8 },
    Index(u8),
    Diff { dr: i8, dg: i8, db: i8 },
    Luma { dg: i8, dr_dg: i8, db_dg: i8 },
    Run(u8),
}

#[inline]
pub fn fits_diff(d: i8) -> bool {
    (-DIFF_BIAS..DIFF_BIAS).contains(&d)
}

#[inline]
pub fn fits_luma_green(dg: i8) -> bool {
    (-LUMA_GREEN_BIAS..LUMA_GREEN_BIAS).contains(&dg)
}

#[inline]
pub fn fits_luma(d: i16) -> bool {
    (-(LUMA_BIAS as i16)..LUMA_BIAS as i16).contains(&d)
}

impl Op {
    /// Picks the literal or difference instruction that takes `previous` to
    /// `current`. Runs and cache hits are the caller's business.
    pub fn for_change(previous: &Pixel, current: &Pixel) -> Op {
        let [dr, dg, db, da] = current.delta(previous);
        let [r, g, b, a] = current.rgba();

        if da != 0 {
            return Op::Rgba { r, g, b, a };
        }
        if fits_diff(dr) && fits_diff(dg) && fits_diff(db) {
            return Op::Diff { dr, dg, db };
        }

        let dr_dg = dr as i16 - dg as i16;
        let db_dg = db as i16 - dg as i16;
        if fits_luma_green(dg) && fits_luma(dr_dg) && fits_luma(db_dg) {
            return Op::Luma {
                dg,
                dr_dg: dr_dg as i8,
                db_dg: db_dg as i8,
            };
        }

        Op::Rgb { r, g, b }
    }

    /// Unpacks a difference byte.
    #[inline]
    pub fn diff(byte: u8) -> Op {
        Op::Diff {
            dr: ((byte >> 4) & 0x03) as i8 - DIFF_BIAS,
            dg: ((byte >> 2) & 0x03) as i8 - DIFF_BIAS,
            db: (byte & 0x03) as i8 - DIFF_BIAS,
        }
    }

    /// Unpacks a two-byte luma instruction.
    #[inline]
    pub fn luma(b1: u8, b2: u8) -> Op {
        Op::Luma {
            dg: (b1 & QOI_PAYLOAD_6) as i8 - LUMA_GREEN_BIAS,
            dr_dg: (b2 >> 4) as i8 - LUMA_BIAS,
            db_dg: (b2 & 0x0f) as i8 - LUMA_BIAS,
        }
    }

    /// Repetition count carried by a run byte. May exceed [`MAX_RUN`] for
    /// bytes that are not legal runs.
    #[inline]
    pub fn run_length(byte: u8) -> u8 {
        (byte & QOI_PAYLOAD_6) + RUN_BIAS
    }

    /// Applies a difference instruction to `previous`. Other variants carry
    /// no delta and leave the pixel as is.
    #[inline]
    pub fn apply(self, previous: &Pixel) -> Pixel {
        match self {
            Op::Diff { dr, dg, db } => previous.add_rgb(dr, dg, db),
            Op::Luma { dg, dr_dg, db_dg } => {
                previous.add_rgb(dg.wrapping_add(dr_dg), dg, dg.wrapping_add(db_dg))
            }
            Op::Rgb { r, g, b } => previous.with_rgb(r, g, b),
            Op::Rgba { r, g, b, a } => Pixel::new(r, g, b, a),
            Op::Index(_) | Op::Run(_) => *previous,
        }
    }

    /// Serialized form; returns the buffer and the number of bytes used.
    ///
    /// Payloads are masked to their field width so the tag is always the
    /// variant's own. Run counts are clamped to `1..=MAX_RUN`.
    pub fn to_bytes(self) -> ([u8; 5], usize) {
        match self {
            Op::Rgb { r, g, b } => ([QOI_OP_RGB, r, g, b, 0], 4),
            Op::Rgba { r, g, b, a } => ([QOI_OP_RGBA, r, g, b, a], 5),
            Op::Index(index) => ([QOI_OP_INDEX | (index & QOI_PAYLOAD_6), 0, 0, 0, 0], 1),
            Op::Diff { dr, dg, db } => {
                let field = |d: i8| d.wrapping_add(DIFF_BIAS) as u8 & 0x03;
                let byte = QOI_OP_DIFF | field(dr) << 4 | field(dg) << 2 | field(db);
                ([byte, 0, 0, 0, 0], 1)
            }
            Op::Luma { dg, dr_dg, db_dg } => {
                let nibble = |d: i8| d.wrapping_add(LUMA_BIAS) as u8 & 0x0f;
                let green = dg.wrapping_add(LUMA_GREEN_BIAS) as u8 & QOI_PAYLOAD_6;
                ([QOI_OP_LUMA | green, nibble(dr_dg) << 4 | nibble(db_dg), 0, 0, 0], 2)
            }
            Op::Run(count) => {
                let count = count.clamp(RUN_BIAS, MAX_RUN);
                ([QOI_OP_RUN | (count - RUN_BIAS), 0, 0, 0, 0], 1)
            }
        }
    }

    #[inline]
    pub fn write_to<W: Write>(self, out: &mut W) -> io::Result<()> {
        let (bytes, len) = self.to_bytes();
        out.write_all(&bytes[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(op: Op) -> Vec<u8> {
        let (bytes, len) = op.to_bytes();
        bytes[..len].to_vec()
    }

    #[test]
    fn literal_tags_win_over_run_bits() {
        assert_eq!(Tag::of(0xfe), Tag::Rgb);
        assert_eq!(Tag::of(0xff), Tag::Rgba);
        assert_eq!(Tag::of(0xfd), Tag::Run);
        assert_eq!(Tag::of(0x3f), Tag::Index);
        assert_eq!(Tag::of(0x40), Tag::Diff);
        assert_eq!(Tag::of(0xbf), Tag::Luma);
    }

    #[test]
    fn diff_boundaries() {
        let previous = Pixel::new(100, 100, 100, 255);

        let op = Op::for_change(&previous, &Pixel::new(98, 101, 98, 255));
        assert_eq!(op, Op::Diff { dr: -2, dg: 1, db: -2 });
        assert_eq!(bytes(op), vec![0b01_00_11_00]);

        // -3 on red: no longer a diff, but still a luma.
        let op = Op::for_change(&previous, &Pixel::new(97, 100, 100, 255));
        assert_eq!(op, Op::Luma { dg: 0, dr_dg: -3, db_dg: 0 });

        // +2 on green: luma with compensated red and blue.
        let op = Op::for_change(&previous, &Pixel::new(100, 102, 100, 255));
        assert_eq!(op, Op::Luma { dg: 2, dr_dg: -2, db_dg: -2 });
    }

    #[test]
    fn luma_boundaries() {
        let previous = Pixel::new(100, 100, 100, 255);

        let op = Op::for_change(&previous, &Pixel::new(60, 68, 75, 255));
        assert_eq!(op, Op::Luma { dg: -32, dr_dg: -8, db_dg: 7 });
        assert_eq!(bytes(op), vec![0b10_000000, 0b0000_1111]);

        let op = Op::for_change(&previous, &Pixel::new(138, 131, 123, 255));
        assert_eq!(op, Op::Luma { dg: 31, dr_dg: 7, db_dg: -8 });
        assert_eq!(bytes(op), vec![0b10_111111, 0b1111_0000]);

        // One step past each limit falls back to a literal.
        for current in [
            Pixel::new(67, 67, 67, 255),
            Pixel::new(132, 132, 132, 255),
            Pixel::new(59, 68, 68, 255),
            Pixel::new(100, 100, 108, 255),
        ] {
            assert_eq!(
                Op::for_change(&previous, &current),
                Op::Rgb {
                    r: current.r(),
                    g: current.g(),
                    b: current.b()
                }
            );
        }
    }

    #[test]
    fn alpha_change_forces_rgba() {
        let op = Op::for_change(&Pixel::START, &Pixel::ZERO);
        assert_eq!(
            op,
            Op::Rgba {
                r: 0,
                g: 0,
                b: 0,
                a: 0
            }
        );
        assert_eq!(bytes(op), vec![QOI_OP_RGBA, 0, 0, 0, 0]);
    }

    #[test]
    fn unpacks_what_it_packs() {
        let ops = [
            Op::Diff { dr: -2, dg: 0, db: 1 },
            Op::Luma { dg: -32, dr_dg: 7, db_dg: -8 },
            Op::Luma { dg: 31, dr_dg: 0, db_dg: 3 },
        ];
        for op in ops {
            let (b, _) = op.to_bytes();
            let decoded = match Tag::of(b[0]) {
                Tag::Diff => Op::diff(b[0]),
                Tag::Luma => Op::luma(b[0], b[1]),
                tag => panic!("unexpected tag {:?}", tag),
            };
            assert_eq!(decoded, op);
        }
    }

    #[test]
    fn diffs_wrap_around() {
        let pixel = Op::Diff { dr: 1, dg: -2, db: 0 }.apply(&Pixel::new(255, 1, 7, 9));
        assert_eq!(pixel, Pixel::new(0, 255, 7, 9));

        let pixel = Op::Luma { dg: -32, dr_dg: -8, db_dg: 7 }.apply(&Pixel::new(10, 10, 10, 1));
        assert_eq!(pixel, Pixel::new(226, 234, 241, 1));
    }

    #[test]
    fn run_encoding() {
        assert_eq!(bytes(Op::Run(1)), vec![0xc0]);
        assert_eq!(bytes(Op::Run(MAX_RUN)), vec![0xfd]);
        assert_eq!(Op::run_length(0xc0), 1);
        assert_eq!(Op::run_length(0xfd), MAX_RUN);
        assert_eq!(Op::run_length(0xfe), 63);
    }

    #[test]
    fn out_of_range_runs_stay_runs() {
        assert_eq!(bytes(Op::Run(0)), vec![0xc0]);
        assert_eq!(bytes(Op::Run(63)), vec![0xfd]);
        assert_eq!(bytes(Op::Run(u8::MAX)), vec![0xfd]);
    }

    #[test]
    fn oversized_deltas_keep_their_tag() {
        let diff = bytes(Op::Diff { dr: 127, dg: -128, db: 5 });
        assert_eq!(diff.len(), 1);
        assert_eq!(Tag::of(diff[0]), Tag::Diff);

        let luma = bytes(Op::Luma { dg: 100, dr_dg: -100, db_dg: 90 });
        assert_eq!(luma.len(), 2);
        assert_eq!(Tag::of(luma[0]), Tag::Luma);
    }

    #[test]
    fn index_encoding() {
        assert_eq!(bytes(Op::Index(53)), vec![53]);
    }
}
