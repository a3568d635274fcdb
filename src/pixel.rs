/// Number of slots in the running pixel cache.
pub const CACHE_SIZE: usize = 64;

/// A straight (non-premultiplied) RGBA pixel together with its cache slot.
///
/// The slot is computed on construction and on every channel change, so it is
/// never stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    rgba: [u8; 4],
    hash: u8,
}

impl Default for Pixel {
    fn default() -> Self {
        Pixel::ZERO
    }
}

impl Pixel {
    /// Transparent black, the value every cache slot starts with.
    pub const ZERO: Pixel = Pixel::new(0, 0, 0, 0);
    /// Opaque black, the pixel both encoder and decoder start from.
    pub const START: Pixel = Pixel::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Pixel {
            rgba: [r, g, b, a],
            hash: hash(r, g, b, a),
        }
    }

    pub const fn from_rgba(rgba: [u8; 4]) -> Self {
        Pixel::new(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    #[inline]
    pub const fn r(&self) -> u8 {
        self.rgba[0]
    }

    #[inline]
    pub const fn g(&self) -> u8 {
        self.rgba[1]
    }

    #[inline]
    pub const fn b(&self) -> u8 {
        self.rgba[2]
    }

    #[inline]
    pub const fn a(&self) -> u8 {
        self.rgba[3]
    }

    #[inline]
    pub const fn rgba(&self) -> [u8; 4] {
        self.rgba
    }

    /// Cache slot of this pixel, always in `0..64`.
    #[inline]
    pub const fn hash(&self) -> u8 {
        self.hash
    }

    /// Replaces red, green and blue; alpha is kept.
    #[inline]
    pub const fn with_rgb(&self, r: u8, g: u8, b: u8) -> Self {
        Pixel::new(r, g, b, self.a())
    }

    /// Adds signed deltas to red, green and blue with 8-bit wraparound.
    #[inline]
    pub const fn add_rgb(&self, dr: i8, dg: i8, db: i8) -> Self {
        self.with_rgb(
            self.r().wrapping_add(dr as u8),
            self.g().wrapping_add(dg as u8),
            self.b().wrapping_add(db as u8),
        )
    }

    /// Per-channel `self - previous`, reinterpreted as signed.
    #[inline]
    pub const fn delta(&self, previous: &Pixel) -> [i8; 4] {
        [
            self.r().wrapping_sub(previous.r()) as i8,
            self.g().wrapping_sub(previous.g()) as i8,
            self.b().wrapping_sub(previous.b()) as i8,
            self.a().wrapping_sub(previous.a()) as i8,
        ]
    }
}

impl From<[u8; 4]> for Pixel {
    fn from(rgba: [u8; 4]) -> Self {
        Pixel::from_rgba(rgba)
    }
}

impl From<Pixel> for [u8; 4] {
    fn from(pixel: Pixel) -> Self {
        pixel.rgba
    }
}

// 64 divides 256, so the wrapping u8 sum has the same residue as the exact one.
const fn hash(r: u8, g: u8, b: u8, a: u8) -> u8 {
    r.wrapping_mul(3)
        .wrapping_add(g.wrapping_mul(5))
        .wrapping_add(b.wrapping_mul(7))
        .wrapping_add(a.wrapping_mul(11))
        % CACHE_SIZE as u8
}

/// The 64-slot cache of recently seen pixels, indexed by [`Pixel::hash`].
///
/// A slot is overwritten by any later pixel with the same hash. Slots start
/// as [`Pixel::ZERO`]; in a *cold* cache those initial values are not
/// trusted and never produce a hit until the slot has been written.
#[derive(Debug, Clone)]
pub struct PixelCache {
    slots: [Pixel; CACHE_SIZE],
    written: u64,
}

impl Default for PixelCache {
    fn default() -> Self {
        PixelCache::new()
    }
}

impl PixelCache {
    /// All slots zero, and trusted as such.
    pub const fn new() -> Self {
        PixelCache {
            slots: [Pixel::ZERO; CACHE_SIZE],
            written: u64::MAX,
        }
    }

    /// All slots zero, none trusted until written.
    pub const fn cold() -> Self {
        PixelCache {
            slots: [Pixel::ZERO; CACHE_SIZE],
            written: 0,
        }
    }

    /// Returns the pixel in `index`; only the low six bits are used.
    #[inline]
    pub fn get(&self, index: u8) -> Pixel {
        self.slots[(index & 0x3f) as usize]
    }

    #[inline]
    pub fn insert(&mut self, pixel: Pixel) {
        let slot = pixel.hash();
        self.slots[slot as usize] = pixel;
        self.written |= 1u64 << slot;
    }

    /// Whether `pixel` currently occupies its own slot.
    #[inline]
    pub fn contains(&self, pixel: &Pixel) -> bool {
        let slot = pixel.hash();
        self.written & (1u64 << slot) != 0 && self.slots[slot as usize] == *pixel
    }
}
