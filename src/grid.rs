use crate::error::{Error, Result};

/// A rectangular grid of straight RGBA8 pixels that the encoder can read.
///
/// `pixel` is only called with `x < width` and `y < height`.
pub trait PixelSource {
    fn dimensions(&self) -> (u32, u32);
    fn pixel(&self, x: u32, y: u32) -> [u8; 4];
}

impl<T: PixelSource + ?Sized> PixelSource for &T {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        (**self).pixel(x, y)
    }
}

/// An owned RGBA8 image, rows top to bottom, four bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pixels: Box<[u8]>,
    width: u32,
    height: u32,
}

pub(crate) fn buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(Error::ImageTooLarge { width, height })
}

impl Image {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = buffer_len(width, height)?;
        if pixels.len() != expected {
            return Err(Error::InvalidBufferLength {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Image {
            pixels: pixels.into_boxed_slice(),
            width,
            height,
        })
    }

    /// Builds an image by calling `f(x, y)` for every pixel in raster order.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Result<Self> {
        let mut pixels = Vec::with_capacity(buffer_len(width, height)?);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Image::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Box<[u8]> {
        self.pixels
    }

    /// The pixel at `(x, y)`, or `None` outside the image.
    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let pos = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(pos..pos + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// One row of pixel bytes, or `None` below the last row.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * 4;
        let start = y as usize * stride;
        self.pixels.get(start..start + stride)
    }
}

impl PixelSource for Image {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let pos = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.pixels[pos..pos + 4];
        [px[0], px[1], px[2], px[3]]
    }
}

#[cfg(feature = "image")]
mod image_crate {
    use image::{ImageBuffer, Rgba, RgbaImage};

    use super::{Image, PixelSource};
    use crate::error::{Error, Result};

    impl PixelSource for RgbaImage {
        fn dimensions(&self) -> (u32, u32) {
            (self.width(), self.height())
        }

        fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
            let Rgba(rgba) = *self.get_pixel(x, y);
            rgba
        }
    }

    impl TryFrom<Image> for RgbaImage {
        type Error = Error;

        fn try_from(img: Image) -> Result<Self> {
            let (width, height) = (img.width, img.height);
            let actual = img.pixels.len();
            ImageBuffer::from_raw(width, height, img.pixels.into_vec()).ok_or(
                Error::InvalidBufferLength {
                    width,
                    height,
                    expected: super::buffer_len(width, height)?,
                    actual,
                },
            )
        }
    }

    impl From<&RgbaImage> for Image {
        fn from(img: &RgbaImage) -> Self {
            Image {
                pixels: img.as_raw().clone().into_boxed_slice(),
                width: img.width(),
                height: img.height(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_buffer_length() {
        match Image::new(2, 2, vec![0u8; 15]) {
            Err(Error::InvalidBufferLength {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 15);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn addresses_pixels_in_raster_order() {
        let img = Image::from_fn(3, 2, |x, y| [x as u8, y as u8, 7, 255]).unwrap();
        assert_eq!(img.pixel(2, 1), [2, 1, 7, 255]);
        assert_eq!(img.get(0, 1), Some([0, 1, 7, 255]));
        assert_eq!(img.get(3, 0), None);
        assert_eq!(img.row(1), Some(&[0, 1, 7, 255, 1, 1, 7, 255, 2, 1, 7, 255][..]));
        assert_eq!(img.row(2), None);
        assert_eq!(PixelSource::dimensions(&img), (3, 2));
    }

    #[test]
    fn empty_images_are_valid() {
        let img = Image::new(0, 5, Vec::new()).unwrap();
        assert!(img.pixels().is_empty());
        assert_eq!(img.height(), 5);
    }
}
