//! Raw grayscale pixel data, as handed to us by whatever decoded the
//! source image.

use image::{DynamicImage, GrayImage};

use crate::errors::{Error, Result};
use crate::pixmap::{Pixels, Pixmap};

/// A grid of integer samples with a known bit depth and signedness.
#[derive(Clone, Debug)]
pub struct Raster {
    samples: Pixmap<i32>,
    bits_stored: u8,
    signed: bool,
}

impl Raster {
    /// Create a new raster. `samples` are in row-major order.
    pub fn new(
        width: usize,
        height: usize,
        bits_stored: u8,
        signed: bool,
        samples: Vec<i32>,
    ) -> Result<Raster> {
        if bits_stored == 0 || bits_stored > 32 {
            return Err(Error::invalid_raster(format!(
                "unsupported bit depth {}",
                bits_stored
            )));
        }
        if width == 0 || height == 0 {
            return Err(Error::invalid_raster("raster is empty"));
        }
        Ok(Raster {
            samples: Pixmap::from_data(width, height, samples)?,
            bits_stored,
            signed,
        })
    }

    /// Build an 8-bit raster from a decoded image, discarding color.
    pub fn from_image(image: &DynamicImage) -> Result<Raster> {
        Raster::from_gray(&image.to_luma8())
    }

    /// Build an 8-bit raster from a grayscale image.
    pub fn from_gray(image: &GrayImage) -> Result<Raster> {
        let samples = image.pixels().map(|p| i32::from(p.0[0])).collect();
        Raster::new(
            image.width() as usize,
            image.height() as usize,
            8,
            false,
            samples,
        )
    }

    /// The width of the raster.
    pub fn width(&self) -> usize {
        self.samples.width()
    }

    /// The height of the raster.
    pub fn height(&self) -> usize {
        self.samples.height()
    }

    /// Number of significant bits per sample.
    pub fn bits_stored(&self) -> u8 {
        self.bits_stored
    }

    /// Are samples two's complement signed?
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// The sample at `x`, `y`.
    pub fn get(&self, x: usize, y: usize) -> i32 {
        self.samples.get(x, y)
    }

    /// Iterate over all samples in row-major order.
    pub fn pixels(&self) -> Pixels<i32> {
        self.samples.pixels()
    }

    /// The smallest value representable at this bit depth.
    pub fn min_representable(&self) -> i64 {
        if self.signed {
            -(1i64 << (self.bits_stored - 1))
        } else {
            0
        }
    }

    /// The largest value representable at this bit depth.
    pub fn max_representable(&self) -> i64 {
        if self.signed {
            (1i64 << (self.bits_stored - 1)) - 1
        } else {
            (1i64 << self.bits_stored) - 1
        }
    }

    /// Flip bright and dark, for sources where ink is stored as low
    /// values (`MONOCHROME1`, dark text on a light screen).
    pub fn inverted(&self) -> Raster {
        let (lo, hi) = (self.min_representable(), self.max_representable());
        Raster {
            samples: self.samples.map(|v| (lo + hi - i64::from(v)) as i32),
            bits_stored: self.bits_stored,
            signed: self.signed,
        }
    }
}

#[test]
fn new_rejects_mismatched_sample_counts() {
    assert!(Raster::new(2, 2, 8, false, vec![0; 4]).is_ok());
    assert!(Raster::new(2, 2, 8, false, vec![0; 3]).is_err());
    assert!(Raster::new(0, 2, 8, false, vec![]).is_err());
    assert!(Raster::new(1, 1, 0, false, vec![0]).is_err());
}

#[test]
fn representable_range_depends_on_signedness() {
    let unsigned = Raster::new(1, 1, 12, false, vec![0]).unwrap();
    assert_eq!(unsigned.min_representable(), 0);
    assert_eq!(unsigned.max_representable(), 4095);
    let signed = Raster::new(1, 1, 16, true, vec![0]).unwrap();
    assert_eq!(signed.min_representable(), -32768);
    assert_eq!(signed.max_representable(), 32767);
}

#[test]
fn inverted_flips_samples() {
    let raster = Raster::new(2, 1, 8, false, vec![0, 200]).unwrap();
    let inverted = raster.inverted();
    assert_eq!(inverted.get(0, 0), 255);
    assert_eq!(inverted.get(1, 0), 55);
}
