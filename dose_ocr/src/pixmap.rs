//! Row-major pixel grids for the kinds of data we pass between pipeline
//! stages: raw scanner samples, ink bitmaps and segment labels.

use image::{ImageBuffer, Rgba, RgbaImage};
use palette::{FromColor, Hsv, Srgb};
use std::fmt;
use std::slice;

use crate::errors::{Error, Result};

/// A value which can be stored in a `Pixmap`.
pub trait Pixel: Clone + Copy + fmt::Debug + 'static {
    /// The value of a freshly created pixmap.
    fn default_color() -> Self;

    /// How to draw this value when writing a debug image.
    fn to_rgba(self) -> Rgba<u8>;
}

/// Ink is drawn black on white, the way reports are usually read.
impl Pixel for bool {
    fn default_color() -> Self {
        false
    }

    fn to_rgba(self) -> Rgba<u8> {
        if self {
            Rgba([0, 0, 0, 0xff])
        } else {
            Rgba([0xff, 0xff, 0xff, 0xff])
        }
    }
}

/// Raw samples are drawn as gray, clipped to 8 bits.
impl Pixel for i32 {
    fn default_color() -> Self {
        0
    }

    fn to_rgba(self) -> Rgba<u8> {
        let v = self.clamp(0, 255) as u8;
        Rgba([v, v, v, 0xff])
    }
}

/// Which glyph component, if any, a pixel belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    /// Background.
    Empty,
    /// Ink which hasn't been reached by a flood fill yet.
    Unassigned,
    /// Ink belonging to component `n`.
    Id(usize),
}

impl Pixel for Label {
    fn default_color() -> Self {
        Label::Empty
    }

    fn to_rgba(self) -> Rgba<u8> {
        match self {
            Label::Empty => Rgba([0xff, 0xff, 0xff, 0xff]),
            Label::Unassigned => Rgba([0, 0, 0, 0xff]),
            Label::Id(id) => {
                // Step around the hue circle by the golden ratio so that
                // neighboring glyphs get clearly different colors.
                const GOLDEN_RATIO: f32 = 0.618_034;
                let hue = ((0.94 + GOLDEN_RATIO * id as f32) % 1.0) * 360.0;
                let hsv: Hsv = Hsv::new(hue, 0.5, 0.95);
                let rgb: Srgb<u8> = Srgb::<f32>::from_color(hsv).into_format();
                Rgba([rgb.red, rgb.green, rgb.blue, 0xff])
            }
        }
    }
}

/// A grid of pixels of any `Pixel` type.
#[derive(Clone, PartialEq, Eq)]
pub struct Pixmap<P: Pixel = bool> {
    data: Vec<P>,
    width: usize,
    height: usize,
}

/// An ink bitmap, as produced by binarization. `true` is ink.
pub type Bitmap = Pixmap<bool>;

impl<P: Pixel> Pixmap<P> {
    /// A `width` x `height` pixmap filled with `P::default_color()`. Panics
    /// if the area doesn't fit in memory.
    pub fn blank(width: usize, height: usize) -> Pixmap<P> {
        let area = width
            .checked_mul(height)
            .unwrap_or_else(|| panic!("pixmap {}x{} is too large", width, height));
        Pixmap {
            data: vec![P::default_color(); area],
            width,
            height,
        }
    }

    /// Wrap row-major pixel data, checking that it has the right length.
    pub fn from_data(width: usize, height: usize, data: Vec<P>) -> Result<Pixmap<P>> {
        match width.checked_mul(height) {
            Some(area) if area == data.len() => Ok(Pixmap {
                data,
                width,
                height,
            }),
            _ => Err(Error::invalid_raster(format!(
                "expected {}x{} pixels, found {}",
                width,
                height,
                data.len()
            ))),
        }
    }

    /// The width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "({}, {}) is outside {}x{} pixmap",
            x,
            y,
            self.width,
            self.height
        );
        y * self.width + x
    }

    /// The pixel at `(x, y)`. Panics if out of bounds.
    pub fn get(&self, x: usize, y: usize) -> P {
        self.data[self.index(x, y)]
    }

    /// The pixel at `(x, y)`, or `P::default_color()` anywhere outside the
    /// pixmap.
    pub fn get_default(&self, x: isize, y: isize) -> P {
        match (usize::try_from(x), usize::try_from(y)) {
            (Ok(x), Ok(y)) if x < self.width && y < self.height => self.data[y * self.width + x],
            _ => P::default_color(),
        }
    }

    /// A mutable reference to the pixel at `(x, y)`. Panics if out of
    /// bounds.
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut P {
        let i = self.index(x, y);
        &mut self.data[i]
    }

    /// Every pixel, in row-major order.
    pub fn pixels(&self) -> Pixels<P> {
        Pixels {
            iter: self.data.iter(),
        }
    }

    /// Every pixel with its coordinates, in row-major order.
    pub fn enumerate_pixels(&self) -> impl Iterator<Item = (usize, usize, P)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &p)| (i % width, i / width, p))
    }

    /// Convert every pixel with `f`.
    pub fn map<F, P2>(&self, f: F) -> Pixmap<P2>
    where
        F: Fn(P) -> P2,
        P2: Pixel,
    {
        Pixmap {
            data: self.data.iter().map(|p| f(*p)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Draw this pixmap as an `RgbaImage`, for debug output.
    pub fn to_image(&self) -> Result<RgbaImage> {
        let raw = self
            .data
            .iter()
            .flat_map(|px| px.to_rgba().0)
            .collect::<Vec<u8>>();
        let width = u32::try_from(self.width).map_err(Error::image)?;
        let height = u32::try_from(self.height).map_err(Error::image)?;
        ImageBuffer::from_raw(width, height, raw)
            .ok_or_else(|| Error::image("pixmap size does not match its data"))
    }
}

/// Iterator returned by `Pixmap::pixels`.
pub struct Pixels<'a, P: Pixel> {
    iter: slice::Iter<'a, P>,
}

impl<'a, P: Pixel> Iterator for Pixels<'a, P> {
    type Item = P;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().copied()
    }
}

impl<P: Pixel> fmt::Debug for Pixmap<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pixmap({}x{})", self.width, self.height)
    }
}

#[test]
fn blank_bitmaps_have_no_ink() {
    let bitmap = Bitmap::blank(3, 2);
    assert_eq!((bitmap.width(), bitmap.height()), (3, 2));
    assert!(bitmap.pixels().all(|ink| !ink));
}

#[test]
fn sample_data_must_fill_the_grid() {
    assert!(Pixmap::from_data(2, 2, vec![0i32, 255, 255, 0]).is_ok());
    assert!(Pixmap::from_data(2, 2, vec![0i32, 255, 255]).is_err());
}

#[test]
fn pixels_are_addressed_by_column_then_row() {
    let mut bitmap = Bitmap::blank(2, 2);
    *bitmap.get_mut(1, 0) = true;
    assert!(bitmap.get(1, 0));
    assert!(!bitmap.get(0, 1));
    assert_eq!(bitmap.pixels().collect::<Vec<_>>(), &[false, true, false, false]);
}

#[test]
fn outside_pixels_read_as_the_default() {
    let mut bitmap = Bitmap::blank(2, 1);
    *bitmap.get_mut(1, 0) = true;
    assert!(bitmap.get_default(1, 0));
    assert!(!bitmap.get_default(-1, 0));
    assert!(!bitmap.get_default(2, 0));
    assert!(!bitmap.get_default(1, 1));
}

#[test]
fn enumerated_pixels_carry_their_coordinates() {
    let mut bitmap = Bitmap::blank(2, 2);
    *bitmap.get_mut(0, 1) = true;
    let ink = bitmap
        .enumerate_pixels()
        .filter(|&(_, _, ink)| ink)
        .map(|(x, y, _)| (x, y))
        .collect::<Vec<_>>();
    assert_eq!(ink, &[(0, 1)]);
    assert_eq!(bitmap.enumerate_pixels().count(), 4);
}

#[test]
#[should_panic]
fn reading_outside_the_grid_panics() {
    Bitmap::blank(1, 1).get(1, 0);
}

#[test]
fn labels_render_as_debug_images() {
    let mut labels = Bitmap::blank(1, 2).map(|_| Label::Empty);
    *labels.get_mut(0, 0) = Label::Id(3);
    let image = labels.to_image().unwrap();
    assert_eq!(image.dimensions(), (1, 2));
    assert_eq!(image[(0, 1)], Rgba([0xff, 0xff, 0xff, 0xff]));
    assert_ne!(image[(0, 0)], image[(0, 1)]);
}
