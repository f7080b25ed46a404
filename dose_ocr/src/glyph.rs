//! Glyphs: the trimmed bitmaps of individual connected ink regions.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::geom::Rect;

/// A trimmed bitmap of one connected ink region.
///
/// Two glyphs are equal when they have the same size and exactly the same
/// pixels. Where a glyph came from (a seeded dictionary or a training
/// session) doesn't affect equality.
#[derive(Clone)]
pub struct Glyph {
    width: usize,
    height: usize,
    bits: Vec<bool>,
    seeded: bool,
}

impl Glyph {
    /// Build a glyph from absolute `(x, y)` pixel coordinates, trimming it to
    /// the tight bounding box of those pixels. Returns `None` if `pixels` is
    /// empty.
    pub fn from_pixels(pixels: &[(usize, usize)]) -> Option<Glyph> {
        let bounds = bounding_box(pixels)?;
        let mut bits = vec![false; bounds.width() * bounds.height()];
        for &(x, y) in pixels {
            bits[(y - bounds.top()) * bounds.width() + (x - bounds.left())] = true;
        }
        Some(Glyph {
            width: bounds.width(),
            height: bounds.height(),
            bits,
            seeded: false,
        })
    }

    /// Rebuild a glyph from its width and the row-major indices of its set
    /// bits. The indices must be strictly increasing, and must describe a
    /// tightly trimmed bitmap.
    pub fn from_set_bits(width: usize, indices: &[usize]) -> Result<Glyph, String> {
        if width == 0 {
            return Err("width is zero".to_owned());
        }
        let last = *indices.last().ok_or_else(|| "no bits set".to_owned())?;
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err("bit indices are not strictly increasing".to_owned());
        }
        let height = last / width + 1;
        let mut bits = vec![false; width * height];
        for &i in indices {
            bits[i] = true;
        }
        let glyph = Glyph {
            width,
            height,
            bits,
            seeded: false,
        };
        if !glyph.is_tight() {
            return Err(format!(
                "{}x{} bitmap has an empty edge row or column",
                width, height
            ));
        }
        Ok(glyph)
    }

    /// Mark this glyph as coming from a seeded dictionary.
    pub fn seeded(mut self) -> Glyph {
        self.seeded = true;
        self
    }

    /// Did this glyph come from a seeded dictionary?
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Is the pixel at `x`, `y` set? Panics if out of bounds.
    pub fn get(&self, x: usize, y: usize) -> bool {
        assert!(x < self.width && y < self.height, "glyph pixel out of bounds");
        self.bits[y * self.width + x]
    }

    /// Row-major indices of the set pixels.
    pub fn set_bits(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| i)
    }

    /// Number of set pixels.
    pub fn ink(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Render as `#` and `.` characters, one line per row.
    pub fn to_ascii_art(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.bits.chunks(self.width) {
            out.extend(row.iter().map(|&b| if b { '#' } else { '.' }));
            out.push('\n');
        }
        out
    }

    /// Does every edge row and column contain ink?
    fn is_tight(&self) -> bool {
        let row_has_ink = |y: usize| (0..self.width).any(|x| self.get(x, y));
        let col_has_ink = |x: usize| (0..self.height).any(|y| self.get(x, y));
        row_has_ink(0)
            && row_has_ink(self.height - 1)
            && col_has_ink(0)
            && col_has_ink(self.width - 1)
    }
}

/// The smallest rectangle containing all `pixels`.
pub(crate) fn bounding_box(pixels: &[(usize, usize)]) -> Option<Rect> {
    let (&(x0, y0), rest) = pixels.split_first()?;
    Some(
        rest.iter()
            .fold(Rect::pixel(x0, y0), |r, &(x, y)| r.union(&Rect::pixel(x, y))),
    )
}

impl PartialEq for Glyph {
    fn eq(&self, other: &Glyph) -> bool {
        self.width == other.width && self.height == other.height && self.bits == other.bits
    }
}

impl Eq for Glyph {}

impl Hash for Glyph {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.hash(state);
        self.height.hash(state);
        self.bits.hash(state);
    }
}

impl fmt::Debug for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Glyph {}x{}", self.width, self.height)?;
        if self.seeded {
            write!(f, " (seeded)")?;
        }
        writeln!(f)?;
        write!(f, "{}", self.to_ascii_art())
    }
}

#[cfg(test)]
mod test {
    use quickcheck::{quickcheck, Arbitrary, Gen};

    use super::*;

    impl Arbitrary for Glyph {
        fn arbitrary(g: &mut Gen) -> Self {
            let size = g.size().clamp(1, 12);
            let mut pixels = vec![];
            for y in 0..size {
                for x in 0..size {
                    if bool::arbitrary(g) {
                        pixels.push((x, y));
                    }
                }
            }
            if pixels.is_empty() {
                pixels.push((0, 0));
            }
            Glyph::from_pixels(&pixels).expect("non-empty pixels")
        }
    }

    #[test]
    fn from_pixels_trims_to_tight_box() {
        let glyph = Glyph::from_pixels(&[(10, 5), (12, 7)]).unwrap();
        assert_eq!(glyph.width(), 3);
        assert_eq!(glyph.height(), 3);
        assert!(glyph.get(0, 0));
        assert!(glyph.get(2, 2));
        assert!(!glyph.get(1, 1));
        assert_eq!(glyph.to_ascii_art(), "#..\n...\n..#\n");
        assert!(Glyph::from_pixels(&[]).is_none());
    }

    #[test]
    fn equality_ignores_origin() {
        let a = Glyph::from_pixels(&[(0, 0), (1, 1)]).unwrap();
        let b = Glyph::from_pixels(&[(5, 5), (6, 6)]).unwrap().seeded();
        assert_eq!(a, b);
        assert!(b.is_seeded());
    }

    #[test]
    fn one_pixel_difference_breaks_equality() {
        let a = Glyph::from_pixels(&[(0, 0), (1, 1), (1, 0)]).unwrap();
        let b = Glyph::from_pixels(&[(0, 0), (1, 1), (0, 1)]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn from_set_bits_rejects_bad_records() {
        assert!(Glyph::from_set_bits(0, &[0]).is_err());
        assert!(Glyph::from_set_bits(2, &[]).is_err());
        assert!(Glyph::from_set_bits(2, &[3, 0]).is_err());
        assert!(Glyph::from_set_bits(2, &[0, 0, 3]).is_err());
        // Right column is empty.
        assert!(Glyph::from_set_bits(3, &[0, 4]).is_err());
        assert!(Glyph::from_set_bits(2, &[0, 3]).is_ok());
    }

    quickcheck! {
        fn set_bits_round_trip(glyph: Glyph) -> bool {
            let bits = glyph.set_bits().collect::<Vec<_>>();
            Glyph::from_set_bits(glyph.width(), &bits) == Ok(glyph)
        }

        fn glyphs_are_tight(glyph: Glyph) -> bool {
            glyph.is_tight()
        }

        fn equality_is_reflexive_and_symmetric(a: Glyph, b: Glyph) -> bool {
            a == a.clone() && (a == b) == (b == a)
        }
    }
}
