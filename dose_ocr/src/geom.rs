//! Pixel rectangles.

use serde::{Deserialize, Serialize};
use std::cmp::{max, min};

/// The area covered by a glyph or a line of text. `right` and `bottom` are
/// exclusive.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Rect {
    left: usize,
    top: usize,
    width: usize,
    height: usize,
}

impl Rect {
    /// Create a rectangle from its left and top edges and its size.
    /// Panics if the right or bottom edge would overflow.
    pub fn ltwh(left: usize, top: usize, width: usize, height: usize) -> Rect {
        assert!(
            left.checked_add(width).is_some() && top.checked_add(height).is_some(),
            "rectangle {}+{}, {}+{} overflows",
            left,
            width,
            top,
            height
        );
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    /// The rectangle covering the single pixel at `(x, y)`.
    pub fn pixel(x: usize, y: usize) -> Rect {
        Rect::ltwh(x, y, 1, 1)
    }

    /// The leftmost column.
    pub fn left(&self) -> usize {
        self.left
    }

    /// The top row.
    pub fn top(&self) -> usize {
        self.top
    }

    /// One past the rightmost column.
    pub fn right(&self) -> usize {
        self.left + self.width
    }

    /// One past the bottom row.
    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    /// The width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Does this rectangle cover no pixels?
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The smallest rectangle covering both `self` and `other`. Empty
    /// rectangles cover nothing, so they don't stretch the result.
    pub fn union(&self, other: &Rect) -> Rect {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        let left = min(self.left, other.left);
        let top = min(self.top, other.top);
        Rect {
            left,
            top,
            width: max(self.right(), other.right()) - left,
            height: max(self.bottom(), other.bottom()) - top,
        }
    }

    /// Is the pixel at `(x, y)` inside this rectangle?
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.left <= x && x < self.right() && self.top <= y && y < self.bottom()
    }

    /// Do the rows of `other` lie entirely within the rows of `self`?
    /// Columns are ignored, since this is used to match short glyphs to a
    /// line of text.
    pub fn encloses(&self, other: &Rect) -> bool {
        self.top <= other.top && other.bottom() <= self.bottom()
    }
}

#[cfg(test)]
mod test {
    use quickcheck::{quickcheck, Arbitrary, Gen};

    use super::*;

    impl Arbitrary for Rect {
        fn arbitrary(g: &mut Gen) -> Self {
            let s = g.size().max(1);
            Rect::ltwh(
                usize::arbitrary(g) % s,
                usize::arbitrary(g) % s,
                usize::arbitrary(g) % s,
                usize::arbitrary(g) % s,
            )
        }
    }

    #[test]
    fn union_of_pixels_is_their_bounding_box() {
        let r = Rect::pixel(3, 9).union(&Rect::pixel(1, 4));
        assert_eq!((r.left(), r.top(), r.right(), r.bottom()), (1, 4, 4, 10));
    }

    #[test]
    fn contains_excludes_right_and_bottom_edges() {
        let r = Rect::ltwh(2, 3, 4, 2);
        assert!(r.contains(2, 3));
        assert!(r.contains(5, 4));
        assert!(!r.contains(6, 4));
        assert!(!r.contains(5, 5));
        assert!(!r.contains(1, 3));
    }

    #[test]
    fn punctuation_is_enclosed_by_its_line() {
        // A 7-row line of text, a period at its foot, and the next line
        // starting 12 rows further down.
        let line = Rect::ltwh(0, 4, 40, 7);
        assert!(line.encloses(&Rect::ltwh(50, 9, 2, 2)));
        assert!(!line.encloses(&Rect::ltwh(0, 9, 5, 7)));
        assert!(!line.encloses(&Rect::ltwh(0, 16, 5, 7)));
    }

    quickcheck! {
        fn union_covers_both_rects(r1: Rect, r2: Rect) -> bool {
            let u = r1.union(&r2);
            [r1, r2].iter().all(|r| {
                r.is_empty() ||
                    (u.left() <= r.left() && u.top() <= r.top() &&
                     r.right() <= u.right() && r.bottom() <= u.bottom())
            })
        }

        fn union_encloses_both_rects(r1: Rect, r2: Rect) -> bool {
            let u = r1.union(&r2);
            [r1, r2].iter().all(|r| r.is_empty() || u.encloses(r))
        }

        fn enclosed_rects_are_no_taller(r1: Rect, r2: Rect) -> bool {
            !r1.encloses(&r2) || r2.height() <= r1.height()
        }
    }
}
