//! Segmentation of bitmaps into connected ink regions.
//!
//! "Connected" is looser than the usual 4- or 8-neighborhood: two ink
//! pixels belong together when they are within `horizontal_gap` columns and
//! `vertical_gap` rows of each other. Report renderers draw some characters
//! with strokes that don't quite touch (the dot on an "i", the two halves of
//! a ":"), and tuning these gaps per renderer lets us keep those in one
//! glyph without merging neighboring characters.

use log::trace;

use crate::errors::{Error, Result};
use crate::geom::Rect;
use crate::glyph::{bounding_box, Glyph};
use crate::pixmap::{Bitmap, Label, Pixmap};

/// How to group ink pixels into components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmenterConfig {
    /// Ink pixels this many columns apart are connected.
    pub horizontal_gap: usize,
    /// Ink pixels this many rows apart are connected.
    pub vertical_gap: usize,
    /// Give up on an image if any single component gets bigger than this.
    pub max_component_pixels: usize,
}

impl SegmenterConfig {
    /// The same limits, but with ordinary 8-connectivity.
    pub fn tight(&self) -> SegmenterConfig {
        SegmenterConfig {
            horizontal_gap: 1,
            vertical_gap: 1,
            ..*self
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        SegmenterConfig {
            horizontal_gap: 1,
            vertical_gap: 1,
            max_component_pixels: 10_000,
        }
    }
}

/// One connected ink region.
#[derive(Clone, Debug)]
pub struct Component {
    bounds: Rect,
    pixels: Vec<(usize, usize)>,
    glyph: Glyph,
}

impl Component {
    fn new(pixels: Vec<(usize, usize)>) -> Option<Component> {
        Some(Component {
            bounds: bounding_box(&pixels)?,
            glyph: Glyph::from_pixels(&pixels)?,
            pixels,
        })
    }

    /// Where this component sits in the page.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The absolute `(x, y)` coordinates of every pixel, in the order the
    /// flood fill found them.
    pub fn pixels(&self) -> &[(usize, usize)] {
        &self.pixels
    }

    /// The trimmed bitmap of this component.
    pub fn glyph(&self) -> &Glyph {
        &self.glyph
    }
}

/// The result of segmenting a bitmap.
#[derive(Debug)]
pub struct Segmentation {
    components: Vec<Component>,
    labels: Pixmap<Label>,
}

impl Segmentation {
    /// Components in the order they were discovered (row-major by their
    /// first pixel).
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Take ownership of the components.
    pub fn into_components(self) -> Vec<Component> {
        self.components
    }

    /// A map showing which component each pixel was assigned to.
    pub fn labels(&self) -> &Pixmap<Label> {
        &self.labels
    }
}

/// Find all the connected components in `bitmap`.
pub fn segment(bitmap: &Bitmap, config: &SegmenterConfig) -> Result<Segmentation> {
    let mut labels = bitmap.map(|ink| if ink { Label::Unassigned } else { Label::Empty });
    let mut components = vec![];
    for (x, y, ink) in bitmap.enumerate_pixels() {
        if ink && labels.get(x, y) == Label::Unassigned {
            let id = components.len();
            let pixels = flood_fill(&mut labels, x, y, id, config)?;
            components.extend(Component::new(pixels));
        }
    }
    trace!(
        "found {} components with gaps {}x{}",
        components.len(),
        config.horizontal_gap,
        config.vertical_gap
    );
    Ok(Segmentation { components, labels })
}

/// Split `component` into 8-connected pieces. Only the component's own
/// pixels are considered, even if other ink falls inside its bounds.
pub fn resegment(component: &Component, config: &SegmenterConfig) -> Result<Vec<Component>> {
    let bounds = component.bounds();
    let mut local = Bitmap::blank(bounds.width(), bounds.height());
    for &(x, y) in component.pixels() {
        *local.get_mut(x - bounds.left(), y - bounds.top()) = true;
    }
    let pieces = segment(&local, &config.tight())?
        .into_components()
        .into_iter()
        .filter_map(|piece| {
            let pixels = piece
                .pixels()
                .iter()
                .map(|&(x, y)| (x + bounds.left(), y + bounds.top()))
                .collect();
            Component::new(pixels)
        })
        .collect();
    Ok(pieces)
}

/// Label every pixel reachable from `x`, `y` with `id`, using an explicit
/// work list rather than recursion.
fn flood_fill(
    labels: &mut Pixmap<Label>,
    x: usize,
    y: usize,
    id: usize,
    config: &SegmenterConfig,
) -> Result<Vec<(usize, usize)>> {
    let h = config.horizontal_gap as isize;
    let v = config.vertical_gap as isize;
    let mut pixels = vec![];
    let mut stack = vec![(x, y)];
    *labels.get_mut(x, y) = Label::Id(id);
    while let Some((px, py)) = stack.pop() {
        pixels.push((px, py));
        if pixels.len() > config.max_component_pixels {
            return Err(Error::ConnectivityOverflow {
                pixels: pixels.len(),
                limit: config.max_component_pixels,
            });
        }
        for dy in -v..=v {
            for dx in -h..=h {
                let (nx, ny) = (px as isize + dx, py as isize + dy);
                // Outside the page reads as `Label::Empty`.
                if labels.get_default(nx, ny) == Label::Unassigned {
                    let (nx, ny) = (nx as usize, ny as usize);
                    *labels.get_mut(nx, ny) = Label::Id(id);
                    stack.push((nx, ny));
                }
            }
        }
    }
    Ok(pixels)
}
