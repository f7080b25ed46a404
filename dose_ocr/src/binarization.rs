//! Convert rasters to black and white.

use log::{debug, trace};

use crate::pixmap::Bitmap;
use crate::raster::Raster;

/// Rendered 8-bit values above this are ink.
const THRESHOLD: u8 = 127;

/// A VOI window, as carried by the source dataset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Window {
    /// Window center.
    pub center: f64,
    /// Window width.
    pub width: f64,
}

impl Window {
    /// A window is "binary" when the renderer that produced the image has
    /// asked for a hard threshold.
    fn is_binary(&self) -> bool {
        self.width <= 1.0
    }

    /// Map a sample to 0..=255 using the linear VOI function.
    fn render(&self, value: f64) -> u8 {
        let width = self.width.max(1.0);
        let low = self.center - 0.5 - (width - 1.0) / 2.0;
        let high = self.center - 0.5 + (width - 1.0) / 2.0;
        if value <= low {
            0
        } else if value > high {
            255
        } else {
            let scaled = ((value - (self.center - 0.5)) / (width - 1.0) + 0.5) * 255.0;
            scaled.round().clamp(0.0, 255.0) as u8
        }
    }
}

/// Rendering hints carried by the source dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BinarizeOptions {
    /// The window the source dataset asks us to display with.
    pub window: Option<Window>,
    /// Samples with this value are padding, not image.
    pub padding_value: Option<i32>,
}

/// Reduce a raster to ink and background.
pub fn binarize(raster: &Raster, options: &BinarizeOptions) -> Bitmap {
    if raster.bits_stored() == 1 {
        return samples_to_bitmap(raster, |v| v != 0);
    }

    match options.window {
        Some(window) if window.is_binary() => {
            debug!("using binary window {:?} from source", window);
            samples_to_bitmap(raster, |v| window.render(f64::from(v)) > THRESHOLD)
        }
        _ => {
            let padding = options
                .padding_value
                .map(i64::from)
                .unwrap_or_else(|| raster.min_representable());
            let window = statistical_window(raster, padding);
            debug!(
                "binarizing {}x{} raster with computed window {:?} (padding {})",
                raster.width(),
                raster.height(),
                window,
                padding
            );
            samples_to_bitmap(raster, |v| {
                i64::from(v) != padding && window.render(f64::from(v)) > THRESHOLD
            })
        }
    }
}

/// Compute a window spanning the samples which aren't padding. If the
/// whole image is padding, span everything.
fn statistical_window(raster: &Raster, padding: i64) -> Window {
    let range = |include_padding: bool| {
        raster
            .pixels()
            .filter(|&v| include_padding || i64::from(v) != padding)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((v.min(lo), v.max(hi))),
            })
    };
    let (lo, hi) = match range(false).or_else(|| range(true)) {
        // A single value tells us nothing about contrast, so fall back to
        // the full range of the bit depth.
        Some((lo, hi)) if lo < hi => (lo as f64, hi as f64),
        _ => (
            raster.min_representable() as f64,
            raster.max_representable() as f64,
        ),
    };
    trace!("sample range {}..={}", lo, hi);
    let width = hi - lo + 1.0;
    Window {
        center: lo + width / 2.0,
        width,
    }
}

fn samples_to_bitmap<F>(raster: &Raster, is_ink: F) -> Bitmap
where
    F: Fn(i32) -> bool,
{
    let mut bitmap = Bitmap::blank(raster.width(), raster.height());
    for y in 0..raster.height() {
        for x in 0..raster.width() {
            *bitmap.get_mut(x, y) = is_ink(raster.get(x, y));
        }
    }
    bitmap
}
