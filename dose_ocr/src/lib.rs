//! This crate recovers CT radiation dose figures from "dose report" screen
//! captures: the images scanners attach to a study showing CTDIvol, DLP and
//! scan ranges for each acquisition, in cases where nothing machine-readable
//! was ever recorded.
//!
//! The pipeline is:
//!
//! 1. Binarize each page (`binarize`).
//! 2. Segment it into connected ink regions with per-vendor gap tolerances,
//!    and look each one up in a glyph dictionary (`PageReader`). Regions the
//!    dictionary doesn't know get a second pass, split into 8-connected
//!    pieces.
//! 3. Put recognized glyphs back together into lines of text.
//! 4. Parse the text with the report layout of the scanner's vendor
//!    (`Dialect`).
//! 5. Merge the result with any machine-readable dose fields
//!    (`reconcile`).
//!
//! `DoseOcr` runs all of these for one report series.
//!
//! ## Example code
//!
//! ```
//! use std::sync::Arc;
//! use dose_ocr::test_util::{font_dictionary, render_lines};
//! use dose_ocr::{BinarizeOptions, DoseOcr, Recognizer, ReportMetadata, StructuredDose};
//!
//! let metadata = ReportMetadata {
//!     manufacturer: Some("GE MEDICAL SYSTEMS".to_owned()),
//!     series_description: Some("Dose Report".to_owned()),
//!     ..ReportMetadata::default()
//! };
//! let mut ocr = DoseOcr::new(metadata).expect("a GE dose report");
//!
//! // Normally the dictionary would come from `GlyphDictionary::load`.
//! let dictionary = font_dictionary(&ocr.dialect().profile().segmenter)?;
//! let mut recognizer = Recognizer::new(Arc::new(dictionary));
//!
//! let page = render_lines(&[
//!     "2 Helical S19.250-I658.250 17.95 1299.58 Body 32",
//!     "Total Exam DLP: 1299.58",
//! ])?;
//! ocr.add_page(&page, &BinarizeOptions::default(), &mut recognizer)?;
//!
//! let report = ocr.finish(&StructuredDose::default(), None);
//! assert_eq!(report.acquisitions[0].dlp, Some(1299.58));
//! assert_eq!(report.totals.dlp, Some(1299.58));
//! # Ok::<(), dose_ocr::Error>(())
//! ```
//!
//! ## Training
//!
//! The recognizer only knows glyphs it has seen before. Wrap a `Recognizer`
//! in a `TrainingRecognizer` to be asked about new glyphs, then merge
//! `TrainingRecognizer::into_learned` into the dictionary and save it.

#![warn(missing_docs)]

#[macro_use]
mod logimg;

mod binarization;
mod ctx;
mod dialect;
mod dictionary;
mod errors;
mod geom;
mod glyph;
mod layout;
mod model;
mod pixmap;
mod raster;
mod recognizer;
mod reconcile;
mod segmentation;
#[doc(hidden)]
pub mod test_util;

pub use self::binarization::{binarize, BinarizeOptions, Window};
pub use self::ctx::DoseOcr;
pub use self::dialect::{Dialect, DialectProfile, DoseTextParser, LineKind, ParsedDose};
pub use self::dictionary::{GlyphDictionary, GlyphRecord};
pub use self::errors::{Error, Result};
pub use self::geom::Rect;
pub use self::glyph::Glyph;
pub use self::layout::{PageReader, PageScan, PageText, Placement, SeriesText, DEFAULT_WORD_SPACING};
pub use self::model::{
    AcquisitionWindow, AnatomicPosition, Direction, DoseAcquisition, DoseReport, DoseTotals,
    Phantom, Provenance, ReportMetadata, ScanRange, ScanType, StructuredAcquisition,
    StructuredDose,
};
pub use self::pixmap::{Bitmap, Label, Pixel, Pixmap};
pub use self::raster::Raster;
pub use self::recognizer::{GlyphPrompt, GlyphReader, Recognizer, TrainingRecognizer};
pub use self::reconcile::reconcile;
pub use self::segmentation::{resegment, segment, Component, Segmentation, SegmenterConfig};

/// The glyph dictionary shipped with this crate.
pub fn bundled_dictionary() -> Result<GlyphDictionary> {
    GlyphDictionary::from_json(include_str!("../data/glyphs.json"))
}

#[test]
fn bundled_dictionary_loads() {
    assert!(bundled_dictionary().is_ok());
}
