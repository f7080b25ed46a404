//! The main OCR driver.

use log::{debug, warn};

use crate::binarization::{binarize, BinarizeOptions};
use crate::dialect::{Dialect, DialectProfile};
use crate::errors::{Error, Result};
use crate::layout::{PageReader, SeriesText};
use crate::model::{AcquisitionWindow, DoseReport, ReportMetadata, StructuredDose};
use crate::raster::Raster;
use crate::recognizer::GlyphReader;
use crate::reconcile::reconcile;

/// A `DoseOcr` represents one dose report series that we want to read. To
/// use it, create a new context from the series' descriptive fields, add
/// each page in order, and then call `finish`.
pub struct DoseOcr {
    name: String,
    metadata: ReportMetadata,
    dialect: Dialect,
    profile: DialectProfile,
    reader: PageReader,
    text: SeriesText,
    next_id: usize,
}

impl DoseOcr {
    /// Create a new `DoseOcr`. Returns `None` if `metadata` doesn't describe
    /// a dose report we know how to read.
    pub fn new(metadata: ReportMetadata) -> Option<DoseOcr> {
        let dialect = Dialect::detect(&metadata)?;
        Some(DoseOcr::with_dialect(metadata, dialect))
    }

    /// Create a new `DoseOcr` for a known dialect.
    pub fn with_dialect(metadata: ReportMetadata, dialect: Dialect) -> DoseOcr {
        let profile = dialect.profile();
        DoseOcr {
            name: "page".to_owned(),
            metadata,
            dialect,
            profile,
            reader: PageReader::new(profile.segmenter),
            text: SeriesText::new(),
            next_id: 0,
        }
    }

    /// Use `name` as the prefix of debug image file names.
    pub fn named<S: Into<String>>(mut self, name: S) -> DoseOcr {
        self.name = name.into();
        self
    }

    /// The dialect we're parsing.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The text read so far.
    pub fn text(&self) -> &SeriesText {
        &self.text
    }

    /// Read one page, appending its text to the series. If the page can't
    /// be segmented, it is skipped and the error is returned.
    pub fn add_page<R>(
        &mut self,
        raster: &Raster,
        options: &BinarizeOptions,
        reader: &mut R,
    ) -> Result<()>
    where
        R: GlyphReader + ?Sized,
    {
        let id = self.next_id;
        self.next_id += 1;

        let bitmap = binarize(raster, options);
        debug_pixmap!(&bitmap, "{}_{:04}_binarized.png", &self.name, id);
        let scan = self.reader.read(&bitmap, reader).map_err(|err| {
            if let Error::ConnectivityOverflow { .. } = err {
                warn!("skipping page {}: {}", id, err);
            }
            err
        })?;
        trace_pixmap!(scan.labels(), "{}_{:04}_segmented.png", &self.name, id);

        let page = scan.to_page_text(self.profile.word_spacing);
        debug!("page {} has {} lines", id, page.lines().len());
        self.text.push(page);
        Ok(())
    }

    /// Parse the text of every page and merge it with `structured`.
    pub fn finish(
        self,
        structured: &StructuredDose,
        window: Option<AcquisitionWindow>,
    ) -> DoseReport {
        let parsed = self.dialect.parse(self.text.lines());
        let mut report = reconcile(parsed, structured, &self.metadata, window);
        report.dialect = Some(self.dialect.to_string());
        report
    }
}
