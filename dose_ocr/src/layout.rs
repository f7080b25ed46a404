//! Reading a page: find glyphs, recognize them, and put them back together
//! into lines of text.

use log::{debug, trace, warn};
use std::cmp::Ordering;
use std::fmt;

use crate::errors::Result;
use crate::geom::Rect;
use crate::glyph::Glyph;
use crate::pixmap::{Bitmap, Label, Pixmap};
use crate::recognizer::GlyphReader;
use crate::segmentation::{resegment, segment, Component, SegmenterConfig};

/// Glyphs further apart than this many columns are separate words.
pub const DEFAULT_WORD_SPACING: usize = 5;

/// A glyph found at a specific location on the page.
#[derive(Clone, Debug)]
pub struct Placement {
    bounds: Rect,
    glyph: Glyph,
    text: Option<String>,
}

impl Placement {
    fn new(component: &Component, text: Option<String>) -> Placement {
        Placement {
            bounds: component.bounds(),
            glyph: component.glyph().clone(),
            text,
        }
    }

    /// The top row of the glyph.
    pub fn row(&self) -> usize {
        self.bounds.top()
    }

    /// The left column of the glyph.
    pub fn col(&self) -> usize {
        self.bounds.left()
    }

    /// The area covered by the glyph.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The glyph itself.
    pub fn glyph(&self) -> &Glyph {
        &self.glyph
    }

    /// The recognized text, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn position(&self) -> (usize, usize) {
        (self.row(), self.col())
    }
}

impl PartialEq for Placement {
    fn eq(&self, other: &Placement) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Placement {}

impl PartialOrd for Placement {
    fn partial_cmp(&self, other: &Placement) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Placements are ordered by row, then by column.
impl Ord for Placement {
    fn cmp(&self, other: &Placement) -> Ordering {
        self.position().cmp(&other.position())
    }
}

/// Everything we found on one page.
#[derive(Debug)]
pub struct PageScan {
    placements: Vec<Placement>,
    labels: Pixmap<Label>,
}

impl PageScan {
    /// All placements, sorted by row and column.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// How many placements have no text.
    pub fn unrecognized(&self) -> usize {
        self.placements.iter().filter(|p| p.text.is_none()).count()
    }

    /// The first-pass segmentation of the page.
    pub fn labels(&self) -> &Pixmap<Label> {
        &self.labels
    }

    /// Reassemble recognized glyphs into lines of text.
    pub fn to_page_text(&self, word_spacing: usize) -> PageText {
        assemble_lines(&self.placements, word_spacing)
    }
}

/// Segments and recognizes pages.
#[derive(Clone, Debug, Default)]
pub struct PageReader {
    config: SegmenterConfig,
}

impl PageReader {
    /// Create a reader which segments pages using `config`.
    pub fn new(config: SegmenterConfig) -> PageReader {
        PageReader { config }
    }

    /// Find and recognize every glyph on `bitmap`.
    ///
    /// Components which aren't in the dictionary get a second chance: we
    /// split them into their 8-connected pieces, and if any piece is known,
    /// we use the pieces instead. Pieces which still aren't known go to
    /// `reader.read_glyph` one by one. If no piece is known, the whole
    /// component is handed to `reader.read_glyph`, which may prompt for it.
    pub fn read<R>(&self, bitmap: &Bitmap, reader: &mut R) -> Result<PageScan>
    where
        R: GlyphReader + ?Sized,
    {
        let segmentation = segment(bitmap, &self.config)?;
        let labels = segmentation.labels().clone();
        let mut placements = vec![];
        let mut split = 0;
        for component in segmentation.into_components() {
            if let Some(text) = reader.known(component.glyph()) {
                placements.push(Placement::new(&component, Some(text)));
                continue;
            }

            if let Some(pieces) = self.split_component(&component, reader)? {
                split += 1;
                placements.extend(pieces);
                continue;
            }

            let text = reader.read_glyph(component.glyph())?;
            if text.is_none() {
                debug!(
                    "unrecognized glyph at {:?}:\n{}",
                    component.bounds(),
                    component.glyph().to_ascii_art()
                );
            }
            placements.push(Placement::new(&component, text));
        }
        placements.sort();

        let scan = PageScan { placements, labels };
        trace!(
            "read {} glyphs ({} split on second pass)",
            scan.placements.len(),
            split
        );
        let unrecognized = scan.unrecognized();
        if unrecognized > 0 {
            warn!("{} glyphs were not recognized", unrecognized);
        }
        Ok(scan)
    }

    /// Try to read `component` as several smaller glyphs. Returns `None`
    /// unless it splits and at least one piece is known.
    fn split_component<R>(
        &self,
        component: &Component,
        reader: &mut R,
    ) -> Result<Option<Vec<Placement>>>
    where
        R: GlyphReader + ?Sized,
    {
        let pieces = resegment(component, &self.config)?;
        if pieces.len() < 2 {
            return Ok(None);
        }
        let known = pieces
            .iter()
            .map(|piece| reader.known(piece.glyph()))
            .collect::<Vec<_>>();
        if known.iter().all(Option::is_none) {
            return Ok(None);
        }
        let mut placements = Vec::with_capacity(pieces.len());
        for (piece, text) in pieces.iter().zip(known) {
            let text = match text {
                Some(text) => Some(text),
                None => reader.read_glyph(piece.glyph())?,
            };
            placements.push(Placement::new(piece, text));
        }
        Ok(Some(placements))
    }
}

/// The lines of text on one page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageText {
    lines: Vec<String>,
}

impl PageText {
    /// Build page text from already-assembled lines.
    pub fn from_lines<I, S>(lines: I) -> PageText
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PageText {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// The lines, top to bottom.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for PageText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// The text of several pages, in page order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeriesText {
    pages: Vec<PageText>,
}

impl SeriesText {
    /// Create an empty series.
    pub fn new() -> SeriesText {
        SeriesText::default()
    }

    /// Append the next page.
    pub fn push(&mut self, page: PageText) {
        self.pages.push(page);
    }

    /// The pages so far.
    pub fn pages(&self) -> &[PageText] {
        &self.pages
    }

    /// Every line of every page, in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|p| p.lines.iter().map(|l| l.as_str()))
    }
}

impl fmt::Display for SeriesText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for page in &self.pages {
            write!(f, "{}", page)?;
        }
        Ok(())
    }
}

/// A line under construction, keyed on the row of its first glyph.
struct LineBuilder<'a> {
    row: usize,
    band: Rect,
    glyphs: Vec<&'a Placement>,
}

impl<'a> LineBuilder<'a> {
    fn new(placement: &'a Placement) -> LineBuilder<'a> {
        LineBuilder {
            row: placement.row(),
            band: placement.bounds(),
            glyphs: vec![placement],
        }
    }

    /// Does `placement` belong to this line? It must start on the line's
    /// row, or fit entirely inside the line's band, the way `.`, `-` and
    /// `:` do.
    fn accepts(&self, placement: &Placement) -> bool {
        placement.row() == self.row || self.band.encloses(&placement.bounds())
    }

    fn to_text(&self, word_spacing: usize) -> String {
        let mut glyphs = self.glyphs.clone();
        glyphs.sort_by_key(|p| (p.col(), p.row()));
        let mut text = String::new();
        let mut prev_right: Option<usize> = None;
        for placement in glyphs {
            if let Some(right) = prev_right {
                if placement.col().saturating_sub(right) > word_spacing {
                    text.push(' ');
                }
            }
            // Only recognized placements make it into a line.
            text.push_str(placement.text().unwrap_or_default());
            prev_right = Some(placement.bounds().right());
        }
        text
    }
}

/// Group placements into lines and turn each line into text. Unrecognized
/// placements are dropped before grouping.
fn assemble_lines(placements: &[Placement], word_spacing: usize) -> PageText {
    let mut sorted = placements
        .iter()
        .filter(|p| p.text.is_some())
        .collect::<Vec<_>>();
    sorted.sort();

    let mut lines: Vec<LineBuilder> = vec![];
    for placement in sorted {
        match lines.last_mut() {
            Some(line) if line.accepts(placement) => {
                line.band = line.band.union(&placement.bounds());
                line.glyphs.push(placement);
            }
            _ => lines.push(LineBuilder::new(placement)),
        }
    }
    PageText {
        lines: lines.iter().map(|l| l.to_text(word_spacing)).collect(),
    }
}
