//! Vendor report layouts ("dialects"), and the line-driven parser which
//! turns recognized report text into dose records.
//!
//! Every dialect supplies two things: an ordered list of line patterns,
//! each of which classifies a line as one [`LineKind`], and a transition
//! table mapping `(state, kind)` to `(next state, action)`. The parser
//! itself is shared. It upper-cases each line, takes the first pattern
//! which matches, and applies the action. Whenever an action starts a new
//! event or section while another event is still being collected, the
//! unfinished event is emitted as a partial record first.

use log::{debug, trace, warn};
use regex::{Captures, Regex};
use std::fmt;

use crate::model::{
    DoseAcquisition, DoseTotals, Phantom, Provenance, ReportMetadata, ScanRange, ScanType,
};
use crate::segmentation::SegmenterConfig;

mod ge;
mod philips;
mod siemens;
mod toshiba;

/// A number, optionally with a fractional part.
const NUM: &str = r"\d+(?:\.\d+)?";

/// A number or a `-` placeholder.
const VALUE: &str = r"(?:\d+(?:\.\d+)?|-)";

/// A table position like `S19.250`.
const POSITION: &str = r"[SIAPRL]\d+(?:\.\d+)?";

/// A known report layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// GE "Dose Report" screens.
    Ge,
    /// Siemens "Patient Protocol" screens.
    Siemens,
    /// Toshiba and Canon "Dose Info" screens.
    Toshiba,
    /// Philips "Dose Info" screens.
    Philips,
}

impl Dialect {
    /// Work out which dialect a report uses. Returns `None` if the dataset
    /// doesn't look like a dose report from a known vendor.
    pub fn detect(metadata: &ReportMetadata) -> Option<Dialect> {
        let upper = |s: &Option<String>| s.as_deref().unwrap_or_default().to_ascii_uppercase();
        let series = upper(&metadata.series_description);
        let looks_like_dose_screen = series.contains("DOSE")
            || metadata.image_type.iter().any(|t| {
                let t = t.trim().to_ascii_uppercase();
                t == "SCREEN SAVE" || t == "DOSE_INFO" || t == "SECONDARY"
            });
        if !looks_like_dose_screen {
            debug!("not a dose screen: {:?}", metadata.series_description);
            return None;
        }

        let manufacturer = upper(&metadata.manufacturer);
        let dialect = if manufacturer == "GE"
            || manufacturer.starts_with("GE ")
            || manufacturer.contains("GENERAL ELECTRIC")
        {
            Dialect::Ge
        } else if manufacturer.contains("SIEMENS") {
            Dialect::Siemens
        } else if manufacturer.contains("TOSHIBA") || manufacturer.contains("CANON") {
            Dialect::Toshiba
        } else if manufacturer.contains("PHILIPS") {
            Dialect::Philips
        } else {
            debug!("no dialect for manufacturer {:?}", metadata.manufacturer);
            return None;
        };
        debug!("selected {} dialect", dialect);
        Some(dialect)
    }

    /// How this vendor's reports should be segmented and spaced.
    pub fn profile(self) -> DialectProfile {
        let (horizontal_gap, vertical_gap) = match self {
            Dialect::Ge => (2, 3),
            Dialect::Siemens => (1, 2),
            Dialect::Toshiba => (1, 2),
            Dialect::Philips => (1, 3),
        };
        DialectProfile {
            segmenter: SegmenterConfig {
                horizontal_gap,
                vertical_gap,
                ..SegmenterConfig::default()
            },
            word_spacing: crate::layout::DEFAULT_WORD_SPACING,
        }
    }

    /// Parse the text of a complete report.
    pub fn parse<'a, I>(self, lines: I) -> ParsedDose
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut parser = DoseTextParser::new(self);
        for line in lines {
            parser.push_line(line);
        }
        parser.finish()
    }

    fn patterns(self) -> &'static [LinePattern] {
        match self {
            Dialect::Ge => &ge::PATTERNS,
            Dialect::Siemens => &siemens::PATTERNS,
            Dialect::Toshiba => &toshiba::PATTERNS,
            Dialect::Philips => &philips::PATTERNS,
        }
    }

    /// Does the most recent protocol name apply to every following event?
    fn carries_protocol(self) -> bool {
        self == Dialect::Siemens
    }

    fn initial_state(self) -> State {
        match self {
            Dialect::Ge => State::Ge(ge::State::Idle),
            Dialect::Siemens => State::Siemens(siemens::State::Waiting),
            Dialect::Toshiba => State::Toshiba(toshiba::State::Idle),
            Dialect::Philips => State::Philips(philips::State::Idle),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Dialect::Ge => "GE",
            Dialect::Siemens => "Siemens",
            Dialect::Toshiba => "Toshiba",
            Dialect::Philips => "Philips",
        };
        f.write_str(name)
    }
}

/// Per-dialect tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DialectProfile {
    /// Gap tolerances for finding glyphs.
    pub segmenter: SegmenterConfig,
    /// Glyphs further apart than this many columns are separate words.
    pub word_spacing: usize,
}

/// What a line looks like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// A report-wide DLP total.
    Total,
    /// Column headings, starting a new section.
    Header,
    /// Units for the column headings.
    Units,
    /// Recognized, but carries nothing we need.
    Noise,
    /// A protocol name on its own line, starting a new event.
    Protocol,
    /// A complete event on one line.
    Row,
    /// The first line of an event which continues on later lines.
    EventHead,
    /// Exposure settings for the current event.
    Exposure,
    /// The last line of an event.
    EventTail,
}

/// What the parser does with a classified line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    /// Ignore the line.
    Skip,
    /// A new section begins. Nothing to record.
    Reset,
    /// Start a new event with this line's fields.
    Begin,
    /// Add this line's fields to the current event.
    Accumulate,
    /// Add this line's fields and emit the finished event.
    Finish,
    /// Emit an event made from this line alone.
    Single,
}

impl Action {
    /// Does this action start something new, so that any unfinished event
    /// must be emitted first?
    fn starts_new(self) -> bool {
        matches!(self, Action::Reset | Action::Begin | Action::Single)
    }
}

/// The parser state of each dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Ge(ge::State),
    Siemens(siemens::State),
    Toshiba(toshiba::State),
    Philips(philips::State),
}

impl State {
    fn transition(self, kind: LineKind) -> (State, Action) {
        match self {
            State::Ge(s) => {
                let (s, action) = ge::transition(s, kind);
                (State::Ge(s), action)
            }
            State::Siemens(s) => {
                let (s, action) = siemens::transition(s, kind);
                (State::Siemens(s), action)
            }
            State::Toshiba(s) => {
                let (s, action) = toshiba::transition(s, kind);
                (State::Toshiba(s), action)
            }
            State::Philips(s) => {
                let (s, action) = philips::transition(s, kind);
                (State::Philips(s), action)
            }
        }
    }
}

/// One line pattern of a dialect.
pub(crate) struct LinePattern {
    kind: LineKind,
    regex: Regex,
    /// Scan type implied by lines of this shape, such as Siemens topogram
    /// lines.
    scan_type: Option<ScanType>,
}

impl LinePattern {
    /// Build a pattern. `pattern` may refer to `{NUM}`, `{VALUE}` and
    /// `{POSITION}`. Panics if the pattern is invalid, so only use this to
    /// build constant pattern tables.
    pub(crate) fn new(kind: LineKind, pattern: &str) -> LinePattern {
        let pattern = pattern
            .replace("{NUM}", NUM)
            .replace("{VALUE}", VALUE)
            .replace("{POSITION}", POSITION);
        LinePattern {
            kind,
            regex: Regex::new(&pattern).unwrap(),
            scan_type: None,
        }
    }

    /// Lines matching this pattern describe `scan_type` scans.
    pub(crate) fn implies(mut self, scan_type: ScanType) -> LinePattern {
        self.scan_type = Some(scan_type);
        self
    }
}

/// The output of a dialect parser.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedDose {
    /// Acquisitions in the order they were printed.
    pub acquisitions: Vec<DoseAcquisition>,
    /// Totals from the report's summary lines.
    pub totals: DoseTotals,
}

/// A streaming parser for one report's text.
pub struct DoseTextParser {
    dialect: Dialect,
    state: State,
    pending: Option<DoseAcquisition>,
    protocol: Option<String>,
    parsed: ParsedDose,
}

impl DoseTextParser {
    /// Create a parser for `dialect`.
    pub fn new(dialect: Dialect) -> DoseTextParser {
        DoseTextParser {
            dialect,
            state: dialect.initial_state(),
            pending: None,
            protocol: None,
            parsed: ParsedDose::default(),
        }
    }

    /// Feed the next line of text.
    pub fn push_line(&mut self, line: &str) {
        let line = normalize_line(line);
        if line.is_empty() {
            return;
        }
        let Some((pattern, caps)) = self
            .dialect
            .patterns()
            .iter()
            .find_map(|p| p.regex.captures(&line).map(|caps| (p, caps)))
        else {
            trace!("unmatched line: {:?}", line);
            return;
        };

        if pattern.kind == LineKind::Total {
            apply_totals(&mut self.parsed.totals, &caps);
            return;
        }

        let (next, action) = self.state.transition(pattern.kind);
        trace!(
            "{:?} + {:?} -> {:?}, {:?}: {:?}",
            self.state,
            pattern.kind,
            next,
            action,
            line
        );
        self.state = next;

        if action.starts_new() {
            self.flush_partial();
        }
        match action {
            Action::Skip | Action::Reset => {}
            Action::Begin => {
                let mut record = DoseAcquisition::default();
                self.apply(&mut record, pattern, &caps);
                self.pending = Some(record);
            }
            Action::Accumulate => {
                let mut record = self.pending.take().unwrap_or_default();
                self.apply(&mut record, pattern, &caps);
                self.pending = Some(record);
            }
            Action::Finish | Action::Single => {
                let mut record = self.pending.take().unwrap_or_default();
                self.apply(&mut record, pattern, &caps);
                self.emit(record, true);
            }
        }
    }

    /// Finish parsing, emitting any unfinished event.
    pub fn finish(mut self) -> ParsedDose {
        self.flush_partial();
        debug!(
            "{} parser found {} acquisitions, totals {:?}",
            self.dialect,
            self.parsed.acquisitions.len(),
            self.parsed.totals
        );
        self.parsed
    }

    fn flush_partial(&mut self) {
        if let Some(record) = self.pending.take() {
            warn!(
                "emitting partial {} record {:?}",
                self.dialect, record.acquisition_number
            );
            self.emit(record, false);
        }
    }

    fn emit(&mut self, mut record: DoseAcquisition, complete: bool) {
        if self.dialect.carries_protocol() && record.protocol.is_none() {
            record.protocol = self.protocol.clone();
        }
        if record.scan_type == ScanType::Unknown {
            if let Some(protocol) = &record.protocol {
                record.scan_type = ScanType::from_phrase(protocol);
            }
        }
        record.provenance = Provenance::Text;
        record.complete = complete;
        if !record.is_empty() {
            self.parsed.acquisitions.push(record);
        }
    }

    /// Copy every field captured from one line into `record`.
    fn apply(&mut self, record: &mut DoseAcquisition, pattern: &LinePattern, caps: &Captures) {
        let text = |name: &str| caps.name(name).map(|m| m.as_str().trim());

        if let Some(number) = text("number") {
            record.acquisition_number = Some(number.to_owned());
        }
        if let Some(protocol) = text("protocol") {
            record.protocol = Some(protocol.to_owned());
            self.protocol = Some(protocol.to_owned());
        }
        if let Some(scan_type) = pattern.scan_type {
            record.scan_type = scan_type;
        } else if let Some(word) = text("type") {
            record.scan_type = ScanType::from_word(word);
        }
        if let (Some(start), Some(end)) = (text("start"), text("end")) {
            record.scan_range = ScanRange::parse(&format!("{}-{}", start, end));
            record.scan_length_mm = record.scan_range.and_then(|r| r.length_mm());
        }
        if let Some(ctdi) = text("ctdi") {
            record.ctdi_vol = dose_value(ctdi);
        }
        if let Some(dlp) = text("dlp") {
            record.dlp = dose_value(dlp);
        }
        if text("phantom").is_some() || text("size").is_some() {
            record.phantom = Phantom::from_words(text("phantom"), text("size"));
        }
        if let Some(kv) = text("kv").and_then(plain_value) {
            record.kvp = Some(kv);
        }
        if let Some(time) = text("time").and_then(plain_value) {
            record.exposure_time_s = Some(time);
        }
        let mas = text("mas").and_then(plain_value);
        let ma = text("ma").and_then(plain_value);
        if let Some(mas) = mas {
            record.total_mas = Some(mas);
        } else if let (Some(ma), Some(time)) = (ma, record.exposure_time_s) {
            record.total_mas = Some(ma * time);
        }
    }
}

/// Upper-case a line and collapse its whitespace.
fn normalize_line(line: &str) -> String {
    line.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Parse a CTDIvol or DLP figure. A zero or a `-` placeholder means there
/// was no dose figure, not a dose of zero.
fn dose_value(s: &str) -> Option<f64> {
    plain_value(s).filter(|&v| v != 0.0)
}

/// Parse a number, treating a `-` placeholder as absent.
fn plain_value(s: &str) -> Option<f64> {
    match s.trim() {
        "" | "-" => None,
        s => s.parse::<f64>().ok(),
    }
}

fn apply_totals(totals: &mut DoseTotals, caps: &Captures) {
    let value = |name: &str| caps.name(name).and_then(|m| plain_value(m.as_str()));
    if let Some(total) = value("total") {
        totals.dlp = Some(total);
    }
    if let Some(head) = value("head_total") {
        totals.head_dlp = Some(head);
    }
    if let Some(body) = value("body_total") {
        totals.body_dlp = Some(body);
    }
    trace!("totals now {:?}", totals);
}
