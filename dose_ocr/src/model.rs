//! The canonical dose report and its parts.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an acquisition moved the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// Step-and-shoot.
    Axial,
    /// Continuous table movement.
    Helical,
    /// A scout, topogram, scanogram or surview.
    Localizer,
    /// No table movement: cine, perfusion, fluoroscopy.
    Stationary,
    /// The report didn't say.
    #[default]
    Unknown,
}

impl ScanType {
    /// Interpret one word of vendor vocabulary.
    pub fn from_word(word: &str) -> ScanType {
        match word.to_ascii_uppercase().as_str() {
            "HELICAL" | "SPIRAL" | "HELIX" => ScanType::Helical,
            "AXIAL" | "SEQ" | "SEQUENCE" | "SEQUENCED" => ScanType::Axial,
            "SCOUT" | "TOPOGRAM" | "SCANO" | "SCANOGRAM" | "SURVIEW" | "LOCALIZER" => {
                ScanType::Localizer
            }
            "STATIONARY" | "CINE" | "FLUORO" | "PERFUSION" => ScanType::Stationary,
            _ => ScanType::Unknown,
        }
    }

    /// Guess from a phrase such as a protocol name, using the first word
    /// we recognize.
    pub fn from_phrase(phrase: &str) -> ScanType {
        phrase
            .split(|c: char| !c.is_ascii_alphanumeric())
            .map(ScanType::from_word)
            .find(|t| *t != ScanType::Unknown)
            .unwrap_or_default()
    }
}

/// The reference phantom a dose figure is calibrated against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phantom {
    /// 16 cm head phantom.
    Head16,
    /// 32 cm body phantom.
    Body32,
    /// The report didn't say.
    #[default]
    Unknown,
}

impl Phantom {
    /// Interpret a phantom name and optional diameter in cm, such as `BODY`
    /// and `32`. A diameter wins over the name. Siemens reports use `L` for
    /// the large (body) phantom and `S` for the small (head) one.
    pub fn from_words(name: Option<&str>, size: Option<&str>) -> Phantom {
        match size.map(str::trim) {
            Some("32") => return Phantom::Body32,
            Some("16") => return Phantom::Head16,
            _ => {}
        }
        match name.map(|n| n.trim().to_ascii_uppercase()).as_deref() {
            Some("BODY") | Some("L") => Phantom::Body32,
            Some("HEAD") | Some("S") => Phantom::Head16,
            _ => Phantom::Unknown,
        }
    }
}

/// Patient axes, as printed in front of a table position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Superior.
    S,
    /// Inferior.
    I,
    /// Anterior.
    A,
    /// Posterior.
    P,
    /// Right.
    R,
    /// Left.
    L,
}

impl Direction {
    fn from_char(c: char) -> Option<Direction> {
        match c.to_ascii_uppercase() {
            'S' => Some(Direction::S),
            'I' => Some(Direction::I),
            'A' => Some(Direction::A),
            'P' => Some(Direction::P),
            'R' => Some(Direction::R),
            'L' => Some(Direction::L),
            _ => None,
        }
    }

    /// Which axis this direction runs along, and its sign on that axis.
    fn axis(self) -> (u8, f64) {
        match self {
            Direction::S => (0, 1.0),
            Direction::I => (0, -1.0),
            Direction::A => (1, 1.0),
            Direction::P => (1, -1.0),
            Direction::L => (2, 1.0),
            Direction::R => (2, -1.0),
        }
    }
}

/// A table position such as `S19.250`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnatomicPosition {
    /// Which way from the origin.
    pub direction: Direction,
    /// Distance from the origin in mm.
    pub mm: f64,
}

impl AnatomicPosition {
    /// Parse a position like `S19.250` or `I658.250`.
    pub fn parse(s: &str) -> Option<AnatomicPosition> {
        let s = s.trim();
        let mut chars = s.chars();
        let direction = Direction::from_char(chars.next()?)?;
        let mm = chars.as_str().trim().parse::<f64>().ok()?;
        Some(AnatomicPosition { direction, mm })
    }

    /// Signed coordinate along this position's axis.
    fn signed(&self) -> (u8, f64) {
        let (axis, sign) = self.direction.axis();
        (axis, sign * self.mm)
    }
}

impl fmt::Display for AnatomicPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}{:.3}", self.direction, self.mm)
    }
}

/// The start and end positions of one acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanRange {
    /// Where the acquisition started.
    pub start: AnatomicPosition,
    /// Where it ended.
    pub end: AnatomicPosition,
}

impl ScanRange {
    /// Parse a range like `S19.250-I658.250`.
    pub fn parse(s: &str) -> Option<ScanRange> {
        lazy_static! {
            static ref RANGE: Regex =
                Regex::new(r"^\s*([SIAPRL]\s*\d+(?:\.\d+)?)\s*-\s*([SIAPRL]\s*\d+(?:\.\d+)?)\s*$")
                    .unwrap();
        }
        let caps = RANGE.captures(s)?;
        Some(ScanRange {
            start: AnatomicPosition::parse(&caps[1])?,
            end: AnatomicPosition::parse(&caps[2])?,
        })
    }

    /// Length in mm, if both ends lie on the same axis.
    pub fn length_mm(&self) -> Option<f64> {
        let (start_axis, start) = self.start.signed();
        let (end_axis, end) = self.end.signed();
        if start_axis == end_axis {
            Some((end - start).abs())
        } else {
            None
        }
    }
}

/// Where a value came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Recovered by reading the text of the report.
    #[default]
    Text,
    /// Copied from machine-readable fields.
    Structured,
    /// Some of each.
    Mixed,
}

impl Provenance {
    /// Combine the provenance of two values.
    pub fn combine(self, other: Provenance) -> Provenance {
        if self == other {
            self
        } else {
            Provenance::Mixed
        }
    }
}

/// One acquisition event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DoseAcquisition {
    /// The series or acquisition number as printed.
    pub acquisition_number: Option<String>,
    /// The protocol name, where the report shows one.
    pub protocol: Option<String>,
    /// How the table moved.
    pub scan_type: ScanType,
    /// Start and end table positions.
    pub scan_range: Option<ScanRange>,
    /// CTDIvol, mGy.
    pub ctdi_vol: Option<f64>,
    /// DLP, mGy·cm.
    pub dlp: Option<f64>,
    /// The phantom CTDIvol and DLP refer to.
    pub phantom: Phantom,
    /// Exposure time in seconds.
    pub exposure_time_s: Option<f64>,
    /// Total tube current-time product, mAs.
    pub total_mas: Option<f64>,
    /// Tube voltage, kV.
    pub kvp: Option<f64>,
    /// Scan length in mm.
    pub scan_length_mm: Option<f64>,
    /// Was `scan_length_mm` derived from DLP and CTDIvol?
    pub scan_length_derived: bool,
    /// Where the values came from.
    pub provenance: Provenance,
    /// `false` if this record was emitted before all of its expected fields
    /// were seen.
    pub complete: bool,
}

impl DoseAcquisition {
    /// Does this record carry anything at all?
    pub fn is_empty(&self) -> bool {
        self.acquisition_number.is_none()
            && self.protocol.is_none()
            && self.scan_type == ScanType::Unknown
            && self.scan_range.is_none()
            && self.ctdi_vol.is_none()
            && self.dlp.is_none()
            && self.phantom == Phantom::Unknown
            && self.exposure_time_s.is_none()
            && self.total_mas.is_none()
            && self.kvp.is_none()
    }
}

/// Report-wide DLP totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DoseTotals {
    /// Total DLP over the whole exam, mGy·cm.
    pub dlp: Option<f64>,
    /// Total DLP referenced to the head phantom, where split.
    pub head_dlp: Option<f64>,
    /// Total DLP referenced to the body phantom, where split.
    pub body_dlp: Option<f64>,
}

impl DoseTotals {
    /// The overall total, falling back to the sum of the phantom split.
    pub fn total(&self) -> Option<f64> {
        self.dlp.or(match (self.head_dlp, self.body_dlp) {
            (None, None) => None,
            (head, body) => Some(head.unwrap_or(0.0) + body.unwrap_or(0.0)),
        })
    }

    /// Which phantom the total refers to, if only one half of a head/body
    /// split was reported.
    pub fn phantom(&self) -> Phantom {
        match (self.head_dlp, self.body_dlp) {
            (Some(_), None) => Phantom::Head16,
            (None, Some(_)) => Phantom::Body32,
            _ => Phantom::Unknown,
        }
    }

    /// Fill in fields missing here from `other`.
    pub fn or(self, other: DoseTotals) -> DoseTotals {
        DoseTotals {
            dlp: self.dlp.or(other.dlp),
            head_dlp: self.head_dlp.or(other.head_dlp),
            body_dlp: self.body_dlp.or(other.body_dlp),
        }
    }

    /// Is any total present?
    pub fn is_empty(&self) -> bool {
        self.total().is_none()
    }
}

/// Dose values from machine-readable fields for one acquisition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredAcquisition {
    /// Matched against `DoseAcquisition::acquisition_number`.
    pub acquisition_number: Option<String>,
    /// How the table moved.
    pub scan_type: Option<ScanType>,
    /// CTDIvol, mGy.
    pub ctdi_vol: Option<f64>,
    /// DLP, mGy·cm.
    pub dlp: Option<f64>,
    /// The phantom CTDIvol and DLP refer to.
    pub phantom: Option<Phantom>,
    /// Exposure time in seconds.
    pub exposure_time_s: Option<f64>,
    /// Total tube current-time product, mAs.
    pub total_mas: Option<f64>,
    /// Tube voltage, kV.
    pub kvp: Option<f64>,
    /// Scan length in mm.
    pub scan_length_mm: Option<f64>,
}

/// All machine-readable dose fields found alongside a report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredDose {
    /// Per-acquisition values.
    pub acquisitions: Vec<StructuredAcquisition>,
    /// Whole-study values.
    pub totals: DoseTotals,
}

impl StructuredDose {
    /// Did we find anything?
    pub fn is_empty(&self) -> bool {
        self.acquisitions.is_empty() && self.totals.is_empty()
    }
}

/// Descriptive fields of the dataset a report came from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// The scanner vendor.
    pub manufacturer: Option<String>,
    /// Usually `CT`, or `OT`/`SC` for screen captures.
    pub modality: Option<String>,
    /// Free text describing the series.
    pub series_description: Option<String>,
    /// The values of the image type field, such as `DERIVED`, `SECONDARY`.
    pub image_type: Vec<String>,
    /// The study instance UID.
    pub study_uid: Option<String>,
    /// Free text describing the study.
    pub study_description: Option<String>,
    /// When the study was performed.
    pub study_datetime: Option<NaiveDateTime>,
}

/// The earliest and latest acquisition times seen in the study's images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionWindow {
    /// The earliest acquisition time.
    pub start: NaiveDateTime,
    /// The latest acquisition time.
    pub end: NaiveDateTime,
}

impl AcquisitionWindow {
    /// The smallest window containing every time in `times`.
    pub fn spanning<I>(times: I) -> Option<AcquisitionWindow>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        times.into_iter().fold(None, |window, t| {
            Some(match window {
                None => AcquisitionWindow { start: t, end: t },
                Some(AcquisitionWindow { start, end }) => AcquisitionWindow {
                    start: start.min(t),
                    end: end.max(t),
                },
            })
        })
    }
}

/// A complete, reconciled dose report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DoseReport {
    /// The study instance UID.
    pub study_uid: Option<String>,
    /// Free text describing the study.
    pub study_description: Option<String>,
    /// When the first acquisition began.
    pub start: Option<NaiveDateTime>,
    /// When the last acquisition began.
    pub end: Option<NaiveDateTime>,
    /// Name of the report layout the text was parsed with.
    pub dialect: Option<String>,
    /// Every acquisition, in report order.
    pub acquisitions: Vec<DoseAcquisition>,
    /// Whole-study totals.
    pub totals: DoseTotals,
    /// Where the totals came from.
    pub totals_provenance: Provenance,
}

impl DoseReport {
    /// Sum of the per-acquisition DLPs.
    pub fn dlp_sum(&self) -> f64 {
        self.acquisitions.iter().filter_map(|a| a.dlp).sum()
    }

    /// If the reported total and the sum of the acquisitions disagree by
    /// more than 1 mGy·cm or 1%, return the difference (total minus sum).
    pub fn dlp_mismatch(&self) -> Option<f64> {
        let total = self.totals.total()?;
        let difference = total - self.dlp_sum();
        let tolerance = (total.abs() * 0.01).max(1.0);
        if difference.abs() > tolerance {
            Some(difference)
        } else {
            None
        }
    }

    /// Where the values in this report came from, taken as a whole.
    pub fn provenance(&self) -> Provenance {
        self.acquisitions
            .iter()
            .map(|a| a.provenance)
            .fold(self.totals_provenance, Provenance::combine)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scan_types_from_vendor_words() {
        assert_eq!(ScanType::from_word("Helical"), ScanType::Helical);
        assert_eq!(ScanType::from_word("SPIRAL"), ScanType::Helical);
        assert_eq!(ScanType::from_word("topogram"), ScanType::Localizer);
        assert_eq!(ScanType::from_word("CINE"), ScanType::Stationary);
        assert_eq!(ScanType::from_word("BOLUS"), ScanType::Unknown);
        assert_eq!(ScanType::from_phrase("HEAD SEQ 5MM"), ScanType::Axial);
        assert_eq!(ScanType::from_phrase("THORAXROUTINE"), ScanType::Unknown);
    }

    #[test]
    fn phantoms_from_words() {
        assert_eq!(Phantom::from_words(Some("BODY"), Some("32")), Phantom::Body32);
        assert_eq!(Phantom::from_words(Some("HEAD"), None), Phantom::Head16);
        assert_eq!(Phantom::from_words(Some("L"), None), Phantom::Body32);
        assert_eq!(Phantom::from_words(Some("S"), None), Phantom::Head16);
        assert_eq!(Phantom::from_words(Some("BODY"), Some("16")), Phantom::Head16);
        assert_eq!(Phantom::from_words(None, None), Phantom::Unknown);
    }

    #[test]
    fn scan_range_lengths() {
        let range = ScanRange::parse("S19.250-I658.250").unwrap();
        assert_eq!(range.start.direction, Direction::S);
        assert_eq!(range.start.mm, 19.25);
        assert_eq!(range.end.direction, Direction::I);
        assert_eq!(range.end.mm, 658.25);
        assert_eq!(range.length_mm(), Some(677.5));

        let same_side = ScanRange::parse("I10.0 - I110.0").unwrap();
        assert_eq!(same_side.length_mm(), Some(100.0));
        let crossed = ScanRange::parse("S10-A20").unwrap();
        assert_eq!(crossed.length_mm(), None);
        assert!(ScanRange::parse("19.250-658.250").is_none());
    }

    #[test]
    fn totals_fall_back_to_the_phantom_split() {
        let split = DoseTotals {
            dlp: None,
            head_dlp: Some(800.0),
            body_dlp: Some(400.0),
        };
        assert_eq!(split.total(), Some(1200.0));
        assert_eq!(split.phantom(), Phantom::Unknown);
        let head_only = DoseTotals {
            head_dlp: Some(800.0),
            ..DoseTotals::default()
        };
        assert_eq!(head_only.phantom(), Phantom::Head16);
        assert!(DoseTotals::default().is_empty());
    }

    #[test]
    fn dlp_mismatch_has_a_tolerance() {
        let acquisition = |dlp| DoseAcquisition {
            dlp: Some(dlp),
            ..DoseAcquisition::default()
        };
        let mut report = DoseReport {
            acquisitions: vec![acquisition(600.0), acquisition(699.58)],
            totals: DoseTotals {
                dlp: Some(1299.58),
                ..DoseTotals::default()
            },
            ..DoseReport::default()
        };
        assert_eq!(report.dlp_mismatch(), None);
        report.acquisitions.pop();
        let difference = report.dlp_mismatch().unwrap();
        assert!((difference - 699.58).abs() < 1e-6);
        report.totals = DoseTotals::default();
        assert_eq!(report.dlp_mismatch(), None);
    }

    #[test]
    fn report_provenance_combines_sources() {
        let mut report = DoseReport {
            acquisitions: vec![DoseAcquisition::default()],
            ..DoseReport::default()
        };
        assert_eq!(report.provenance(), Provenance::Text);
        report.acquisitions[0].provenance = Provenance::Structured;
        assert_eq!(report.provenance(), Provenance::Mixed);
    }

    #[test]
    fn acquisition_windows_span_all_times() {
        let t = |s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap();
        let window = AcquisitionWindow::spanning(vec![
            t("2024-01-02 10:05:00"),
            t("2024-01-02 09:55:00"),
            t("2024-01-02 10:01:00"),
        ])
        .unwrap();
        assert_eq!(window.start, t("2024-01-02 09:55:00"));
        assert_eq!(window.end, t("2024-01-02 10:05:00"));
        assert!(AcquisitionWindow::spanning(vec![]).is_none());
    }
}
