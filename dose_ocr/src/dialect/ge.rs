//! GE "Dose Report" screens.
//!
//! ```text
//! Series  Type     Scan Range        CTDIvol  DLP      Phantom
//!                  (mm)              (mGy)    (mGy-cm)
//! 1       Scout    -                 -        -
//! 2       Helical  S19.250-I658.250  17.95    1299.58  Body 32
//!                                    Total Exam DLP:   1299.58
//! ```
//!
//! Long rows are sometimes wrapped, with the dose columns on a line of
//! their own.

use lazy_static::lazy_static;

use super::{Action, LineKind, LinePattern};

lazy_static! {
    pub(super) static ref PATTERNS: Vec<LinePattern> = vec![
        LinePattern::new(LineKind::Total, r"^TOTAL EXAM DLP\s*:?\s*(?P<total>{NUM})"),
        LinePattern::new(LineKind::Header, r"^SERIES TYPE SCAN ?RANGE\b"),
        LinePattern::new(LineKind::Units, r"^(?:\([A-Z*/\-]+\)\s*)+$"),
        LinePattern::new(
            LineKind::Row,
            r"^(?P<number>\d+) (?P<type>[A-Z]+) (?P<start>{POSITION})\s*-\s*(?P<end>{POSITION}) (?P<ctdi>{VALUE}) (?P<dlp>{VALUE}) (?P<phantom>BODY|HEAD)\s*(?P<size>\d+)$",
        ),
        LinePattern::new(LineKind::Row, r"^(?P<number>\d+) (?P<type>SCOUT)(?: -)*$"),
        LinePattern::new(
            LineKind::EventHead,
            r"^(?P<number>\d+) (?P<type>[A-Z]+) (?P<start>{POSITION})\s*-\s*(?P<end>{POSITION})$",
        ),
        LinePattern::new(
            LineKind::EventTail,
            r"^(?P<ctdi>{VALUE}) (?P<dlp>{VALUE}) (?P<phantom>BODY|HEAD)\s*(?P<size>\d+)$",
        ),
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum State {
    Idle,
    /// We've seen the first half of a wrapped row.
    AwaitingTail,
}

pub(super) fn transition(state: State, kind: LineKind) -> (State, Action) {
    use self::State::*;
    match (state, kind) {
        (_, LineKind::Header) => (Idle, Action::Reset),
        (_, LineKind::Row) => (Idle, Action::Single),
        (_, LineKind::EventHead) => (AwaitingTail, Action::Begin),
        (AwaitingTail, LineKind::EventTail) => (Idle, Action::Finish),
        (state, _) => (state, Action::Skip),
    }
}

#[cfg(test)]
mod test {
    use crate::dialect::Dialect;
    use crate::model::{Direction, Phantom, ScanType};

    #[test]
    fn single_line_rows() {
        let parsed = Dialect::Ge.parse(vec!["2 HELICAL S19.250-I658.250 17.95 1299.58 BODY 32"]);
        assert_eq!(parsed.acquisitions.len(), 1);
        let a = &parsed.acquisitions[0];
        assert_eq!(a.acquisition_number.as_deref(), Some("2"));
        assert_eq!(a.scan_type, ScanType::Helical);
        let range = a.scan_range.unwrap();
        assert_eq!((range.start.direction, range.start.mm), (Direction::S, 19.25));
        assert_eq!((range.end.direction, range.end.mm), (Direction::I, 658.25));
        assert_eq!(a.ctdi_vol, Some(17.95));
        assert_eq!(a.dlp, Some(1299.58));
        assert_eq!(a.phantom, Phantom::Body32);
        assert!(a.complete);
    }

    #[test]
    fn total_line() {
        let parsed = Dialect::Ge.parse(vec!["Total Exam DLP: 1299.58"]);
        assert!(parsed.acquisitions.is_empty());
        assert_eq!(parsed.totals.dlp, Some(1299.58));
    }

    #[test]
    fn whole_report() {
        let text = "\
Series Type Scan Range CTDIvol DLP Phantom
(mm) (mGy) (mGy-cm)
1 Scout - - -
2 Helical S19.250-I658.250 17.95 1299.58 Body 32
3 Axial I100.000-I140.000
12.5 50.0 Head 16
Total Exam DLP: 1349.58";
        let parsed = Dialect::Ge.parse(text.lines());
        let numbers = parsed
            .acquisitions
            .iter()
            .map(|a| a.acquisition_number.as_deref().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(numbers, &["1", "2", "3"]);
        assert_eq!(parsed.acquisitions[0].scan_type, ScanType::Localizer);
        assert_eq!(parsed.acquisitions[0].dlp, None);
        let wrapped = &parsed.acquisitions[2];
        assert_eq!(wrapped.scan_type, ScanType::Axial);
        assert_eq!(wrapped.scan_length_mm, Some(40.0));
        assert_eq!(wrapped.ctdi_vol, Some(12.5));
        assert_eq!(wrapped.phantom, Phantom::Head16);
        assert!(parsed.acquisitions.iter().all(|a| a.complete));
        assert_eq!(parsed.totals.dlp, Some(1349.58));
    }

    #[test]
    fn zero_doses_are_absent() {
        let parsed = Dialect::Ge.parse(vec!["4 Axial S10.000-I10.000 0 0 Head 16"]);
        let a = &parsed.acquisitions[0];
        assert_eq!(a.ctdi_vol, None);
        assert_eq!(a.dlp, None);
        assert_eq!(a.phantom, Phantom::Head16);
    }

    #[test]
    fn interrupted_rows_become_partial_records() {
        let text = "\
3 Helical S10.000-I200.000
4 Helical I200.000-I400.000
10.5 210.0 Body 32";
        let parsed = Dialect::Ge.parse(text.lines());
        assert_eq!(parsed.acquisitions.len(), 2);
        let partial = &parsed.acquisitions[0];
        assert_eq!(partial.acquisition_number.as_deref(), Some("3"));
        assert!(!partial.complete);
        assert_eq!(partial.scan_length_mm, Some(210.0));
        assert_eq!(partial.dlp, None);
        let next = &parsed.acquisitions[1];
        assert_eq!(next.acquisition_number.as_deref(), Some("4"));
        assert!(next.complete);
        assert_eq!(next.dlp, Some(210.0));
    }

    #[test]
    fn unfinished_rows_are_flushed_at_the_end() {
        let parsed = Dialect::Ge.parse(vec!["5 Helical S10.000-I200.000"]);
        assert_eq!(parsed.acquisitions.len(), 1);
        assert!(!parsed.acquisitions[0].complete);
    }

    #[test]
    fn orphan_tails_are_ignored() {
        let parsed = Dialect::Ge.parse(vec!["10.5 210.0 Body 32"]);
        assert!(parsed.acquisitions.is_empty());
    }
}
