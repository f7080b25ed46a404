//! Toshiba and Canon "Dose Information" screens. Each event takes up to
//! three lines: the scan and its range, the exposure settings, and the dose.
//!
//! ```text
//! Total DLP: 912.4
//! Contrast/Scan Range   CTDIvol  DLP       Phantom
//!                       (mGy)    (mGy*cm)
//! 1 Scano
//! 120kV 50mA 2.5s
//!                       -        -         Body
//! 2 Helical S20.0-I380.0
//! 120kV 250mA 0.5s 125mAs
//!                       22.5     910.0     Body
//! ```

use lazy_static::lazy_static;

use super::{Action, LineKind, LinePattern};

lazy_static! {
    pub(super) static ref PATTERNS: Vec<LinePattern> = vec![
        LinePattern::new(LineKind::Total, r"^TOTAL DLP ?\(HEAD\) ?:? ?(?P<head_total>{NUM})"),
        LinePattern::new(LineKind::Total, r"^TOTAL DLP ?\(BODY\) ?:? ?(?P<body_total>{NUM})"),
        LinePattern::new(LineKind::Total, r"^TOTAL DLP ?:? ?(?P<total>{NUM})"),
        LinePattern::new(LineKind::Header, r"^(?:CONTRAST ?/ ?)?SCAN RANGE CTDIVOL DLP\b"),
        LinePattern::new(LineKind::Units, r"^(?:\([A-Z*/\-]+\)\s*)+$"),
        LinePattern::new(
            LineKind::Exposure,
            r"^(?P<kv>\d+) ?KV (?P<ma>\d+) ?MA (?P<time>{NUM}) ?S(?: (?P<mas>{NUM}) ?MAS)?$",
        ),
        LinePattern::new(
            LineKind::EventTail,
            r"^(?P<ctdi>{VALUE}) (?P<dlp>{VALUE}) (?P<phantom>BODY|HEAD)$",
        ),
        LinePattern::new(
            LineKind::EventHead,
            r"^(?P<number>\d+) (?P<type>[A-Z]+)(?: (?P<start>{POSITION}) ?- ?(?P<end>{POSITION}))?$",
        ),
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum State {
    Idle,
    /// We've seen the scan line.
    Started,
    /// We've seen the scan and exposure lines.
    Exposed,
}

pub(super) fn transition(state: State, kind: LineKind) -> (State, Action) {
    use self::State::*;
    match (state, kind) {
        (_, LineKind::Header) => (Idle, Action::Reset),
        (_, LineKind::EventHead) => (Started, Action::Begin),
        (Started, LineKind::Exposure) => (Exposed, Action::Accumulate),
        (Started, LineKind::EventTail) | (Exposed, LineKind::EventTail) => (Idle, Action::Finish),
        (state, _) => (state, Action::Skip),
    }
}
