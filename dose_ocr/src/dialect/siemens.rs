//! Siemens "Patient Protocol" screens.
//!
//! ```text
//! Total mAs 4321  Total DLP 461.7 mGycm
//!
//!                    Scan  KV   mAs / ref.  CTDIvol  DLP     TI   cSL
//! Patient Position H-SP                     mGy      mGycm   s    mm
//! Topogram           1     120  35 mA                        6.8  0.6
//! ThoraxRoutine      2     120  85 / 110    5.78 L   221.7   0.5  1.2
//!                    3     120  90 / 110    6.10 L   240.0   0.5  1.2
//! ```
//!
//! Protocol names may sit on their own line above the values. A protocol
//! name applies to every row after it until the next one. Lines of words
//! above the column header are screen captions, not protocol names.

use lazy_static::lazy_static;

use super::{Action, LineKind, LinePattern};
use crate::model::ScanType;

/// One or more words of a protocol name. Words start with a letter, so that
/// a protocol name never swallows the scan number.
const PROTOCOL: &str = r"(?P<protocol>[A-Z][A-Z0-9_.\-]*(?: [A-Z][A-Z0-9_.\-]*)*)";

lazy_static! {
    pub(super) static ref PATTERNS: Vec<LinePattern> = vec![
        LinePattern::new(
            LineKind::Total,
            r"^TOTAL MAS (?P<mas_total>\d+) TOTAL DLP (?P<total>{NUM})",
        ),
        LinePattern::new(LineKind::Header, r"^SCAN KV MAS ?/ ?REF\.? CTDIVOL DLP\b"),
        LinePattern::new(LineKind::Units, r"^MGY MGYCM S MM$"),
        LinePattern::new(LineKind::Units, r"^(?:\([A-Z*/\-]+\)\s*)+$"),
        LinePattern::new(LineKind::Noise, r"^PATIENT POSITION\b"),
        LinePattern::new(
            LineKind::Row,
            &format!(
                r"^(?:{} )?(?P<number>\d+) (?P<kv>\d+) (?P<mas>{{NUM}}) ?/ ?(?P<ref>{{VALUE}}) (?P<ctdi>{{VALUE}}) (?:(?P<phantom>[LS]) )?(?P<dlp>{{VALUE}}) (?P<time>{{NUM}}) (?P<csl>{{NUM}})$",
                PROTOCOL
            ),
        ),
        LinePattern::new(
            LineKind::Row,
            &format!(
                r"^(?:{} )?(?P<number>\d+) (?P<kv>\d+) (?P<ma>\d+) ?MA (?P<time>{{NUM}}) (?P<csl>{{NUM}})$",
                PROTOCOL
            ),
        )
        .implies(ScanType::Localizer),
        LinePattern::new(LineKind::Protocol, &format!("^{}$", PROTOCOL)),
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum State {
    /// We haven't seen the column header yet.
    Waiting,
    Idle,
    /// We've seen a protocol name, but not its values.
    Named,
}

pub(super) fn transition(state: State, kind: LineKind) -> (State, Action) {
    use self::State::*;
    match (state, kind) {
        (_, LineKind::Header) => (Idle, Action::Reset),
        (Waiting, LineKind::Protocol) => (Waiting, Action::Skip),
        (_, LineKind::Protocol) => (Named, Action::Begin),
        (Named, LineKind::Row) => (Idle, Action::Finish),
        (Idle, LineKind::Row) => (Idle, Action::Single),
        (Waiting, LineKind::Row) => (Waiting, Action::Single),
        (state, _) => (state, Action::Skip),
    }
}
