//! Philips "Dose Info" screens: one row per series, with totals below.
//!
//! ```text
//! Series  Type     mAs   kV   CTDIvol  DLP    Phantom
//! 1       Surview  -     120  -        -      Body
//! 2       Helical  150   120  9.8      402.1  Body
//! Total DLP (Body): 402.1
//! ```

use lazy_static::lazy_static;

use super::{Action, LineKind, LinePattern};

lazy_static! {
    pub(super) static ref PATTERNS: Vec<LinePattern> = vec![
        LinePattern::new(LineKind::Total, r"^TOTAL DLP ?\(HEAD\) ?:? ?(?P<head_total>{NUM})"),
        LinePattern::new(LineKind::Total, r"^TOTAL DLP ?\(BODY\) ?:? ?(?P<body_total>{NUM})"),
        LinePattern::new(LineKind::Total, r"^TOTAL DLP ?:? ?(?P<total>{NUM})"),
        LinePattern::new(LineKind::Header, r"^SERIES TYPE MAS KV CTDIVOL DLP\b"),
        LinePattern::new(LineKind::Units, r"^(?:\([A-Z*/\-]+\)\s*)+$"),
        LinePattern::new(
            LineKind::Row,
            r"^(?P<number>\d+) (?P<type>[A-Z]+) (?P<mas>{VALUE}) (?P<kv>{VALUE}) (?P<ctdi>{VALUE}) (?P<dlp>{VALUE}) (?P<phantom>BODY|HEAD)$",
        ),
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum State {
    Idle,
}

pub(super) fn transition(state: State, kind: LineKind) -> (State, Action) {
    match kind {
        LineKind::Header => (State::Idle, Action::Reset),
        LineKind::Row => (State::Idle, Action::Single),
        _ => (state, Action::Skip),
    }
}
