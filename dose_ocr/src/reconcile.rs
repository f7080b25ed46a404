//! Merge dose records read from report text with machine-readable dose
//! fields from the same study.

use log::{debug, warn};

use crate::dialect::ParsedDose;
use crate::model::{
    AcquisitionWindow, DoseAcquisition, DoseReport, DoseTotals, Phantom, Provenance,
    ReportMetadata, ScanType, StructuredAcquisition, StructuredDose,
};

/// Which sources contributed to a record.
#[derive(Default)]
struct Sources {
    text: bool,
    structured: bool,
}

impl Sources {
    /// Use `structured` if present, otherwise keep `value`.
    fn merge<T>(&mut self, value: &mut Option<T>, structured: Option<T>) {
        match structured {
            Some(s) => {
                *value = Some(s);
                self.structured = true;
            }
            None if value.is_some() => self.text = true,
            None => {}
        }
    }

    fn provenance(&self) -> Provenance {
        match (self.text, self.structured) {
            (_, false) => Provenance::Text,
            (false, true) => Provenance::Structured,
            (true, true) => Provenance::Mixed,
        }
    }
}

/// Build the final report from parsed text and any structured dose data.
/// Structured values win over text values, field by field.
pub fn reconcile(
    parsed: ParsedDose,
    structured: &StructuredDose,
    metadata: &ReportMetadata,
    window: Option<AcquisitionWindow>,
) -> DoseReport {
    let mut unmatched = structured.acquisitions.iter().collect::<Vec<_>>();
    let mut acquisitions = vec![];
    for mut record in parsed.acquisitions {
        let matched = record.acquisition_number.as_deref().and_then(|number| {
            let i = unmatched
                .iter()
                .position(|s| same_number(s.acquisition_number.as_deref(), number))?;
            Some(unmatched.remove(i))
        });
        match matched {
            Some(s) => merge_structured(&mut record, s),
            None => record.provenance = Provenance::Text,
        }
        acquisitions.push(record);
    }
    for s in unmatched {
        debug!("adding structured-only acquisition {:?}", s.acquisition_number);
        let mut record = DoseAcquisition {
            complete: true,
            ..DoseAcquisition::default()
        };
        merge_structured(&mut record, s);
        acquisitions.push(record);
    }
    for record in &mut acquisitions {
        normalize_scan_length(record);
    }

    let (totals, totals_provenance) = merge_totals(parsed.totals, structured.totals);
    let report = DoseReport {
        study_uid: metadata.study_uid.clone(),
        study_description: metadata.study_description.clone(),
        start: window.map(|w| w.start).or(metadata.study_datetime),
        end: window.map(|w| w.end).or(metadata.study_datetime),
        dialect: None,
        acquisitions,
        totals,
        totals_provenance,
    };
    if let Some(difference) = report.dlp_mismatch() {
        warn!(
            "total DLP {:?} differs from the sum of acquisitions {:.2} by {:.2}",
            report.totals.total(),
            report.dlp_sum(),
            difference
        );
    }
    report
}

/// Acquisition numbers match if they are equal as numbers or as text.
fn same_number(structured: Option<&str>, parsed: &str) -> bool {
    let Some(structured) = structured.map(str::trim) else {
        return false;
    };
    match (structured.parse::<u64>(), parsed.trim().parse::<u64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => structured.eq_ignore_ascii_case(parsed.trim()),
    }
}

fn merge_structured(record: &mut DoseAcquisition, s: &StructuredAcquisition) {
    let mut sources = Sources::default();
    sources.merge(&mut record.acquisition_number, s.acquisition_number.clone());
    sources.merge(&mut record.ctdi_vol, s.ctdi_vol);
    sources.merge(&mut record.dlp, s.dlp);
    sources.merge(&mut record.exposure_time_s, s.exposure_time_s);
    sources.merge(&mut record.total_mas, s.total_mas);
    sources.merge(&mut record.kvp, s.kvp);
    sources.merge(&mut record.scan_length_mm, s.scan_length_mm);

    let mut scan_type = Some(record.scan_type).filter(|t| *t != ScanType::Unknown);
    sources.merge(&mut scan_type, s.scan_type.filter(|t| *t != ScanType::Unknown));
    record.scan_type = scan_type.unwrap_or_default();

    let mut phantom = Some(record.phantom).filter(|p| *p != Phantom::Unknown);
    sources.merge(&mut phantom, s.phantom.filter(|p| *p != Phantom::Unknown));
    record.phantom = phantom.unwrap_or_default();

    if record.scan_range.is_some() || record.protocol.is_some() {
        sources.text = true;
    }
    record.provenance = sources.provenance();
}

/// Overranging and sequenced scans make the printed range shorter than the
/// length actually irradiated. When DLP / CTDIvol implies a longer scan, use
/// that instead.
fn normalize_scan_length(record: &mut DoseAcquisition) {
    let (Some(dlp), Some(ctdi)) = (record.dlp, record.ctdi_vol) else {
        return;
    };
    if ctdi <= 0.0 {
        return;
    }
    // DLP is in mGy·cm.
    let derived = dlp / ctdi * 10.0;
    let longer = match record.scan_length_mm {
        Some(supplied) => derived > supplied,
        None => true,
    };
    if longer {
        debug!(
            "using derived scan length {:.1} mm instead of {:?}",
            derived, record.scan_length_mm
        );
        record.scan_length_mm = Some(derived);
        record.scan_length_derived = true;
    }
}

fn merge_totals(parsed: DoseTotals, structured: DoseTotals) -> (DoseTotals, Provenance) {
    let mut sources = Sources::default();
    let mut totals = parsed;
    sources.merge(&mut totals.dlp, structured.dlp);
    sources.merge(&mut totals.head_dlp, structured.head_dlp);
    sources.merge(&mut totals.body_dlp, structured.body_dlp);
    (totals, sources.provenance())
}
