//! Run the whole pipeline over pages drawn with the test font.

use std::path::Path;
use std::sync::Arc;

use dose_ocr::test_util::{font_dictionary, render_lines};
use dose_ocr::{
    BinarizeOptions, Dialect, DoseOcr, Error, Glyph, GlyphDictionary, GlyphPrompt, Phantom,
    Provenance, Raster, Recognizer, ReportMetadata, ScanType, StructuredAcquisition,
    StructuredDose, TrainingRecognizer,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn metadata(manufacturer: &str) -> ReportMetadata {
    ReportMetadata {
        manufacturer: Some(manufacturer.to_owned()),
        modality: Some("CT".to_owned()),
        series_description: Some("Dose Report".to_owned()),
        study_uid: Some("1.2.840.99.1".to_owned()),
        ..ReportMetadata::default()
    }
}

fn dictionary_for(dialect: Dialect) -> GlyphDictionary {
    font_dictionary(&dialect.profile().segmenter).unwrap()
}

/// The font dictionary, minus the glyphs for `missing`.
fn dictionary_without(dialect: Dialect, missing: &str) -> GlyphDictionary {
    let records = dictionary_for(dialect)
        .to_records()
        .into_iter()
        .filter(|r| r.text != missing);
    GlyphDictionary::from_records(records).unwrap()
}

/// Always gives the same answer, counting how often it was asked.
struct Answer {
    text: &'static str,
    asked: usize,
}

impl GlyphPrompt for Answer {
    fn ask(&mut self, _glyph: &Glyph) -> dose_ocr::Result<Option<String>> {
        self.asked += 1;
        Ok(Some(self.text.to_owned()))
    }
}

#[test]
fn ge_report_across_two_pages() {
    init_logging();
    let mut ocr = DoseOcr::new(metadata("GE MEDICAL SYSTEMS")).unwrap();
    assert_eq!(ocr.dialect(), Dialect::Ge);
    let mut recognizer = Recognizer::new(Arc::new(dictionary_for(Dialect::Ge)));
    let options = BinarizeOptions::default();

    let page1 = render_lines(&[
        "Series Type Scan Range CTDIvol DLP Phantom",
        "(mm) (mGy) (mGy-cm)",
        "1 Scout - - -",
        "2 Helical S19.250-I658.250 17.95 1299.58 Body 32",
    ])
    .unwrap();
    let page2 = render_lines(&[
        "3 Axial I100.000-I140.000",
        "12.50 50.00 Head 16",
        "Total Exam DLP: 1349.58",
    ])
    .unwrap();
    ocr.add_page(&page1, &options, &mut recognizer).unwrap();
    ocr.add_page(&page2, &options, &mut recognizer).unwrap();

    let lines = ocr.text().lines().collect::<Vec<_>>();
    assert_eq!(lines[3], "2 HELICAL S19.250-I658.250 17.95 1299.58 BODY 32");
    assert_eq!(lines[6], "TOTAL EXAM DLP: 1349.58");

    let report = ocr.finish(&StructuredDose::default(), None);
    assert_eq!(report.dialect.as_deref(), Some("GE"));
    assert_eq!(report.study_uid.as_deref(), Some("1.2.840.99.1"));
    assert_eq!(report.acquisitions.len(), 3);
    assert_eq!(report.acquisitions[0].scan_type, ScanType::Localizer);
    let helical = &report.acquisitions[1];
    assert_eq!(helical.acquisition_number.as_deref(), Some("2"));
    assert_eq!(helical.ctdi_vol, Some(17.95));
    assert_eq!(helical.dlp, Some(1299.58));
    assert_eq!(helical.phantom, Phantom::Body32);
    let axial = &report.acquisitions[2];
    assert!(axial.complete);
    assert_eq!(axial.phantom, Phantom::Head16);
    assert_eq!(report.totals.dlp, Some(1349.58));
    assert_eq!(report.dlp_mismatch(), None);
    assert_eq!(report.provenance(), Provenance::Text);
}

#[test]
fn siemens_report_merged_with_structured_fields() {
    init_logging();
    let mut ocr = DoseOcr::new(metadata("SIEMENS")).unwrap();
    let mut recognizer = Recognizer::new(Arc::new(dictionary_for(Dialect::Siemens)));
    let page = render_lines(&[
        "Total mAs 2100 Total DLP 221.7 mGycm",
        "Scan KV mAs / ref. CTDIvol DLP TI cSL",
        "Patient Position H-SP",
        "ThoraxRoutine",
        "2 120 85 / 110 5.78 L 221.7 0.5 1.2",
    ])
    .unwrap();
    ocr.add_page(&page, &BinarizeOptions::default(), &mut recognizer)
        .unwrap();

    let structured = StructuredDose {
        acquisitions: vec![StructuredAcquisition {
            acquisition_number: Some("2".to_owned()),
            ctdi_vol: Some(5.80),
            ..StructuredAcquisition::default()
        }],
        ..StructuredDose::default()
    };
    let report = ocr.finish(&structured, None);
    assert_eq!(report.acquisitions.len(), 1);
    let a = &report.acquisitions[0];
    assert_eq!(a.protocol.as_deref(), Some("THORAXROUTINE"));
    assert_eq!(a.ctdi_vol, Some(5.80));
    assert_eq!(a.dlp, Some(221.7));
    assert_eq!(a.provenance, Provenance::Mixed);
    assert!(a.scan_length_derived);
    assert_eq!(report.totals.dlp, Some(221.7));
}

#[test]
fn unknown_glyphs_drop_out_of_the_text() {
    init_logging();
    let mut ocr = DoseOcr::new(metadata("GE MEDICAL SYSTEMS")).unwrap();
    let mut recognizer = Recognizer::new(Arc::new(dictionary_without(Dialect::Ge, "9")));
    let page = render_lines(&["Total Exam DLP: 1299.58"]).unwrap();
    ocr.add_page(&page, &BinarizeOptions::default(), &mut recognizer)
        .unwrap();
    assert_eq!(
        ocr.text().lines().collect::<Vec<_>>(),
        &["TOTAL EXAM DLP: 12 .58"]
    );
    let report = ocr.finish(&StructuredDose::default(), None);
    assert_eq!(report.totals.dlp, Some(12.0));
}

#[test]
fn training_learns_each_new_glyph_once() {
    init_logging();
    let dictionary = Arc::new(dictionary_without(Dialect::Ge, "9"));
    let prompt = Answer {
        text: "9",
        asked: 0,
    };
    let mut training = TrainingRecognizer::new(Recognizer::new(dictionary.clone()), prompt);
    let mut ocr = DoseOcr::new(metadata("GE MEDICAL SYSTEMS")).unwrap();
    let page = render_lines(&["Total Exam DLP: 1299.58"]).unwrap();
    ocr.add_page(&page, &BinarizeOptions::default(), &mut training)
        .unwrap();
    assert_eq!(
        ocr.text().lines().collect::<Vec<_>>(),
        &["TOTAL EXAM DLP: 1299.58"]
    );

    let learned = training.into_learned();
    assert_eq!(learned.len(), 1);
    let mut updated = (*dictionary).clone();
    assert_eq!(updated.merge(learned), 1);
    assert_eq!(updated.len(), dictionary.len() + 1);
}

#[test]
fn oversized_regions_abort_only_that_page() {
    init_logging();
    let mut ocr = DoseOcr::new(metadata("PHILIPS")).unwrap();
    let mut recognizer = Recognizer::new(Arc::new(dictionary_for(Dialect::Philips)));
    let options = BinarizeOptions::default();

    let mut samples = vec![0; 200 * 200];
    for y in 20..180 {
        for x in 20..180 {
            samples[y * 200 + x] = 255;
        }
    }
    let blob = Raster::new(200, 200, 8, false, samples).unwrap();
    match ocr.add_page(&blob, &options, &mut recognizer) {
        Err(Error::ConnectivityOverflow { limit, .. }) => assert_eq!(limit, 10_000),
        other => panic!("expected an overflow, got {:?}", other),
    }
    assert!(ocr.text().pages().is_empty());

    let page = render_lines(&["2 Helical 150 120 9.8 402.1 Body"]).unwrap();
    ocr.add_page(&page, &options, &mut recognizer).unwrap();
    let report = ocr.finish(&StructuredDose::default(), None);
    assert_eq!(report.acquisitions.len(), 1);
    assert_eq!(report.acquisitions[0].dlp, Some(402.1));
}

#[test]
fn other_series_are_not_dose_reports() {
    let mut chest = metadata("GE MEDICAL SYSTEMS");
    chest.series_description = Some("Chest 1.25mm".to_owned());
    assert!(DoseOcr::new(chest).is_none());
    assert!(DoseOcr::new(metadata("ACME")).is_none());
}

// To run this test, use `cargo test -- --ignored`. This reads real report
// captures and dictionaries from a private corpus which can't be shared.
#[test]
#[ignore]
fn private_corpus() {
    init_logging();
    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let dictionary = GlyphDictionary::load(Path::new("../private/glyphs.json")).unwrap();
    let recognizer = Recognizer::new(Arc::new(dictionary));
    for entry in glob::glob_with("../private/**/*.png", options).unwrap() {
        let path = entry.unwrap();
        let vendor = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut ocr = DoseOcr::new(metadata(&vendor)).unwrap().named(
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let raster = Raster::from_image(&image::open(&path).unwrap()).unwrap();
        ocr.add_page(&raster, &BinarizeOptions::default(), &mut recognizer.clone())
            .unwrap();
        let report = ocr.finish(&StructuredDose::default(), None);
        assert!(!report.acquisitions.is_empty(), "{}", path.display());
    }
}
