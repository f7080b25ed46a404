//! Reading report pages and correlated CT images from disk.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use dicom::object::{open_file, DefaultDicomObject, InMemDicomObject};
use dicom::pixeldata::{PhotometricInterpretation, PixelDecoder, PixelRepresentation};
use dose_ocr::{
    AcquisitionWindow, BinarizeOptions, DoseTotals, Raster, ReportMetadata,
    StructuredAcquisition, StructuredDose, Window,
};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

/// One report page, ready to OCR.
#[derive(Debug)]
pub struct Page {
    pub path: PathBuf,
    pub raster: Raster,
    pub options: BinarizeOptions,
    pub metadata: ReportMetadata,
    pub instance_number: Option<i64>,
    /// Dose fields stored in the page's own dataset.
    pub dose: StructuredDose,
}

/// The files to read: `path` itself, or the files directly inside it,
/// sorted by name.
pub fn input_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_owned()]);
    }
    let mut files = vec![];
    for entry in fs::read_dir(path).with_context(|| format!("could not list {}", path.display()))? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Does `path` have the `DICM` magic after the 128-byte preamble?
pub fn is_dicom(path: &Path) -> Result<bool> {
    let mut header = [0; 132];
    let mut file =
        fs::File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(&header[128..] == b"DICM"),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err).with_context(|| format!("could not read {}", path.display())),
    }
}

/// Load a single page, as DICOM if it looks like DICOM and as an ordinary
/// image otherwise.
pub fn read_page(path: &Path) -> Result<Page> {
    if is_dicom(path)? {
        read_dicom_page(path)
    } else {
        read_image_page(path)
    }
}

fn read_image_page(path: &Path) -> Result<Page> {
    let image =
        image::open(path).with_context(|| format!("could not decode {}", path.display()))?;
    Ok(Page {
        path: path.to_owned(),
        raster: Raster::from_image(&image)?,
        options: BinarizeOptions::default(),
        metadata: ReportMetadata::default(),
        instance_number: None,
        dose: StructuredDose::default(),
    })
}

fn read_dicom_page(path: &Path) -> Result<Page> {
    debug!("reading DICOM page {}", path.display());
    let object = open_file(path).with_context(|| format!("could not open {}", path.display()))?;
    let raster = dicom_raster(&object).with_context(|| format!("no pixels in {}", path.display()))?;
    let window = match (number(&object, "WindowCenter"), number(&object, "WindowWidth")) {
        (Some(center), Some(width)) => Some(Window { center, width }),
        _ => None,
    };
    let options = BinarizeOptions {
        window,
        padding_value: number(&object, "PixelPaddingValue").map(|v| v as i32),
    };
    Ok(Page {
        path: path.to_owned(),
        raster,
        options,
        metadata: dicom_metadata(&object),
        instance_number: number(&object, "InstanceNumber").map(|n| n as i64),
        dose: page_dose(&object),
    })
}

/// Dose fields a scanner stored alongside the report image: CTDIvol and
/// exposure from the image itself or its CT exposure sequence, and a total
/// DLP from the dose comments.
fn page_dose(object: &InMemDicomObject) -> StructuredDose {
    let exposures = object
        .element_by_name("CTExposureSequence")
        .ok()
        .and_then(|element| element.items())
        .unwrap_or_default();
    let sum = |name: &str, scale: f64| {
        exposures
            .iter()
            .filter_map(|item| number(item, name))
            .reduce(|a, b| a + b)
            .map(|v| v / scale)
    };
    let ctdi_vol = number(object, "CTDIvol").or_else(|| {
        exposures
            .iter()
            .filter_map(|item| number(item, "CTDIvol"))
            .reduce(f64::max)
    });
    let acquisition = StructuredAcquisition {
        acquisition_number: text(object, "AcquisitionNumber"),
        ctdi_vol,
        kvp: number(object, "KVP"),
        exposure_time_s: sum("ExposureTimeInms", 1000.0),
        total_mas: sum("ExposureInmAs", 1.0),
        ..StructuredAcquisition::default()
    };
    let has_values = acquisition.ctdi_vol.is_some()
        || acquisition.exposure_time_s.is_some()
        || acquisition.total_mas.is_some();
    // Without a number there's nothing to match the values against.
    let acquisitions = if acquisition.acquisition_number.is_some() && has_values {
        vec![acquisition]
    } else {
        vec![]
    };

    let totals = DoseTotals {
        dlp: ["CommentsOnRadiationDose", "ImageComments"]
            .iter()
            .filter_map(|name| text(object, name))
            .find_map(|comment| total_dlp(&comment)),
        ..DoseTotals::default()
    };
    StructuredDose {
        acquisitions,
        totals,
    }
}

/// Find a total DLP in free text such as `Total DLP = 461.7 mGycm`.
fn total_dlp(comment: &str) -> Option<f64> {
    lazy_static! {
        static ref DLP: Regex =
            Regex::new(r"(?i)\btotal\s*dlp\s*[=:]?\s*(\d+(?:\.\d+)?)").unwrap();
    }
    DLP.captures(comment)?.get(1)?.as_str().parse().ok()
}

/// Add `extra` to `dose`. Values already in `dose` win.
pub fn merge_dose(dose: &mut StructuredDose, extra: &StructuredDose) {
    for acquisition in &extra.acquisitions {
        let known = dose
            .acquisitions
            .iter()
            .any(|a| a.acquisition_number == acquisition.acquisition_number);
        if !known {
            dose.acquisitions.push(acquisition.clone());
        }
    }
    let totals = &mut dose.totals;
    totals.dlp = totals.dlp.or(extra.totals.dlp);
    totals.head_dlp = totals.head_dlp.or(extra.totals.head_dlp);
    totals.body_dlp = totals.body_dlp.or(extra.totals.body_dlp);
}

fn dicom_raster(object: &DefaultDicomObject) -> Result<Raster> {
    let decoded = object.decode_pixel_data()?;
    if decoded.number_of_frames() == 0 {
        return Err(anyhow!("pixel data has no frames"));
    }
    let photometric = decoded.photometric_interpretation();
    if !photometric.is_monochrome() {
        debug!("reducing {} pixel data to gray", photometric.as_str());
        let image = decoded.to_dynamic_image(0)?;
        return Ok(Raster::from_image(&image)?);
    }

    let samples = decoded.to_vec_frame::<i32>(0)?;
    let bits_stored = u8::try_from(decoded.bits_stored())
        .map_err(|_| anyhow!("unsupported bit depth {}", decoded.bits_stored()))?;
    let raster = Raster::new(
        decoded.columns() as usize,
        decoded.rows() as usize,
        bits_stored,
        matches!(decoded.pixel_representation(), PixelRepresentation::Signed),
        samples,
    )?;
    // MONOCHROME1 stores dark as high values.
    if matches!(photometric, PhotometricInterpretation::Monochrome1) {
        Ok(raster.inverted())
    } else {
        Ok(raster)
    }
}

fn dicom_metadata(object: &DefaultDicomObject) -> ReportMetadata {
    let study_date = text(object, "StudyDate");
    let study_time = text(object, "StudyTime");
    ReportMetadata {
        manufacturer: text(object, "Manufacturer"),
        modality: text(object, "Modality"),
        series_description: text(object, "SeriesDescription"),
        image_type: text(object, "ImageType")
            .map(|t| t.split('\\').map(|v| v.trim().to_owned()).collect())
            .unwrap_or_default(),
        study_uid: text(object, "StudyInstanceUID"),
        study_description: text(object, "StudyDescription"),
        study_datetime: study_date.and_then(|d| datetime(&d, study_time.as_deref())),
    }
}

/// What one CT image tells us about its acquisition.
#[derive(Debug, Default)]
struct ImageDose {
    ctdi_vol: Option<f64>,
    kvp: Option<f64>,
    exposure_time_s: Option<f64>,
    slice_location: Option<f64>,
    acquired: Option<NaiveDateTime>,
}

/// Collect machine-readable dose fields from the CT images in `dir`.
/// Images are grouped by acquisition number. Unreadable files are skipped.
pub fn read_structured(dir: &Path) -> Result<(StructuredDose, Option<AcquisitionWindow>)> {
    let mut by_acquisition = BTreeMap::<String, Vec<ImageDose>>::new();
    for path in input_files(dir)? {
        if !is_dicom(&path)? {
            continue;
        }
        let object = match open_file(&path) {
            Ok(object) => object,
            Err(err) => {
                warn!("skipping {}: {}", path.display(), err);
                continue;
            }
        };
        let acquired = text(&object, "AcquisitionDate")
            .and_then(|d| datetime(&d, text(&object, "AcquisitionTime").as_deref()));
        let image = ImageDose {
            ctdi_vol: number(&object, "CTDIvol"),
            kvp: number(&object, "KVP"),
            exposure_time_s: number(&object, "ExposureTime").map(|ms| ms / 1000.0),
            slice_location: number(&object, "SliceLocation"),
            acquired,
        };
        let key = text(&object, "AcquisitionNumber").unwrap_or_default();
        by_acquisition.entry(key).or_default().push(image);
    }

    let window = AcquisitionWindow::spanning(
        by_acquisition
            .values()
            .flatten()
            .filter_map(|image| image.acquired),
    );
    let acquisitions = by_acquisition
        .into_iter()
        .map(|(number, images)| summarize(number, &images))
        .collect::<Vec<_>>();
    debug!(
        "found {} acquisitions in {}",
        acquisitions.len(),
        dir.display()
    );
    let structured = StructuredDose {
        acquisitions,
        ..StructuredDose::default()
    };
    Ok((structured, window))
}

fn summarize(number: String, images: &[ImageDose]) -> StructuredAcquisition {
    let low = smallest(images, |i| i.slice_location);
    let high = largest(images, |i| i.slice_location);
    let scan_length_mm = match (low, high) {
        (Some(low), Some(high)) if high > low => Some(high - low),
        _ => None,
    };
    StructuredAcquisition {
        acquisition_number: Some(number).filter(|n| !n.is_empty()),
        ctdi_vol: largest(images, |i| i.ctdi_vol),
        kvp: largest(images, |i| i.kvp),
        exposure_time_s: largest(images, |i| i.exposure_time_s),
        scan_length_mm,
        ..StructuredAcquisition::default()
    }
}

fn largest<F>(images: &[ImageDose], field: F) -> Option<f64>
where
    F: Fn(&ImageDose) -> Option<f64>,
{
    images.iter().filter_map(field).reduce(f64::max)
}

fn smallest<F>(images: &[ImageDose], field: F) -> Option<f64>
where
    F: Fn(&ImageDose) -> Option<f64>,
{
    images.iter().filter_map(field).reduce(f64::min)
}

fn text(object: &InMemDicomObject, name: &str) -> Option<String> {
    object
        .element_by_name(name)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The first value of a numeric attribute.
fn number(object: &InMemDicomObject, name: &str) -> Option<f64> {
    text(object, name)?.split('\\').next()?.trim().parse().ok()
}

/// Combine a DICOM date (`YYYYMMDD`) and an optional time (`HHMMSS.FFFFFF`,
/// possibly truncated).
fn datetime(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y%m%d").ok()?;
    let time = time
        .and_then(|t| {
            let digits = t.trim().split('.').next()?;
            let padded = format!("{:0<6}", digits);
            NaiveTime::parse_from_str(&padded, "%H%M%S").ok()
        })
        .unwrap_or(NaiveTime::MIN);
    Some(date.and_time(time))
}

#[cfg(test)]
mod test {
    use dicom::core::{DataElement, PrimitiveValue, Tag, VR};

    use super::*;

    #[test]
    fn dicom_datetimes() {
        let t = datetime("20240301", Some("081530.25")).unwrap();
        assert_eq!(t.to_string(), "2024-03-01 08:15:30");
        let t = datetime("20240301", Some("0815")).unwrap();
        assert_eq!(t.to_string(), "2024-03-01 08:15:00");
        let t = datetime("20240301", None).unwrap();
        assert_eq!(t.to_string(), "2024-03-01 00:00:00");
        assert!(datetime("2024", None).is_none());
    }

    #[test]
    fn acquisitions_are_summarized() {
        let images = [
            ImageDose {
                ctdi_vol: Some(10.5),
                kvp: Some(120.0),
                slice_location: Some(-150.0),
                ..ImageDose::default()
            },
            ImageDose {
                ctdi_vol: Some(10.5),
                slice_location: Some(150.0),
                ..ImageDose::default()
            },
        ];
        let a = summarize("2".to_owned(), &images);
        assert_eq!(a.acquisition_number.as_deref(), Some("2"));
        assert_eq!(a.ctdi_vol, Some(10.5));
        assert_eq!(a.kvp, Some(120.0));
        assert_eq!(a.scan_length_mm, Some(300.0));
        assert_eq!(summarize(String::new(), &[]).acquisition_number, None);
    }

    fn dataset(elements: Vec<(u16, u16, VR, PrimitiveValue)>) -> InMemDicomObject {
        InMemDicomObject::from_element_iter(elements.into_iter().map(
            |(group, element, vr, value)| DataElement::new(Tag(group, element), vr, value),
        ))
    }

    #[test]
    fn report_pages_carry_their_own_dose_fields() {
        let page = dataset(vec![
            (0x0018, 0x9345, VR::FD, PrimitiveValue::from(17.95)),
            (0x0020, 0x0012, VR::IS, PrimitiveValue::from("2")),
            (0x0040, 0x0310, VR::ST, PrimitiveValue::from("Total DLP = 1299.58 mGycm")),
        ]);
        let dose = page_dose(&page);
        assert_eq!(dose.acquisitions.len(), 1);
        assert_eq!(dose.acquisitions[0].acquisition_number.as_deref(), Some("2"));
        assert_eq!(dose.acquisitions[0].ctdi_vol, Some(17.95));
        assert_eq!(dose.totals.dlp, Some(1299.58));
    }

    #[test]
    fn pages_without_dose_fields_add_nothing() {
        let page = dataset(vec![
            (0x0020, 0x0012, VR::IS, PrimitiveValue::from("2")),
            (0x0020, 0x4000, VR::LT, PrimitiveValue::from("Scout only")),
        ]);
        assert!(page_dose(&page).is_empty());
        assert_eq!(total_dlp("TotalDLP: 461.7"), Some(461.7));
        assert_eq!(total_dlp("DLP 461.7"), None);
    }

    #[test]
    fn merged_dose_keeps_existing_values() {
        let mut dose = StructuredDose {
            acquisitions: vec![StructuredAcquisition {
                acquisition_number: Some("2".to_owned()),
                ctdi_vol: Some(10.0),
                ..StructuredAcquisition::default()
            }],
            ..StructuredDose::default()
        };
        let page = StructuredDose {
            acquisitions: vec![
                StructuredAcquisition {
                    acquisition_number: Some("2".to_owned()),
                    ctdi_vol: Some(99.0),
                    ..StructuredAcquisition::default()
                },
                StructuredAcquisition {
                    acquisition_number: Some("3".to_owned()),
                    ctdi_vol: Some(5.0),
                    ..StructuredAcquisition::default()
                },
            ],
            totals: DoseTotals {
                dlp: Some(400.0),
                ..DoseTotals::default()
            },
        };
        merge_dose(&mut dose, &page);
        assert_eq!(dose.acquisitions.len(), 2);
        assert_eq!(dose.acquisitions[0].ctdi_vol, Some(10.0));
        assert_eq!(dose.totals.dlp, Some(400.0));
    }

    #[test]
    fn plain_files_are_not_dicom() {
        let path = std::env::temp_dir().join("dosereport_not_dicom.txt");
        fs::write(&path, "hello").unwrap();
        assert!(!is_dicom(&path).unwrap());
        fs::remove_file(&path).unwrap();
    }
}
