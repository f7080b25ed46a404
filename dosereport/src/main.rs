//! Extract CT radiation dose data from dose report screen captures.

use std::{
    fs::File,
    io::{stdout, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use dose_ocr::{
    bundled_dictionary, DoseOcr, DoseReport, GlyphDictionary, GlyphReader, Recognizer,
    TrainingRecognizer,
};
use log::{info, warn};

use crate::input::{input_files, merge_dose, read_page, read_structured, Page};
use crate::prompt::TerminalPrompt;

mod input;
mod prompt;

#[derive(Debug, Parser)]
/// Read the dose figures from CT "dose report" screen captures, and print
/// them as JSON. Pages may be DICOM files or ordinary images.
#[command(name = "dosereport", version)]
struct Args {
    /// A dose report page, or a directory containing its pages.
    input: PathBuf,

    /// A directory of CT images from the same study. Their dose fields are
    /// merged into the report.
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,

    /// Write the report here instead of to standard output.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// The glyph dictionary to use. Defaults to the built-in one.
    #[arg(long, value_name = "PATH")]
    dictionary: Option<PathBuf>,

    /// Ask about unknown glyphs, and save the updated dictionary here.
    #[arg(long, value_name = "PATH")]
    record_glyphs: Option<PathBuf>,

    /// The scanner manufacturer, for images without DICOM metadata.
    #[arg(long)]
    manufacturer: Option<String>,

    /// The series description, for images without DICOM metadata.
    #[arg(long)]
    series_description: Option<String>,

    /// Print the text we read from each page to standard error.
    #[arg(long)]
    print_text: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let pages = load_pages(&args.input)?;
    let mut metadata = pages[0].metadata.clone();
    if let Some(manufacturer) = &args.manufacturer {
        metadata.manufacturer = Some(manufacturer.clone());
    }
    if let Some(description) = &args.series_description {
        metadata.series_description = Some(description.clone());
    }
    let Some(ocr) = DoseOcr::new(metadata) else {
        println!("{}: not a recognized dose report", args.input.display());
        return Ok(());
    };
    let name = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_owned());
    let mut ocr = ocr.named(name);
    info!("reading {} pages as a {} report", pages.len(), ocr.dialect());

    let dictionary = match &args.dictionary {
        Some(path) => GlyphDictionary::load(path)
            .with_context(|| format!("could not load dictionary {}", path.display()))?,
        None => bundled_dictionary()?,
    };
    let dictionary = Arc::new(dictionary);
    let recognizer = Recognizer::new(dictionary.clone());

    match &args.record_glyphs {
        Some(record_path) => {
            let mut training = TrainingRecognizer::new(recognizer, TerminalPrompt::stdin());
            read_pages(&mut ocr, &pages, &mut training);
            let mut updated = (*dictionary).clone();
            let added = updated.merge(training.into_learned());
            updated
                .save(record_path)
                .with_context(|| format!("could not save {}", record_path.display()))?;
            info!("added {} glyphs to {}", added, record_path.display());
        }
        None => {
            let mut recognizer = recognizer;
            read_pages(&mut ocr, &pages, &mut recognizer);
        }
    }

    if args.print_text {
        eprintln!("{}", ocr.text());
    }

    let (mut structured, window) = match &args.images {
        Some(dir) => read_structured(dir)
            .with_context(|| format!("could not read images in {}", dir.display()))?,
        None => Default::default(),
    };
    for page in &pages {
        merge_dose(&mut structured, &page.dose);
    }
    let report = ocr.finish(&structured, window);
    if let Some(difference) = report.dlp_mismatch() {
        eprintln!(
            "warning: total DLP and the sum of acquisitions differ by {:.2}",
            difference
        );
    }
    write_report(&report, args.output.as_deref())
}

/// Load every readable page under `input`, in report order.
fn load_pages(input: &Path) -> Result<Vec<Page>> {
    let mut pages = vec![];
    for path in input_files(input)? {
        match read_page(&path) {
            Ok(page) => pages.push(page),
            Err(err) => warn!("skipping {}: {:#}", path.display(), err),
        }
    }
    if pages.is_empty() {
        bail!("no readable images in {}", input.display());
    }
    pages.sort_by(|a, b| {
        let key = |p: &Page| (p.instance_number.is_none(), p.instance_number);
        key(a).cmp(&key(b)).then_with(|| a.path.cmp(&b.path))
    });
    Ok(pages)
}

/// OCR each page. Pages which can't be read are reported and skipped.
fn read_pages<R: GlyphReader>(ocr: &mut DoseOcr, pages: &[Page], reader: &mut R) {
    for page in pages {
        if let Err(err) = ocr.add_page(&page.raster, &page.options, reader) {
            eprintln!("{}: {}", page.path.display(), err);
        }
    }
}

fn write_report(report: &DoseReport, output: Option<&Path>) -> Result<()> {
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("could not create {}", path.display()))?,
        )),
        None => Box::new(stdout().lock()),
    };
    serde_json::to_writer_pretty(&mut out, report).context("could not write report")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
