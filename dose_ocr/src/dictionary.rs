//! The glyph dictionary: exact-match lookup from glyph bitmaps to text.
//!
//! On disk, a dictionary is a JSON array of records:
//!
//! ```json
//! [{ "width": 3, "bits": [1, 3, 4, 5, 7], "text": "+" }]
//! ```
//!
//! `bits` lists the row-major indices of the set pixels of a tightly trimmed
//! bitmap `width` pixels wide. The height is implied by the last index.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::{Entry, HashMap};
use std::fs;
use std::path::Path;

use crate::errors::{Error, Result};
use crate::glyph::Glyph;

/// One entry in a dictionary file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphRecord {
    /// Width of the glyph bitmap in pixels.
    pub width: usize,
    /// Row-major indices of the set pixels, strictly increasing.
    pub bits: Vec<usize>,
    /// The text this glyph represents.
    pub text: String,
}

impl GlyphRecord {
    /// Describe `glyph` as a record.
    pub fn new(glyph: &Glyph, text: &str) -> GlyphRecord {
        GlyphRecord {
            width: glyph.width(),
            bits: glyph.set_bits().collect(),
            text: text.to_owned(),
        }
    }
}

/// A mapping from glyphs to the text they represent. Each glyph maps to at
/// most one string.
#[derive(Clone, Debug, Default)]
pub struct GlyphDictionary {
    glyphs: HashMap<Glyph, String>,
}

impl GlyphDictionary {
    /// Create an empty dictionary.
    pub fn new() -> GlyphDictionary {
        GlyphDictionary::default()
    }

    /// Load a dictionary file. A missing file is treated as an empty
    /// dictionary.
    pub fn load(path: &Path) -> Result<GlyphDictionary> {
        if !path.exists() {
            debug!("no glyph dictionary at {}, starting empty", path.display());
            return Ok(GlyphDictionary::new());
        }
        let json = fs::read_to_string(path).map_err(|e| Error::dictionary_io(path, e))?;
        let dictionary = GlyphDictionary::from_json(&json)?;
        debug!(
            "loaded {} glyphs from {}",
            dictionary.len(),
            path.display()
        );
        Ok(dictionary)
    }

    /// Parse a dictionary from JSON.
    pub fn from_json(json: &str) -> Result<GlyphDictionary> {
        let records: Vec<GlyphRecord> =
            serde_json::from_str(json).map_err(|source| Error::DictionaryFormat { source })?;
        GlyphDictionary::from_records(records)
    }

    /// Build a dictionary from records. Glyphs loaded this way are marked
    /// as seeded.
    pub fn from_records<I>(records: I) -> Result<GlyphDictionary>
    where
        I: IntoIterator<Item = GlyphRecord>,
    {
        let mut dictionary = GlyphDictionary::new();
        for (index, record) in records.into_iter().enumerate() {
            if record.text.is_empty() {
                return Err(Error::invalid_glyph_record(index, "text is empty"));
            }
            let glyph = Glyph::from_set_bits(record.width, &record.bits)
                .map_err(|reason| Error::invalid_glyph_record(index, reason))?
                .seeded();
            dictionary.insert(glyph, record.text);
        }
        Ok(dictionary)
    }

    /// Describe every entry as a record, in a stable order.
    pub fn to_records(&self) -> Vec<GlyphRecord> {
        let mut records = self
            .glyphs
            .iter()
            .map(|(glyph, text)| GlyphRecord::new(glyph, text))
            .collect::<Vec<_>>();
        records.sort_by(|a, b| {
            (&a.text, a.width, &a.bits).cmp(&(&b.text, b.width, &b.bits))
        });
        records
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_records())
            .map_err(|source| Error::DictionaryFormat { source })
    }

    /// Write this dictionary to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| Error::dictionary_io(path, e))?;
        debug!("saved {} glyphs to {}", self.len(), path.display());
        Ok(())
    }

    /// Look up the text for `glyph`.
    pub fn lookup(&self, glyph: &Glyph) -> Option<&str> {
        self.glyphs.get(glyph).map(|s| s.as_str())
    }

    /// Add a glyph. The first text assigned to a glyph wins; returns `false`
    /// if the glyph was already present.
    pub fn insert(&mut self, glyph: Glyph, text: String) -> bool {
        match self.glyphs.entry(glyph) {
            Entry::Occupied(existing) => {
                if existing.get() != &text {
                    warn!(
                        "ignoring {:?} for a glyph already recorded as {:?}",
                        text,
                        existing.get()
                    );
                }
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(text);
                true
            }
        }
    }

    /// Add newly learned glyphs. Returns how many were new.
    pub fn merge<I>(&mut self, delta: I) -> usize
    where
        I: IntoIterator<Item = (Glyph, String)>,
    {
        delta
            .into_iter()
            .map(|(glyph, text)| self.insert(glyph, text))
            .filter(|&added| added)
            .count()
    }

    /// Number of glyphs.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Is this dictionary empty?
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&Glyph, &str)> {
        self.glyphs.iter().map(|(g, t)| (g, t.as_str()))
    }
}

#[cfg(test)]
mod test {
    use quickcheck::{quickcheck, TestResult};
    use std::env;

    use super::*;

    fn glyph(pixels: &[(usize, usize)]) -> Glyph {
        Glyph::from_pixels(pixels).unwrap()
    }

    #[test]
    fn lookup_is_exact() {
        let mut dict = GlyphDictionary::new();
        assert!(dict.insert(glyph(&[(0, 0), (1, 1)]), "\\".to_owned()));
        assert_eq!(dict.lookup(&glyph(&[(3, 3), (4, 4)])), Some("\\"));
        assert_eq!(dict.lookup(&glyph(&[(0, 1), (1, 0)])), None);
    }

    #[test]
    fn first_text_wins() {
        let mut dict = GlyphDictionary::new();
        assert!(dict.insert(glyph(&[(0, 0)]), ".".to_owned()));
        assert!(!dict.insert(glyph(&[(0, 0)]), ",".to_owned()));
        assert_eq!(dict.lookup(&glyph(&[(0, 0)])), Some("."));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn loaded_glyphs_are_seeded() {
        let dict = GlyphDictionary::from_json(r#"[{"width": 1, "bits": [0, 1], "text": "|"}]"#)
            .unwrap();
        let (g, text) = dict.iter().next().unwrap();
        assert!(g.is_seeded());
        assert_eq!(text, "|");
        assert_eq!(dict.lookup(&glyph(&[(0, 0), (0, 1)])), Some("|"));
    }

    #[test]
    fn invalid_records_are_rejected() {
        let bad_bits = r#"[{"width": 2, "bits": [], "text": "x"}]"#;
        assert!(matches!(
            GlyphDictionary::from_json(bad_bits),
            Err(Error::InvalidGlyphRecord { index: 0, .. })
        ));
        let no_text = r#"[{"width": 1, "bits": [0], "text": ""}]"#;
        assert!(GlyphDictionary::from_json(no_text).is_err());
        assert!(matches!(
            GlyphDictionary::from_json("{"),
            Err(Error::DictionaryFormat { .. })
        ));
    }

    #[test]
    fn missing_files_load_as_empty() {
        let path = env::temp_dir().join("dose_ocr-no-such-dictionary.json");
        assert!(GlyphDictionary::load(&path).unwrap().is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut dict = GlyphDictionary::new();
        dict.insert(glyph(&[(0, 0), (0, 1), (0, 2)]), "l".to_owned());
        dict.insert(glyph(&[(0, 0), (1, 0), (2, 0)]), "-".to_owned());
        let path = env::temp_dir().join(format!(
            "dose_ocr-dictionary-{}.json",
            std::process::id()
        ));
        dict.save(&path).unwrap();
        let loaded = GlyphDictionary::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.to_records(), dict.to_records());
        assert_eq!(loaded.lookup(&glyph(&[(5, 0), (6, 0), (7, 0)])), Some("-"));
    }

    #[test]
    fn merge_counts_new_glyphs() {
        let mut dict = GlyphDictionary::new();
        dict.insert(glyph(&[(0, 0)]), ".".to_owned());
        let added = dict.merge(vec![
            (glyph(&[(0, 0)]), ".".to_owned()),
            (glyph(&[(0, 0), (0, 1)]), ":".to_owned()),
        ]);
        assert_eq!(added, 1);
        assert_eq!(dict.len(), 2);
    }

    quickcheck! {
        fn json_round_trip_preserves_lookups(entries: Vec<(Glyph, String)>) -> TestResult {
            if entries.iter().any(|(_, t)| t.is_empty()) {
                return TestResult::discard();
            }
            let mut dict = GlyphDictionary::new();
            for (g, t) in &entries {
                dict.insert(g.clone(), t.clone());
            }
            let reloaded = GlyphDictionary::from_json(&dict.to_json().unwrap()).unwrap();
            TestResult::from_bool(
                entries.iter().all(|(g, _)| reloaded.lookup(g) == dict.lookup(g))
                    && reloaded.len() == dict.len(),
            )
        }
    }
}
