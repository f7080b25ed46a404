//! Turning glyphs into text.
//!
//! A [`Recognizer`] only ever reads from a dictionary snapshot, so several
//! of them can share one dictionary across threads. A
//! [`TrainingRecognizer`] wraps a `Recognizer`, asks a [`GlyphPrompt`] about
//! glyphs it doesn't know, and keeps the answers as a delta which the caller
//! merges into the dictionary and saves.

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::dictionary::GlyphDictionary;
use crate::errors::Result;
use crate::glyph::Glyph;

/// Something which can map a glyph to text.
pub trait GlyphReader {
    /// Return the text for `glyph` if we already know it, without asking
    /// anybody.
    fn known(&self, glyph: &Glyph) -> Option<String>;

    /// Return the text for `glyph`, or `None` if it isn't recognized. This
    /// may do more work than `known`, such as prompting a user.
    fn read_glyph(&mut self, glyph: &Glyph) -> Result<Option<String>> {
        Ok(self.known(glyph))
    }
}

/// Asks somebody what a glyph says.
pub trait GlyphPrompt {
    /// Return the text for `glyph`. `None` or an empty string means the
    /// glyph should be left unrecognized.
    fn ask(&mut self, glyph: &Glyph) -> Result<Option<String>>;
}

/// Read-only recognition against a dictionary snapshot.
#[derive(Clone, Debug)]
pub struct Recognizer {
    dictionary: Arc<GlyphDictionary>,
}

impl Recognizer {
    /// Recognize glyphs using `dictionary`.
    pub fn new(dictionary: Arc<GlyphDictionary>) -> Recognizer {
        Recognizer { dictionary }
    }

    /// The dictionary we're reading from.
    pub fn dictionary(&self) -> &Arc<GlyphDictionary> {
        &self.dictionary
    }

    /// Look up `glyph` without needing `&mut self`.
    pub fn lookup(&self, glyph: &Glyph) -> Option<&str> {
        self.dictionary.lookup(glyph)
    }
}

impl GlyphReader for Recognizer {
    fn known(&self, glyph: &Glyph) -> Option<String> {
        self.lookup(glyph).map(str::to_owned)
    }
}

/// Recognition that learns unknown glyphs by asking a [`GlyphPrompt`].
pub struct TrainingRecognizer<P: GlyphPrompt> {
    recognizer: Recognizer,
    prompt: P,
    /// Every answer we've been given this run. `None` means "skip".
    answers: HashMap<Glyph, Option<String>>,
    /// Newly learned glyphs, in the order they were learned.
    learned: Vec<(Glyph, String)>,
}

impl<P: GlyphPrompt> TrainingRecognizer<P> {
    /// Wrap `recognizer`, asking `prompt` about unknown glyphs.
    pub fn new(recognizer: Recognizer, prompt: P) -> TrainingRecognizer<P> {
        TrainingRecognizer {
            recognizer,
            prompt,
            answers: HashMap::new(),
            learned: vec![],
        }
    }

    /// Glyphs learned so far.
    pub fn learned(&self) -> &[(Glyph, String)] {
        &self.learned
    }

    /// Give up the prompt and return everything learned, ready to be merged
    /// into a dictionary.
    pub fn into_learned(self) -> Vec<(Glyph, String)> {
        self.learned
    }
}

impl<P: GlyphPrompt> GlyphReader for TrainingRecognizer<P> {
    fn known(&self, glyph: &Glyph) -> Option<String> {
        self.recognizer
            .known(glyph)
            .or_else(|| self.answers.get(glyph).cloned().flatten())
    }

    fn read_glyph(&mut self, glyph: &Glyph) -> Result<Option<String>> {
        if let Some(text) = self.recognizer.lookup(glyph) {
            return Ok(Some(text.to_owned()));
        }
        if let Some(answer) = self.answers.get(glyph) {
            return Ok(answer.clone());
        }

        let answer = self.prompt.ask(glyph)?.filter(|text| !text.is_empty());
        match &answer {
            Some(text) => {
                debug!("learned glyph {:?}", text);
                self.learned.push((glyph.clone(), text.clone()));
            }
            None => warn!("skipping unknown {}x{} glyph", glyph.width(), glyph.height()),
        }
        self.answers.insert(glyph.clone(), answer.clone());
        Ok(answer)
    }
}
