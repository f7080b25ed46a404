//! Asking the user about unknown glyphs on the terminal.

use std::io::{self, BufRead, Write};

use dose_ocr::{Error, Glyph, GlyphPrompt};

/// Draws each glyph on stderr and reads its text from stdin.
pub struct TerminalPrompt<R> {
    input: R,
}

impl TerminalPrompt<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        TerminalPrompt {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    #[cfg(test)]
    fn new(input: R) -> Self {
        TerminalPrompt { input }
    }
}

impl<R: BufRead> GlyphPrompt for TerminalPrompt<R> {
    fn ask(&mut self, glyph: &Glyph) -> dose_ocr::Result<Option<String>> {
        let mut stderr = io::stderr().lock();
        write!(
            stderr,
            "\n{}\nText for this glyph (blank to skip): ",
            glyph.to_ascii_art()
        )
        .and_then(|()| stderr.flush())
        .map_err(Error::prompt)?;

        let mut line = String::new();
        if self.input.read_line(&mut line).map_err(Error::prompt)? == 0 {
            return Err(Error::prompt("end of input while training"));
        }
        let text = line.trim();
        Ok(Some(text.to_owned()).filter(|t| !t.is_empty()))
    }
}
