//! Error handling.

use std::{error::Error as StdError, path::PathBuf, result::Result as StdResult};

/// Our result type.
pub type Result<T, E = Error> = StdResult<T, E>;

/// An error that can occur while recognizing a dose report.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// We were handed pixel data that doesn't describe a valid raster.
    #[error("Invalid raster: {reason}")]
    #[non_exhaustive]
    InvalidRaster {
        /// What was wrong with the raster.
        reason: String,
    },

    /// A single connected component grew past our size limit, which means
    /// the image was probably not thresholded into text.
    #[error("Connected component has {pixels} pixels, limit is {limit}")]
    #[non_exhaustive]
    ConnectivityOverflow {
        /// How many pixels we had collected when we gave up.
        pixels: usize,
        /// The configured limit.
        limit: usize,
    },

    /// We could not read or write a glyph dictionary.
    #[error("Could not access glyph dictionary {}", path.display())]
    #[non_exhaustive]
    DictionaryIo {
        /// The dictionary file.
        path: PathBuf,
        /// The original error.
        #[source]
        source: std::io::Error,
    },

    /// A glyph dictionary was not valid JSON.
    #[error("Could not parse glyph dictionary")]
    #[non_exhaustive]
    DictionaryFormat {
        /// The original error.
        #[source]
        source: serde_json::Error,
    },

    /// A glyph dictionary contained an unusable record.
    #[error("Invalid glyph record #{index}: {reason}")]
    #[non_exhaustive]
    InvalidGlyphRecord {
        /// The position of the record in the file.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The training prompt failed.
    #[error("Could not read glyph text from prompt")]
    #[non_exhaustive]
    Prompt {
        /// The original error.
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    /// We could not convert a pixmap to an image.
    #[error("Could not build image")]
    #[non_exhaustive]
    Image {
        /// The original error.
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl Error {
    pub(crate) fn invalid_raster<S: Into<String>>(reason: S) -> Self {
        Self::InvalidRaster {
            reason: reason.into(),
        }
    }

    pub(crate) fn dictionary_io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::DictionaryIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_glyph_record<S: Into<String>>(index: usize, reason: S) -> Self {
        Self::InvalidGlyphRecord {
            index,
            reason: reason.into(),
        }
    }

    /// The glyph prompt failed. Public so that prompt implementations
    /// outside this crate can report their own I/O errors.
    pub fn prompt<E>(source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self::Prompt {
            source: source.into(),
        }
    }

    pub(crate) fn image<E>(source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self::Image {
            source: source.into(),
        }
    }
}
