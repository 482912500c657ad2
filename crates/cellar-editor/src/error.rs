//! Crate error type.
//!
//! Only I/O at the file boundary and bad search patterns are errors.
//! Malformed UTF-8 decodes to U+FFFD, out-of-range positions are clamped,
//! and undo past the end of history is a `None`, not an error.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot save {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no file name")]
    NoPath,

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
