use std::result::Result as StdResult;

use thiserror::Error;

/// Errors returned by the fallible parts of this crate.
///
/// Text layout and rendering never fail; they degrade and record a
/// [`Diagnostic`](crate::Diagnostic) instead. Only loading resources can
/// fail.
#[derive(Debug, Error)]
pub enum Error {
    /// The font data could not be parsed.
    #[error("font loading failed: {0}")]
    FontLoad(&'static str),
    /// Encoding or writing an image failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// A result alias that defaults to this crate's [`Error`].
pub type Result<T = (), E = Error> = StdResult<T, E>;
