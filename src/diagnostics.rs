//! Records of degraded-but-recovered paths.
//!
//! Layout, parsing and rendering never fail. When they skip or repair
//! something, they push a [`Diagnostic`] instead so callers and tests can see
//! what happened.

use thiserror::Error;

use crate::text::SpanError;

/// Something that was skipped, clamped or substituted while processing text.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Diagnostic {
    /// A span failed validation and was skipped.
    #[error("span {span} skipped: {error}")]
    InvalidSpan {
        /// The index of the span in its block.
        span: usize,
        /// Why the span is invalid.
        error: SpanError,
    },
    /// A markup tag that has no meaning was ignored.
    #[error("unknown tag <{0}>")]
    UnknownTag(String),
    /// A style property that could not be applied was ignored.
    #[error("unknown style property `{name}: {value}`")]
    UnknownProperty {
        /// The property name.
        name: String,
        /// The property value.
        value: String,
    },
    /// A closing tag did not match the innermost open tag.
    #[error("closing tag </{found}> does not match <{expected}>")]
    UnmatchedClose {
        /// The tag that was closed.
        found: String,
        /// The tag that was open, or an empty string if none was.
        expected: String,
    },
    /// No available face can draw a character.
    #[error("no font has a glyph for {0:?}")]
    MissingGlyph(char),
    /// A link boundary pointed past the end of its span and was clamped.
    #[error("link {0} clamped to its span")]
    ClampedLink(usize),
    /// No face could be opened for a family.
    #[error("no font available for family `{0}`")]
    UnresolvedFont(String),
}

impl Diagnostic {
    /// Logs this diagnostic and appends it to `diagnostics`.
    pub fn record(self, diagnostics: &mut Vec<Diagnostic>) {
        tracing::debug!("{self}");
        diagnostics.push(self);
    }
}
