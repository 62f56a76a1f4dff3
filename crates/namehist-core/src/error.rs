//! Error types for the core crate

/// Failure to parse a platform identifier from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{input}' is not a snowflake id")]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
}

impl ParseIdError {
    pub(crate) fn new(kind: &'static str, input: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.into(),
        }
    }

    /// Identifier type that failed to parse
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}
