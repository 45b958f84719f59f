//! Error types for the spell-check pipeline and protected-term management.

use thiserror::Error;

/// Failures that abort a spell-check invocation.
///
/// Parse anomalies are not represented here: an unrecognizable response
/// degrades to zero corrections instead of failing.
#[derive(Debug, Error)]
pub enum SpellError {
    /// Nothing to check; rejected before any network call
    #[error("no text selected")]
    EmptySelection,

    /// The service answered with a non-2xx status
    #[error("spell-check service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with an error digest instead of data
    #[error("spell-check server error: {digest}")]
    Server { digest: String },

    /// A chunk failed; the whole invocation is abandoned
    #[error("chunk {index}/{total} failed: {source}")]
    Chunk {
        index: usize,
        total: usize,
        #[source]
        source: Box<SpellError>,
    },
}

impl SpellError {
    /// The innermost error, looking through chunk wrappers.
    pub fn root(&self) -> &SpellError {
        match self {
            SpellError::Chunk { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for SpellError {
    fn from(err: reqwest::Error) -> Self {
        SpellError::Network(err.to_string())
    }
}

/// Failures when editing or persisting the protected-term set.
#[derive(Debug, Error)]
pub enum TermError {
    #[error("protected term must not be empty")]
    Empty,

    #[error("\"{0}\" is already registered")]
    Duplicate(String),

    #[error("failed to access term store: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed term store: {0}")]
    Json(#[from] serde_json::Error),
}
