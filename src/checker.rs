use crate::chunker::{chunk, preview, DEFAULT_MAX_WORDS};
use crate::client::{SpellRequest, SpellService};
use crate::error::SpellError;
use crate::normalizer::{normalize, CorrectionBatch};
use crate::terms::{MaskingSession, ProtectedTermSet};

/// Characters of a failed response body kept in the error
const ERROR_BODY_CHARS: usize = 200;

/// Spell-check pipeline for one service
///
/// Masks protected terms, splits the text into chunks, checks the chunks
/// one after another and restores the protected terms in the result.
pub struct SpellChecker<S> {
    service: S,
    max_words: usize,
}

impl<S: SpellService> SpellChecker<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            max_words: DEFAULT_MAX_WORDS,
        }
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words.max(1);
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Check `text` and return the corrections in text order.
    ///
    /// Any chunk failing aborts the whole check; corrections from earlier
    /// chunks are dropped.
    pub async fn check(
        &self,
        text: &str,
        terms: &ProtectedTermSet,
    ) -> Result<CorrectionBatch, SpellError> {
        if text.trim().is_empty() {
            return Err(SpellError::EmptySelection);
        }

        let mut session = MaskingSession::new();
        let masked = session.mask(text, terms);
        let chunks = chunk(&masked, self.max_words);
        let total = chunks.len();

        tracing::debug!(
            "Checking {} chunk(s), {} protected occurrence(s): {}",
            total,
            session.len(),
            preview(text)
        );

        let mut corrections = CorrectionBatch::new();
        for (i, chunk_text) in chunks.iter().enumerate() {
            let found = self
                .check_chunk(chunk_text)
                .await
                .map_err(|source| SpellError::Chunk {
                    index: i + 1,
                    total,
                    source: Box::new(source),
                })?;
            corrections.extend(found);
        }

        let corrections: CorrectionBatch = corrections
            .into_iter()
            .map(|c| session.unmask(c))
            .collect();

        tracing::debug!("Found {} correction(s)", corrections.len());
        Ok(corrections)
    }

    async fn check_chunk(&self, chunk_text: &str) -> Result<CorrectionBatch, SpellError> {
        let request = SpellRequest::from_chunk(chunk_text);
        let response = self.service.submit(&request).await?;

        if !response.is_success() {
            tracing::warn!("Service returned HTTP {} for chunk: {}", response.status, preview(chunk_text));
            return Err(SpellError::Http {
                status: response.status,
                body: response.body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        normalize(&response.body, self.service.format())
    }
}
