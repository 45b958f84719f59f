use std::sync::Arc;

use tokio::sync::RwLock;

use crate::checker::SpellChecker;
use crate::client::SpellService;
use crate::error::{SpellError, TermError};
use crate::normalizer::CorrectionBatch;
use crate::reconciler::{apply, UserSelection};
use crate::terms::{ProtectedTermSet, TermStore};

/// Result of checking one selection, handed to the presentation layer
#[derive(Debug, Clone)]
pub struct Review {
    /// Selected text exactly as it was checked
    pub original: String,
    /// Corrections in text order
    pub corrections: CorrectionBatch,
}

impl Review {
    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    /// Final text for the given per-correction selections
    pub fn apply(&self, selections: &[UserSelection]) -> String {
        apply(&self.original, &self.corrections, selections)
    }
}

/// Entry point for editor integrations
///
/// Owns the protected-term set shared between checks and term edits.
/// A check holds the read lock until it finishes, so edits wait for
/// in-flight checks.
pub struct Speller<S> {
    checker: SpellChecker<S>,
    terms: Arc<RwLock<ProtectedTermSet>>,
    store: Option<TermStore>,
}

impl<S: SpellService> Speller<S> {
    /// Create a speller with in-memory terms only
    pub fn new(checker: SpellChecker<S>, terms: ProtectedTermSet) -> Self {
        Self {
            checker,
            terms: Arc::new(RwLock::new(terms)),
            store: None,
        }
    }

    /// Create a speller whose terms are loaded from, and saved to, `store`
    pub fn with_store(checker: SpellChecker<S>, store: TermStore) -> Result<Self, TermError> {
        let terms = store.load()?;
        tracing::info!("Loaded {} protected terms from {}", terms.len(), store.path().display());

        Ok(Self {
            checker,
            terms: Arc::new(RwLock::new(terms)),
            store: Some(store),
        })
    }

    /// Check a selection
    pub async fn check(&self, selection: &str) -> Result<Review, SpellError> {
        let terms = self.terms.read().await;
        let corrections = self.checker.check(selection, &terms).await?;

        Ok(Review {
            original: selection.to_string(),
            corrections,
        })
    }

    /// Register a protected term and persist the set
    pub async fn add_term(&self, term: &str) -> Result<(), TermError> {
        let mut terms = self.terms.write().await;
        terms.add(term)?;
        self.persist(&terms)
    }

    /// Remove a protected term; returns whether it was registered
    pub async fn remove_term(&self, term: &str) -> Result<bool, TermError> {
        let mut terms = self.terms.write().await;
        if !terms.remove(term.trim()) {
            return Ok(false);
        }
        self.persist(&terms)?;
        Ok(true)
    }

    /// Registered terms in alphabetical order
    pub async fn terms(&self) -> Vec<String> {
        let terms = self.terms.read().await;
        terms.sorted().into_iter().map(str::to_string).collect()
    }

    fn persist(&self, terms: &ProtectedTermSet) -> Result<(), TermError> {
        match &self.store {
            Some(store) => store.save(terms),
            None => Ok(()),
        }
    }
}
