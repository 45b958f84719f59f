//! Protected terms: user-registered nouns the checker must leave alone.
//!
//! Before text goes out, every protected term is swapped for a placeholder
//! token; corrections coming back are mapped through the same session to
//! restore the terms. Sessions are per invocation and own their counter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::TermError;
use crate::normalizer::Correction;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"⦃KEEP(\d+)⦄").expect("placeholder regex"));

fn placeholder(id: usize) -> String {
    format!("⦃KEEP{}⦄", id)
}

/// User-registered terms, in insertion order, without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedTermSet {
    #[serde(rename = "customNouns", default)]
    terms: Vec<String>,
}

impl ProtectedTermSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from stored entries, dropping blanks and repeats.
    pub fn from_terms<I, T>(terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut set = Self::new();
        for term in terms {
            // blanks and repeats in a stored file are not worth failing over
            let _ = set.add(term);
        }
        set
    }

    /// Register a term. Surrounding whitespace is trimmed.
    pub fn add(&mut self, term: impl Into<String>) -> Result<(), TermError> {
        let term = term.into();
        let term = term.trim();
        if term.is_empty() {
            return Err(TermError::Empty);
        }
        if self.contains(term) {
            return Err(TermError::Duplicate(term.to_string()));
        }
        self.terms.push(term.to_string());
        Ok(())
    }

    /// Remove a term; returns whether it was registered.
    pub fn remove(&mut self, term: &str) -> bool {
        let before = self.terms.len();
        self.terms.retain(|t| t != term);
        self.terms.len() != before
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    /// Terms in alphabetical order, for listings
    pub fn sorted(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.iter().collect();
        terms.sort_unstable();
        terms
    }
}

/// Placeholder-to-term mapping for one spell-check invocation
#[derive(Debug, Default)]
pub struct MaskingSession {
    placeholders: HashMap<String, String>,
    next_id: usize,
}

enum Piece<'a> {
    Plain(&'a str),
    Token(String),
}

impl MaskingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of placeholders issued
    pub fn len(&self) -> usize {
        self.placeholders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placeholders.is_empty()
    }

    /// Replace every occurrence of every protected term in `text` with a
    /// fresh placeholder.
    ///
    /// Longer terms go first so a term nested in a longer one is masked as
    /// part of the longer term. Text already replaced by a placeholder is
    /// never searched again.
    pub fn mask(&mut self, text: &str, terms: &ProtectedTermSet) -> String {
        let mut ordered: Vec<&str> = terms.iter().filter(|t| !t.trim().is_empty()).collect();
        ordered.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        let mut pieces = vec![Piece::Plain(text)];
        for term in ordered {
            let mut next = Vec::with_capacity(pieces.len());
            for piece in pieces {
                match piece {
                    Piece::Plain(plain) => {
                        let mut rest = plain;
                        while let Some(pos) = rest.find(term) {
                            if pos > 0 {
                                next.push(Piece::Plain(&rest[..pos]));
                            }
                            next.push(Piece::Token(self.issue(term)));
                            rest = &rest[pos + term.len()..];
                        }
                        if !rest.is_empty() {
                            next.push(Piece::Plain(rest));
                        }
                    }
                    token => next.push(token),
                }
            }
            pieces = next;
        }

        pieces
            .iter()
            .map(|piece| match piece {
                Piece::Plain(s) => *s,
                Piece::Token(s) => s.as_str(),
            })
            .collect()
    }

    fn issue(&mut self, term: &str) -> String {
        let token = placeholder(self.next_id);
        self.next_id += 1;
        self.placeholders.insert(token.clone(), term.to_string());
        token
    }

    /// Restore protected terms in `text`. Unknown placeholders stay as they are.
    pub fn unmask_text(&self, text: &str) -> String {
        if self.placeholders.is_empty() || !text.contains('⦃') {
            return text.to_string();
        }
        PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures<'_>| {
                let token = &caps[0];
                self.placeholders
                    .get(token)
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }

    /// Restore protected terms in every text field of a correction.
    pub fn unmask(&self, correction: Correction) -> Correction {
        Correction {
            original: self.unmask_text(&correction.original),
            candidates: correction
                .candidates
                .iter()
                .map(|c| self.unmask_text(c))
                .collect(),
            help: self.unmask_text(&correction.help),
        }
    }
}

/// Mask `text` in a fresh session.
pub fn mask(text: &str, terms: &ProtectedTermSet) -> (String, MaskingSession) {
    let mut session = MaskingSession::new();
    let masked = session.mask(text, terms);
    (masked, session)
}

/// JSON file holding the protected-term set as `{ "customNouns": [...] }`
#[derive(Debug, Clone)]
pub struct TermStore {
    path: PathBuf,
}

impl TermStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location in the user's data directory
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "hanspell").map(|dirs| dirs.data_dir().join("terms.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored set; a missing file is an empty set.
    pub fn load(&self) -> Result<ProtectedTermSet, TermError> {
        if !self.path.exists() {
            return Ok(ProtectedTermSet::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ProtectedTermSet::new());
        }
        let stored: ProtectedTermSet = serde_json::from_str(&content)?;
        Ok(ProtectedTermSet::from_terms(stored.terms))
    }

    /// Write the whole set, replacing whatever was stored.
    pub fn save(&self, terms: &ProtectedTermSet) -> Result<(), TermError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(terms)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!("Saved {} protected terms to {}", terms.len(), self.path.display());
        Ok(())
    }

    /// Register a term directly in the stored set.
    pub fn add(&self, term: &str) -> Result<(), TermError> {
        let mut terms = self.load()?;
        terms.add(term)?;
        self.save(&terms)
    }

    /// Remove a term from the stored set; returns whether it was registered.
    pub fn remove(&self, term: &str) -> Result<bool, TermError> {
        let mut terms = self.load()?;
        if !terms.remove(term.trim()) {
            return Ok(false);
        }
        self.save(&terms)?;
        Ok(true)
    }
}
