//! hanspell - Korean spell-check correction pipeline
//!
//! Sends selected text to a Korean spell/grammar-checking web service,
//! normalizes its responses into corrections and applies the corrections
//! the user picks back into the text.

pub mod checker;
pub mod chunker;
pub mod client;
pub mod config;
pub mod entities;
pub mod error;
pub mod normalizer;
pub mod reconciler;
pub mod speller;
pub mod terms;
