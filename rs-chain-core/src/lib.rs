//! Word-chain text generation library.
//!
//! This crate provides a Markov chain over (word, grammatical class) pairs:
//! - Registration of texts into a persisted transition table
//! - Weighted random walks producing new texts from a trigger word
//! - Ordered dumps of the stored chain
//! - Pluggable tokenizers and storage backends
//!
//! A typical session opens a `SqliteGenerator`, registers texts, then
//! generates from a trigger with an explicit random generator.

/// Transition records, per-text tables and the generator.
pub mod model;

/// Transactional key-value storage (SQLite and in-memory).
pub mod store;

/// Tokenizer boundary and the lexicon tokenizer.
pub mod tokenizer;

/// File-based configuration.
pub mod config;

/// I/O utilities (input reading, default paths).
pub mod io;

mod error;

pub use error::{DecodeCause, Error, Result, StoreFailure};
