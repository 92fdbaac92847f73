//! Top-level module for the word-chain model.
//!
//! This module provides:
//! - Transition records of single words (`WordLink`)
//! - The per-text transition delta (`TransitionTable`)
//! - Generation parameters (`GeneratorSettings`)
//! - The store-backed generator (`ChainGenerator`) behind the `Generator` trait

/// Store-backed generator: registration, weighted walk and dump.
///
/// Exposes the `Generator` contract and its `ChainGenerator` implementation.
pub mod generator;

/// Transition record of one (word, class) identity.
///
/// Tracks outgoing transitions and supports weighted random sampling.
pub mod word_link;

/// In-memory transition counts of a single registered text.
pub mod transition_table;

/// Terminal words, default class and step bound of a generator.
pub mod settings;
