use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed cause attached to decode failures (JSON, key layout, UTF-8).
pub type DecodeCause = Box<dyn std::error::Error + Send + Sync>;

/// Failure raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreFailure {
	#[error("sqlite: {0}")]
	Sqlite(#[from] rusqlite::Error),
	#[error("io: {0}")]
	Io(#[from] io::Error),
	#[error("{0}")]
	Backend(String),
}

/// Errors surfaced by the generator and its collaborators.
///
/// Every error returned from inside a read-write transaction causes the
/// transaction to roll back.
#[derive(Debug, Error)]
pub enum Error {
	/// An operation was attempted before `open` or after `close`.
	#[error("database is not opened")]
	StoreNotOpen,

	/// The underlying store failed (open, read, write, commit, close).
	#[error("{context}")]
	Store {
		context: String,
		#[source]
		source: StoreFailure,
	},

	/// Stored bytes under `key` could not be parsed.
	#[error("[{key}] could not decode the stored record")]
	RecordDecode {
		key: String,
		#[source]
		source: DecodeCause,
	},

	/// A record could not be serialized.
	#[error("[{word}] could not encode the record")]
	RecordEncode {
		word: String,
		#[source]
		source: serde_json::Error,
	},

	/// A stored record does not describe the key it was stored under.
	#[error("key mismatch: expected [{expected}], found [{found}]")]
	KeyMismatch { expected: String, found: String },

	/// Writing the merged record of `word` failed.
	#[error("failed to store the record for [{word}]")]
	WordWrite {
		word: String,
		#[source]
		source: Box<Error>,
	},

	/// Source text could not be read.
	#[error("could not read input from {origin}")]
	InputIo {
		origin: String,
		#[source]
		source: io::Error,
	},

	/// Dump output could not be written.
	#[error("could not write to the output sink")]
	Sink(#[source] io::Error),

	/// Configuration file could not be read or parsed.
	#[error("invalid configuration {path:?}: {message}")]
	Config { path: PathBuf, message: String },

	/// A user lexicon line is malformed.
	#[error("invalid lexicon entry at line {line}: {message}")]
	Lexicon { line: usize, message: String },

	/// A generator setting was rejected.
	#[error("invalid setting: {0}")]
	InvalidSetting(String),
}

impl Error {
	/// Wraps a backend failure with a human readable context.
	pub(crate) fn store(context: impl Into<String>, source: impl Into<StoreFailure>) -> Self {
		Error::Store {
			context: context.into(),
			source: source.into(),
		}
	}

	/// Builds a decode error for the given raw key.
	pub(crate) fn decode(key: &[u8], source: impl Into<DecodeCause>) -> Self {
		Error::RecordDecode {
			key: String::from_utf8_lossy(key).into_owned(),
			source: source.into(),
		}
	}
}
