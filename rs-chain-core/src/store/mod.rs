//! Transactional key-value storage used to persist the model.
//!
//! A backend exposes named partitions ("buckets") and two transaction
//! scopes:
//! - `read_write`: all-or-nothing, the closure's `Err` rolls everything back
//! - `read_only`: a consistent snapshot for the duration of the closure
//!
//! Two backends are provided: `SqliteBackend` for on-disk databases and
//! `MemoryBackend`, an in-memory mapping used as a test double.

use std::path::Path;

use crate::Result;

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Bucket holding the raw registered texts, keyed by sequence number.
pub const BUCKET_TEXTS: &str = "texts";

/// Bucket holding one transition record per word identity key.
pub const BUCKET_WORDS: &str = "words";

/// Callback used by ordered iteration. Returning an error stops the scan.
pub type Visit<'a> = dyn FnMut(&[u8], &[u8]) -> Result<()> + 'a;

/// Read operations available in every transaction.
pub trait ReadTx {
	/// Returns the value stored under `key`, or `None` if absent.
	fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

	/// Visits every entry of `bucket` in ascending byte order of keys.
	fn for_each_ordered(&self, bucket: &str, visit: &mut Visit<'_>) -> Result<()>;
}

/// Write operations, only available inside `read_write`.
pub trait WriteTx: ReadTx {
	/// Inserts or replaces the value under `key`.
	fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()>;

	/// Returns the next value of the bucket's sequence counter.
	///
	/// Values start at 1, are strictly increasing and are never reused,
	/// even across restarts. A rolled back transaction does not consume
	/// its sequence numbers.
	fn next_sequence(&mut self, bucket: &str) -> Result<u64>;
}

/// A storage backend able to run transactions.
pub trait Backend: Sized {
	/// Opens (or creates) the store at `path`, creating missing buckets.
	fn open(path: &Path, buckets: &[&str]) -> Result<Self>;

	/// Releases the store.
	fn close(self) -> Result<()>;

	/// Runs `f` inside a read-write transaction.
	///
	/// Commits when `f` returns `Ok`, rolls back otherwise.
	fn read_write<T, F>(&mut self, f: F) -> Result<T>
	where
		F: FnOnce(&mut dyn WriteTx) -> Result<T>;

	/// Runs `f` inside a read-only transaction.
	fn read_only<T, F>(&self, f: F) -> Result<T>
	where
		F: FnOnce(&dyn ReadTx) -> Result<T>;
}

/// Returns an 8-byte big endian representation of `v`.
///
/// Big endian keeps byte-wise key order identical to numeric order.
pub fn itob(v: u64) -> [u8; 8] {
	v.to_be_bytes()
}

/// Inverse of [`itob`]. Returns `None` if `bytes` is not 8 bytes long.
pub fn btoi(bytes: &[u8]) -> Option<u64> {
	let array: [u8; 8] = bytes.try_into().ok()?;
	Some(u64::from_be_bytes(array))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sequence_keys_sort_numerically() {
		let mut keys: Vec<[u8; 8]> = [300u64, 2, 1 << 40, 17].iter().map(|v| itob(*v)).collect();
		keys.sort();
		let decoded: Vec<u64> = keys.iter().filter_map(|k| btoi(k)).collect();
		assert_eq!(decoded, vec![2, 17, 300, 1 << 40]);
	}

	#[test]
	fn btoi_rejects_wrong_width() {
		assert_eq!(btoi(&[0, 1, 2]), None);
		assert_eq!(btoi(&itob(42)), Some(42));
	}
}
