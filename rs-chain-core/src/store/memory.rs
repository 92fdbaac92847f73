use std::collections::BTreeMap;
use std::path::Path;

use super::{Backend, ReadTx, Visit, WriteTx};
use crate::error::StoreFailure;
use crate::{Error, Result};

/// A single in-memory bucket: ordered entries plus its sequence counter.
#[derive(Clone, Debug, Default)]
struct Bucket {
	entries: BTreeMap<Vec<u8>, Vec<u8>>,
	sequence: u64,
}

/// Whole content of a `MemoryBackend`.
///
/// Acts as its own transaction: reads go straight to the maps, and
/// `read_write` stages writes on a clone that replaces the committed
/// state only when the closure succeeds.
#[derive(Clone, Debug, Default)]
struct MemoryState {
	buckets: BTreeMap<String, Bucket>,
}

impl MemoryState {
	fn bucket(&self, name: &str) -> Result<&Bucket> {
		self.buckets.get(name).ok_or_else(|| missing_bucket(name))
	}

	fn bucket_mut(&mut self, name: &str) -> Result<&mut Bucket> {
		self.buckets.get_mut(name).ok_or_else(|| missing_bucket(name))
	}
}

fn missing_bucket(name: &str) -> Error {
	Error::store(
		format!("bucket {name} does not exist"),
		StoreFailure::Backend("unknown bucket".to_owned()),
	)
}

impl ReadTx for MemoryState {
	fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
		Ok(self.bucket(bucket)?.entries.get(key).cloned())
	}

	fn for_each_ordered(&self, bucket: &str, visit: &mut Visit<'_>) -> Result<()> {
		for (key, value) in &self.bucket(bucket)?.entries {
			visit(key.as_slice(), value.as_slice())?;
		}
		Ok(())
	}
}

impl WriteTx for MemoryState {
	fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
		self.bucket_mut(bucket)?.entries.insert(key.to_vec(), value.to_vec());
		Ok(())
	}

	fn next_sequence(&mut self, bucket: &str) -> Result<u64> {
		let bucket = self.bucket_mut(bucket)?;
		bucket.sequence += 1;
		Ok(bucket.sequence)
	}
}

/// In-memory backend backed by ordered maps.
///
/// Honors the same transaction contract as `SqliteBackend` (atomic
/// commit, ordered iteration, monotonic sequences) without touching the
/// disk. The path given to `open` is ignored and nothing survives `close`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
	state: MemoryState,
}

impl Backend for MemoryBackend {
	fn open(_path: &Path, buckets: &[&str]) -> Result<Self> {
		let mut state = MemoryState::default();
		for name in buckets {
			state.buckets.entry((*name).to_owned()).or_default();
		}
		Ok(Self { state })
	}

	fn close(self) -> Result<()> {
		Ok(())
	}

	fn read_write<T, F>(&mut self, f: F) -> Result<T>
	where
		F: FnOnce(&mut dyn WriteTx) -> Result<T>,
	{
		let mut staged = self.state.clone();
		let out = f(&mut staged)?;
		self.state = staged;
		Ok(out)
	}

	fn read_only<T, F>(&self, f: F) -> Result<T>
	where
		F: FnOnce(&dyn ReadTx) -> Result<T>,
	{
		f(&self.state)
	}
}
