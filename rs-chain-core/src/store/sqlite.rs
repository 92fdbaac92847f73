use std::path::Path;
use std::time::Duration;

use log::info;
use rusqlite::{Connection, OptionalExtension, params};

use super::{Backend, ReadTx, Visit, WriteTx};
use crate::error::StoreFailure;
use crate::{Error, Result};

const BUSY_TIMEOUT_MS: u64 = 5_000;

/// On-disk backend storing each bucket in its own SQLite table.
///
/// # Layout
/// - `bucket_<name>(key BLOB PRIMARY KEY, value BLOB)` per bucket
/// - `bucket_sequences(bucket TEXT PRIMARY KEY, value INTEGER)` for counters
///
/// SQLite compares BLOB keys with `memcmp`, so `ORDER BY key` yields the
/// byte-wise order the model relies on.
#[derive(Debug)]
pub struct SqliteBackend {
	conn: Connection,
}

/// Returns the table name of a bucket, rejecting names unsafe in SQL.
fn table_name(bucket: &str) -> Result<String> {
	let valid = !bucket.is_empty()
		&& bucket.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
	if !valid {
		return Err(Error::store(
			format!("invalid bucket name {bucket:?}"),
			StoreFailure::Backend("bucket names are limited to [a-z0-9_]".to_owned()),
		));
	}
	Ok(format!("bucket_{bucket}"))
}

fn sql_error(context: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Error {
	let context = context.into();
	move |e| Error::store(context, e)
}

/// Transaction view over a connection.
///
/// The connection is borrowed from a `rusqlite::Transaction`, so every
/// statement issued through it is part of that transaction.
struct SqliteTx<'c> {
	conn: &'c Connection,
}

impl ReadTx for SqliteTx<'_> {
	fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
		let table = table_name(bucket)?;
		let mut stmt = self
			.conn
			.prepare_cached(&format!("SELECT value FROM {table} WHERE key = ?1"))
			.map_err(sql_error(format!("could not read bucket {bucket}")))?;
		stmt.query_row(params![key], |row| row.get::<_, Vec<u8>>(0))
			.optional()
			.map_err(sql_error(format!("could not read bucket {bucket}")))
	}

	fn for_each_ordered(&self, bucket: &str, visit: &mut Visit<'_>) -> Result<()> {
		let table = table_name(bucket)?;
		let context = format!("could not iterate bucket {bucket}");
		let mut stmt = self
			.conn
			.prepare_cached(&format!("SELECT key, value FROM {table} ORDER BY key ASC"))
			.map_err(sql_error(context.clone()))?;
		let mut rows = stmt.query([]).map_err(sql_error(context.clone()))?;
		while let Some(row) = rows.next().map_err(sql_error(context.clone()))? {
			let key: Vec<u8> = row.get(0).map_err(sql_error(context.clone()))?;
			let value: Vec<u8> = row.get(1).map_err(sql_error(context.clone()))?;
			visit(key.as_slice(), value.as_slice())?;
		}
		Ok(())
	}
}

impl WriteTx for SqliteTx<'_> {
	fn put(&mut self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
		let table = table_name(bucket)?;
		let mut stmt = self
			.conn
			.prepare_cached(&format!("INSERT OR REPLACE INTO {table} (key, value) VALUES (?1, ?2)"))
			.map_err(sql_error(format!("could not write bucket {bucket}")))?;
		stmt.execute(params![key, value])
			.map_err(sql_error(format!("could not write bucket {bucket}")))?;
		Ok(())
	}

	fn next_sequence(&mut self, bucket: &str) -> Result<u64> {
		let context = format!("could not get next sequence of bucket {bucket}");
		self.conn
			.execute(
				"INSERT INTO bucket_sequences (bucket, value) VALUES (?1, 1)
				 ON CONFLICT(bucket) DO UPDATE SET value = value + 1",
				params![bucket],
			)
			.map_err(sql_error(context.clone()))?;
		let value: i64 = self
			.conn
			.query_row(
				"SELECT value FROM bucket_sequences WHERE bucket = ?1",
				params![bucket],
				|row| row.get(0),
			)
			.map_err(sql_error(context.clone()))?;
		u64::try_from(value).map_err(|_| {
			Error::store(context, StoreFailure::Backend(format!("negative sequence {value}")))
		})
	}
}

impl Backend for SqliteBackend {
	fn open(path: &Path, buckets: &[&str]) -> Result<Self> {
		let conn = Connection::open(path).map_err(sql_error("could not open database"))?;
		conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
			.map_err(sql_error("could not configure database"))?;

		let mut ddl = String::from(
			"CREATE TABLE IF NOT EXISTS bucket_sequences (bucket TEXT PRIMARY KEY, value INTEGER NOT NULL);",
		);
		for bucket in buckets {
			let table = table_name(bucket)?;
			ddl.push_str(&format!(
				"CREATE TABLE IF NOT EXISTS {table} (key BLOB PRIMARY KEY, value BLOB NOT NULL) WITHOUT ROWID;"
			));
		}
		conn.execute_batch(&ddl)
			.map_err(sql_error("failed to create the buckets"))?;

		info!("opened database {}", path.display());
		Ok(Self { conn })
	}

	fn close(self) -> Result<()> {
		self.conn
			.close()
			.map_err(|(_, e)| Error::store("failed to close the database", e))
	}

	fn read_write<T, F>(&mut self, f: F) -> Result<T>
	where
		F: FnOnce(&mut dyn WriteTx) -> Result<T>,
	{
		let tx = self
			.conn
			.transaction()
			.map_err(sql_error("could not begin transaction"))?;
		// Dropping `tx` on the error path rolls it back.
		let out = f(&mut SqliteTx { conn: &tx })?;
		tx.commit().map_err(sql_error("could not commit transaction"))?;
		Ok(out)
	}

	fn read_only<T, F>(&self, f: F) -> Result<T>
	where
		F: FnOnce(&dyn ReadTx) -> Result<T>,
	{
		let tx = self
			.conn
			.unchecked_transaction()
			.map_err(sql_error("could not begin transaction"))?;
		let out = f(&SqliteTx { conn: &tx })?;
		tx.rollback().map_err(sql_error("could not end transaction"))?;
		Ok(out)
	}
}
