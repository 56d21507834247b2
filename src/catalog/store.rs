use crate::error::{BarescriptError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A partial record of store contents, keyed by top-level key.
pub type Items = Map<String, Value>;

/// Notification that one or more top-level keys changed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageChange {
	/// Keys whose stored value differs from before the write.
	pub keys: Vec<String>,
}

impl StorageChange {
	pub fn touches(&self, key: &str) -> bool {
		self.keys.iter().any(|k| k == key)
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}
}

/// Key-value storage owned by the host.
///
/// Reads return a snapshot; nothing is cached between calls.
pub trait KeyValueStore {
	/// Read the given keys. Keys with no stored value are absent from the result.
	fn get(&self, keys: &[&str]) -> Result<Items>;

	/// Write the given items and report which keys actually changed.
	fn set(&mut self, items: Items) -> Result<StorageChange>;
}

/// Apply `items` to `data`, collecting keys whose value changed.
fn merge_items(data: &mut BTreeMap<String, Value>, items: Items) -> StorageChange {
	let mut change = StorageChange::default();

	for (key, value) in items {
		if data.get(&key) != Some(&value) {
			change.keys.push(key.clone());
			data.insert(key, value);
		}
	}

	change
}

fn select_keys(data: &BTreeMap<String, Value>, keys: &[&str]) -> Items {
	keys.iter()
		.filter_map(|k| data.get(*k).map(|v| (k.to_string(), v.clone())))
		.collect()
}

/// In-process store, used by tests and embedding hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	data: BTreeMap<String, Value>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl KeyValueStore for MemoryStore {
	fn get(&self, keys: &[&str]) -> Result<Items> {
		Ok(select_keys(&self.data, keys))
	}

	fn set(&mut self, items: Items) -> Result<StorageChange> {
		Ok(merge_items(&mut self.data, items))
	}
}

/// Store persisted as a single JSON object on disk.
///
/// Every read goes back to the file so concurrent writers are observed.
#[derive(Debug, Clone)]
pub struct FileStore {
	path: PathBuf,
}

impl FileStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		FileStore { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load(&self) -> Result<BTreeMap<String, Value>> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
			Err(source) => {
				return Err(BarescriptError::StoreReadError {
					path: self.path.clone(),
					source,
				});
			}
		};

		if content.trim().is_empty() {
			return Ok(BTreeMap::new());
		}

		serde_json::from_str(&content).map_err(|source| BarescriptError::StoreDataError {
			key: self.path.display().to_string(),
			source,
		})
	}

	fn save(&self, data: &BTreeMap<String, Value>) -> Result<()> {
		let write_error = |source| BarescriptError::StoreWriteError {
			path: self.path.clone(),
			source,
		};

		let dir = match self.path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};
		std::fs::create_dir_all(dir).map_err(write_error)?;

		let content =
			serde_json::to_string_pretty(data).map_err(|source| BarescriptError::StoreDataError {
				key: self.path.display().to_string(),
				source,
			})?;

		// Write to a uniquely named sibling and rename so readers never see a partial file.
		let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
		tmp.write_all(content.as_bytes()).map_err(write_error)?;
		tmp.persist(&self.path).map_err(|e| write_error(e.error))?;

		Ok(())
	}
}

impl KeyValueStore for FileStore {
	fn get(&self, keys: &[&str]) -> Result<Items> {
		Ok(select_keys(&self.load()?, keys))
	}

	fn set(&mut self, items: Items) -> Result<StorageChange> {
		let mut data = self.load()?;
		let change = merge_items(&mut data, items);

		if !change.is_empty() {
			self.save(&data)?;
		}

		Ok(change)
	}
}
