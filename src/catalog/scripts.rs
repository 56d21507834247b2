use crate::catalog::store::{Items, KeyValueStore, StorageChange};
use crate::catalog::types::{PreparedScript, ScriptKind, StorageData, UserScript};
use crate::error::{BarescriptError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Store key holding the catalog, an object of id to record.
pub const SCRIPTS_KEY: &str = "scripts";

/// Store key holding the global enable flag.
pub const ENABLED_KEY: &str = "enabled";

/// Store key holding the prepared document-start scripts.
pub const START_SCRIPTS_KEY: &str = "startScripts";

/// Generate a fresh script id.
pub fn generate_id() -> String {
	ulid::Ulid::new().to_string().to_lowercase()
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
	chrono::Utc::now().timestamp_millis()
}

fn decode<T: DeserializeOwned>(items: &mut Items, key: &str) -> Result<Option<T>> {
	match items.remove(key) {
		None | Some(Value::Null) => Ok(None),
		Some(value) => serde_json::from_value(value)
			.map(Some)
			.map_err(|source| BarescriptError::StoreDataError {
				key: key.to_string(),
				source,
			}),
	}
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Items> {
	let value = serde_json::to_value(value).map_err(|source| BarescriptError::StoreDataError {
		key: key.to_string(),
		source,
	})?;

	let mut items = Items::new();
	items.insert(key.to_string(), value);
	Ok(items)
}

/// Read the catalog and enable flag, filling defaults for missing keys.
pub fn get_storage<S: KeyValueStore + ?Sized>(store: &S) -> Result<StorageData> {
	let mut items = store.get(&[SCRIPTS_KEY, ENABLED_KEY])?;
	let defaults = StorageData::default();

	Ok(StorageData {
		scripts: decode(&mut items, SCRIPTS_KEY)?.unwrap_or(defaults.scripts),
		enabled: decode(&mut items, ENABLED_KEY)?.unwrap_or(defaults.enabled),
	})
}

fn set_scripts<S: KeyValueStore + ?Sized>(
	store: &mut S,
	scripts: &BTreeMap<String, UserScript>,
) -> Result<StorageChange> {
	store.set(encode(SCRIPTS_KEY, scripts)?)
}

/// All records, scripts and libraries alike, ordered by id.
pub fn get_all_scripts<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<UserScript>> {
	Ok(get_storage(store)?.scripts.into_values().collect())
}

/// Records that may be injected on their own.
pub fn get_scripts_only<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<UserScript>> {
	Ok(get_all_scripts(store)?
		.into_iter()
		.filter(|s| !s.is_library())
		.collect())
}

/// Records that are only reachable through imports.
pub fn get_libraries<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<UserScript>> {
	Ok(get_all_scripts(store)?
		.into_iter()
		.filter(UserScript::is_library)
		.collect())
}

pub fn get_library_by_name<S: KeyValueStore + ?Sized>(
	store: &S,
	name: &str,
) -> Result<Option<UserScript>> {
	Ok(get_libraries(store)?.into_iter().find(|lib| lib.name == name))
}

pub fn get_script<S: KeyValueStore + ?Sized>(store: &S, id: &str) -> Result<Option<UserScript>> {
	Ok(get_storage(store)?.scripts.remove(id))
}

/// Records ordered for display, most recently updated first.
pub fn list_for_display<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<UserScript>> {
	let mut scripts = get_all_scripts(store)?;
	scripts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
	Ok(scripts)
}

/// Insert or replace a record, refreshing its `updated_at`.
///
/// A record's kind cannot change once it has been saved.
pub fn save_script<S: KeyValueStore + ?Sized>(
	store: &mut S,
	mut script: UserScript,
) -> Result<StorageChange> {
	let mut scripts = get_storage(&*store)?.scripts;

	if let Some(existing) = scripts.get(&script.id)
		&& existing.kind != script.kind
	{
		return Err(BarescriptError::ImmutableKind { id: script.id });
	}

	if script.kind == ScriptKind::Library {
		script.matches.clear();
	}

	script.updated_at = now_millis();
	scripts.insert(script.id.clone(), script);
	set_scripts(store, &scripts)
}

pub fn delete_script<S: KeyValueStore + ?Sized>(store: &mut S, id: &str) -> Result<StorageChange> {
	let mut scripts = get_storage(&*store)?.scripts;

	if scripts.remove(id).is_none() {
		return Err(BarescriptError::ScriptNotFound { id: id.to_string() });
	}

	set_scripts(store, &scripts)
}

/// Flip a record's `enabled` flag. Returns the updated record and the store change.
pub fn toggle_script<S: KeyValueStore + ?Sized>(
	store: &mut S,
	id: &str,
) -> Result<(UserScript, StorageChange)> {
	let mut script = get_script(&*store, id)?
		.ok_or_else(|| BarescriptError::ScriptNotFound { id: id.to_string() })?;

	script.enabled = !script.enabled;
	let change = save_script(store, script.clone())?;

	// save_script refreshed the timestamp; report what was stored.
	let stored = get_script(&*store, id)?.unwrap_or(script);
	Ok((stored, change))
}

pub fn is_extension_enabled<S: KeyValueStore + ?Sized>(store: &S) -> Result<bool> {
	Ok(get_storage(store)?.enabled)
}

pub fn set_extension_enabled<S: KeyValueStore + ?Sized>(
	store: &mut S,
	enabled: bool,
) -> Result<StorageChange> {
	store.set(encode(ENABLED_KEY, &enabled)?)
}

/// Read the prepared document-start scripts.
pub fn get_start_scripts<S: KeyValueStore + ?Sized>(store: &S) -> Result<Vec<PreparedScript>> {
	let mut items = store.get(&[START_SCRIPTS_KEY])?;
	Ok(decode(&mut items, START_SCRIPTS_KEY)?.unwrap_or_default())
}

pub fn set_start_scripts<S: KeyValueStore + ?Sized>(
	store: &mut S,
	prepared: &[PreparedScript],
) -> Result<StorageChange> {
	store.set(encode(START_SCRIPTS_KEY, &prepared)?)
}
