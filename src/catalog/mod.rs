//! Script catalog and key-value storage.
//!
//! This module handles:
//! - The persisted record types (scripts, libraries, prepared start scripts)
//! - The host key-value store seam and its in-memory and file implementations
//! - Catalog reads and writes keyed by script id

pub mod scripts;
pub mod store;
pub mod types;

pub use scripts::{
	ENABLED_KEY, SCRIPTS_KEY, START_SCRIPTS_KEY, delete_script, generate_id, get_all_scripts,
	get_libraries, get_library_by_name, get_script, get_scripts_only, get_start_scripts,
	get_storage, is_extension_enabled, list_for_display, save_script, set_extension_enabled,
	set_start_scripts, toggle_script,
};
pub use store::{FileStore, Items, KeyValueStore, MemoryStore, StorageChange};
pub use types::{PreparedScript, RunAt, ScriptKind, StorageData, UserScript};
