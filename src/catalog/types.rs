use crate::catalog::scripts::{generate_id, now_millis};
use crate::matcher::parse_metadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name given to scripts whose header declares no `@name`.
pub const DEFAULT_SCRIPT_NAME: &str = "New Script";

/// Lifecycle phase at which a script is injected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunAt {
	/// As soon as the page has a document element.
	DocumentStart,

	/// Once the page has finished loading.
	#[default]
	DocumentEnd,
}

impl RunAt {
	/// Parse a run-at value, accepting both `document-start` and `document_start` spellings.
	pub fn parse(value: &str) -> Option<Self> {
		match value.trim() {
			"document-start" | "document_start" => Some(RunAt::DocumentStart),
			"document-end" | "document_end" => Some(RunAt::DocumentEnd),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			RunAt::DocumentStart => "document-start",
			RunAt::DocumentEnd => "document-end",
		}
	}
}

impl fmt::Display for RunAt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Whether a catalog entry runs on its own or is only imported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
	#[default]
	Script,
	Library,
}

impl ScriptKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ScriptKind::Script => "script",
			ScriptKind::Library => "library",
		}
	}
}

/// A userscript or library record as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScript {
	/// Unique, immutable identifier.
	pub id: String,

	/// Display label. For libraries this is also the import key.
	pub name: String,

	pub enabled: bool,

	/// Records written before libraries existed carry no type and are scripts.
	#[serde(rename = "type", default)]
	pub kind: ScriptKind,

	/// Match patterns. Libraries carry none.
	#[serde(default)]
	pub matches: Vec<String>,

	#[serde(default)]
	pub run_at: RunAt,

	pub code: String,

	/// Milliseconds since the Unix epoch of the last mutation.
	#[serde(default)]
	pub updated_at: i64,
}

impl UserScript {
	/// Create a new record from source text.
	///
	/// Name, match patterns and run-at come from the header block when present.
	pub fn from_source(code: &str, kind: ScriptKind) -> Self {
		let metadata = parse_metadata(code);

		let matches = match kind {
			ScriptKind::Script => metadata.matches,
			ScriptKind::Library => Vec::new(),
		};

		UserScript {
			id: generate_id(),
			name: metadata
				.name
				.unwrap_or_else(|| DEFAULT_SCRIPT_NAME.to_string()),
			enabled: true,
			kind,
			matches,
			run_at: metadata.run_at.unwrap_or_default(),
			code: code.to_string(),
			updated_at: now_millis(),
		}
	}

	pub fn is_library(&self) -> bool {
		self.kind == ScriptKind::Library
	}
}

/// Everything the extension keeps in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageData {
	/// Catalog keyed by script id.
	pub scripts: BTreeMap<String, UserScript>,

	/// Global on/off switch.
	pub enabled: bool,
}

impl Default for StorageData {
	fn default() -> Self {
		StorageData {
			scripts: BTreeMap::new(),
			enabled: true,
		}
	}
}

/// A document-start script whose imports are already inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedScript {
	pub id: String,
	pub name: String,
	pub matches: Vec<String>,
	pub code: String,
}
