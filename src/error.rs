use std::path::PathBuf;

/// Library-level structured errors for barescript.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum BarescriptError {
	#[error("Failed to read config file: {path}")]
	ConfigReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse config file: {path}")]
	ConfigParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid config value for {key}: {reason}")]
	InvalidConfig { key: String, reason: String },

	#[error("Failed to read store: {path}")]
	StoreReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to write store: {path}")]
	StoreWriteError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Malformed store data under key: {key}")]
	StoreDataError {
		key: String,
		#[source]
		source: serde_json::Error,
	},

	#[error("Invalid match pattern: {pattern} ({reason})")]
	InvalidPattern { pattern: String, reason: String },

	#[error("Script not found: {id}")]
	ScriptNotFound { id: String },

	#[error("Cannot change the type of existing script: {id}")]
	ImmutableKind { id: String },

	#[error("Injection failed for {name}: {reason}")]
	ExecutionFailed { name: String, reason: String },

	#[error("Failed to resolve home directory")]
	HomeDirectoryNotFound,
}

/// Result type alias using BarescriptError.
pub type Result<T> = std::result::Result<T, BarescriptError>;
