use crate::config::parser::parse_config_file;
use crate::config::types::{Config, InjectionConfig, LoadedConfig};
use crate::error::{BarescriptError, Result};
use std::path::{Path, PathBuf};

/// File name looked up in each directory.
pub const CONFIG_FILE_NAME: &str = ".barescript.toml";

/// Environment variable that, if truthy, skips the `~/.barescript.toml` fallback.
pub const NO_USER_CONFIG_ENV: &str = "BARESCRIPT_NO_USER_CONFIG";

/// Find and load the effective config file.
///
/// The lookup order is:
/// 1. `.barescript.toml` in `start_dir`, then in each parent directory
/// 2. `~/.barescript.toml` (unless `BARESCRIPT_NO_USER_CONFIG` is truthy)
///
/// The first file found wins. Returns `None` when no file exists.
pub fn discover_config(start_dir: &Path) -> Result<Option<LoadedConfig>> {
	for dir in start_dir.ancestors() {
		let config_path = dir.join(CONFIG_FILE_NAME);

		if config_path.is_file() {
			return load_from(config_path).map(Some);
		}
	}

	if is_env_truthy(NO_USER_CONFIG_ENV) {
		return Ok(None);
	}

	let user_path = user_config_path()?;
	if user_path.is_file() {
		return load_from(user_path).map(Some);
	}

	Ok(None)
}

fn load_from(path: PathBuf) -> Result<LoadedConfig> {
	let config = parse_config_file(&path)?;
	Ok(LoadedConfig {
		config,
		path: Some(path),
	})
}

/// Load an explicit config file, or discover one from `start_dir`, or fall back to defaults.
pub fn load_config(explicit: Option<&Path>, start_dir: &Path) -> Result<LoadedConfig> {
	if let Some(path) = explicit {
		return load_from(path.to_path_buf());
	}

	Ok(discover_config(start_dir)?.unwrap_or_default())
}

/// Check if an environment variable is set to a truthy value.
fn is_env_truthy(var_name: &str) -> bool {
	match std::env::var(var_name) {
		Ok(value) => {
			let lower = value.to_lowercase();
			!value.is_empty() && lower != "0" && lower != "false" && lower != "no"
		}
		Err(_) => false,
	}
}

/// Get the path to the user's config file.
pub fn user_config_path() -> Result<PathBuf> {
	let home_dir = dirs::home_dir().ok_or(BarescriptError::HomeDirectoryNotFound)?;
	Ok(home_dir.join(CONFIG_FILE_NAME))
}

/// Default location of the key-value store file.
pub fn default_store_path() -> Result<PathBuf> {
	let data_dir = dirs::data_dir().ok_or(BarescriptError::HomeDirectoryNotFound)?;
	Ok(data_dir.join("barescript").join("storage.json"))
}

/// The store path a config selects, falling back to the platform default.
pub fn store_path(config: &Config) -> Result<PathBuf> {
	match config.store {
		Some(ref path) => Ok(path.clone()),
		None => default_store_path(),
	}
}

/// Contents written by `barescript config init`.
pub fn init_template() -> String {
	let defaults = InjectionConfig::default();
	let prefixes = defaults
		.excluded_prefixes
		.iter()
		.map(|p| format!("\"{p}\""))
		.collect::<Vec<_>>()
		.join(", ");

	format!(
		r#"# barescript configuration

# Where the script catalog is stored. Defaults to the platform data directory.
# store = "storage.json"

[injection]
# Wait for the DOM to settle before running document-end scripts.
idle-wait = {idle_wait}
idle-quiet-ms = {quiet}
idle-timeout-ms = {timeout}

# Remove the loading blur once a script runs.
blur-while-loading = {blur}

# Pages that are never injected into.
excluded-prefixes = [{prefixes}]
"#,
		idle_wait = defaults.idle_wait,
		quiet = defaults.idle_quiet_ms,
		timeout = defaults.idle_timeout_ms,
		blur = defaults.blur_while_loading,
	)
}
