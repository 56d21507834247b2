use crate::error::BarescriptError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration from a `.barescript.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
	/// Path of the JSON key-value store. Defaults to the platform data directory.
	pub store: Option<PathBuf>,

	/// How scripts are wrapped and where they may run.
	pub injection: InjectionConfig,
}

/// Injection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct InjectionConfig {
	/// Wait for DOM mutations to settle before running document-end scripts.
	pub idle_wait: bool,

	/// Milliseconds without DOM mutations that count as idle.
	pub idle_quiet_ms: u64,

	/// Upper bound on the idle wait, after which the script runs anyway.
	pub idle_timeout_ms: u64,

	/// Remove the loading blur installed by the content side once a script runs.
	pub blur_while_loading: bool,

	/// URL prefixes of pages that are never injected into.
	pub excluded_prefixes: Vec<String>,
}

impl Default for InjectionConfig {
	fn default() -> Self {
		InjectionConfig {
			idle_wait: true,
			idle_quiet_ms: 300,
			idle_timeout_ms: 10_000,
			blur_while_loading: true,
			excluded_prefixes: vec!["chrome://".to_string(), "chrome-extension://".to_string()],
		}
	}
}

impl InjectionConfig {
	/// The idle quiet period must fit inside the idle timeout.
	pub fn validate(&self) -> Result<(), BarescriptError> {
		if self.idle_quiet_ms >= self.idle_timeout_ms {
			return Err(BarescriptError::InvalidConfig {
				key: "injection.idle-quiet-ms".to_string(),
				reason: format!(
					"must be less than idle-timeout-ms ({} >= {})",
					self.idle_quiet_ms, self.idle_timeout_ms
				),
			});
		}
		Ok(())
	}
}

impl Config {
	pub fn validate(&self) -> Result<(), BarescriptError> {
		self.injection.validate()
	}
}

/// A configuration together with the file it came from, if any.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
	/// The parsed configuration.
	pub config: Config,

	/// The path this config was loaded from. `None` means built-in defaults.
	pub path: Option<PathBuf>,
}
