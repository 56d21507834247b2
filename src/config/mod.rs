//! Configuration loading and parsing for barescript.
//!
//! This module handles:
//! - TOML config file parsing and validation
//! - Config file discovery from the working directory upwards
//! - Store path resolution

pub mod loader;
pub mod parser;
pub mod types;

pub use loader::{
	CONFIG_FILE_NAME, default_store_path, discover_config, init_template, load_config,
	store_path, user_config_path,
};
pub use parser::{parse_config_file, parse_config_str};
pub use types::{Config, InjectionConfig, LoadedConfig};
