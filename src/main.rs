use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use barescript::catalog::{
	FileStore, KeyValueStore, RunAt, ScriptKind, StorageChange, UserScript, delete_script, list_for_display,
	save_script, set_extension_enabled, toggle_script,
};
use barescript::config::{
	CONFIG_FILE_NAME, LoadedConfig, discover_config, init_template, load_config, store_path,
	user_config_path,
};
use barescript::inject::{Background, Event, InjectionTarget, ScriptExecutor};
use barescript::matcher::{compile, parse_metadata};
use barescript::protocol::{Message, Response};

#[derive(Parser)]
#[command(name = "barescript")]
#[command(
	author,
	version,
	about = "Lightweight userscript manager: match patterns, library inlining and injection"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Use this config file instead of discovering .barescript.toml
	#[arg(long, global = true, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Use this store file instead of the configured one
	#[arg(long, global = true, value_name = "PATH")]
	store: Option<PathBuf>,

	/// Enable debug logging on stderr
	#[arg(short, long, global = true)]
	verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Test a URL against match patterns
	Match {
		url: String,
		#[arg(required = true)]
		patterns: Vec<String>,
	},
	/// Report whether any enabled script will run on a URL
	Check { url: String },
	/// List catalog entries, newest first
	List {
		/// Only show scripts whose patterns match this URL
		#[arg(long)]
		url: Option<String>,
	},
	/// Add a script or library from a source file
	Add {
		file: PathBuf,
		/// Store the file as a library
		#[arg(long)]
		library: bool,
		/// Override the @name from the header
		#[arg(long)]
		name: Option<String>,
		/// Override the @run-at from the header
		#[arg(long, value_parser = parse_run_at)]
		run_at: Option<RunAt>,
		/// Add the entry disabled
		#[arg(long)]
		disabled: bool,
	},
	/// Enable or disable a catalog entry
	Toggle { id: String },
	/// Delete a catalog entry
	Remove { id: String },
	/// Turn injection on globally
	Enable,
	/// Turn injection off globally
	Disable,
	/// Simulate a page load and print the payloads that would be injected
	Inject {
		url: String,
		#[arg(long, value_parser = parse_run_at, default_value = "document-end")]
		phase: RunAt,
		#[arg(long, default_value_t = 1)]
		tab: u32,
	},
	/// Show the header metadata of a source file
	Metadata { file: PathBuf },
	/// Configuration management commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display the effective configuration and where it came from
	Show,
	/// Check the config file for errors without running anything
	Validate,
	/// Create a template .barescript.toml in the current directory
	Init {
		/// Overwrite an existing .barescript.toml
		#[arg(long)]
		force: bool,
	},
}

fn parse_run_at(value: &str) -> std::result::Result<RunAt, String> {
	RunAt::parse(value).ok_or_else(|| {
		format!("invalid run-at '{value}' (expected document-start or document-end)")
	})
}

/// Prints each payload instead of running it in a page.
struct StdoutExecutor;

impl ScriptExecutor for StdoutExecutor {
	fn execute(&mut self, target: InjectionTarget, source: &str) -> barescript::Result<()> {
		println!("// tab {}", target.tab_id);
		println!("{source}");
		Ok(())
	}
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match run(cli) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging(verbose: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_env("BARESCRIPT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn run(cli: Cli) -> Result<ExitCode> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;

	match cli.command {
		Commands::Match { url, patterns } => Ok(handle_match(&url, &patterns)),
		Commands::Metadata { file } => handle_metadata(&file),
		Commands::Config { action } => match action {
			ConfigAction::Show => handle_config_show(cli.config.as_deref(), &cwd),
			ConfigAction::Validate => handle_config_validate(cli.config.as_deref(), &cwd),
			ConfigAction::Init { force } => handle_config_init(&cwd, force),
		},
		command => {
			let mut background = open_background(cli.config.as_deref(), cli.store, &cwd)?;
			handle_catalog_command(&mut background, command)
		}
	}
}

fn open_background(
	config_path: Option<&Path>,
	store_override: Option<PathBuf>,
	cwd: &Path,
) -> Result<Background<FileStore, StdoutExecutor>> {
	let loaded = load_config(config_path, cwd).context("Failed to load configuration")?;

	let path = match store_override {
		Some(path) => path,
		None => store_path(&loaded.config).context("Failed to resolve store path")?,
	};

	Ok(Background::new(
		FileStore::new(path),
		StdoutExecutor,
		loaded.config.injection,
	))
}

/// Deliver a store change so the start cache follows the catalog.
///
/// The write has already landed when this runs, so a failed refresh is
/// reported as a warning rather than failing the command. Returns whether the
/// cache is current.
fn notify<S: KeyValueStore, E: ScriptExecutor>(
	background: &mut Background<S, E>,
	change: StorageChange,
) -> bool {
	match background.handle_event(Event::StorageChanged(change)) {
		Ok(_) => true,
		Err(e) => {
			tracing::warn!(
				"catalog saved, but refreshing document-start scripts failed: {e}; \
				 they will be refreshed on the next catalog change"
			);
			false
		}
	}
}

fn handle_catalog_command(
	background: &mut Background<FileStore, StdoutExecutor>,
	command: Commands,
) -> Result<ExitCode> {
	match command {
		Commands::Check { url } => {
			let response = background.handle_message(None, Message::CheckHasScripts { url })?;
			println!("{}", serde_json::to_string(&response)?);
		}
		Commands::List { url: Some(url) } => {
			match background.handle_message(None, Message::GetMatchingScripts { url })? {
				Response::Scripts(scripts) => print_scripts(&scripts),
				other => anyhow::bail!("Unexpected response: {other:?}"),
			}
		}
		Commands::List { url: None } => {
			let scripts = list_for_display(background.store())?;
			print_scripts(&scripts);
		}
		Commands::Add {
			file,
			library,
			name,
			run_at,
			disabled,
		} => {
			let code = std::fs::read_to_string(&file)
				.with_context(|| format!("Failed to read {}", file.display()))?;
			let kind = if library {
				ScriptKind::Library
			} else {
				ScriptKind::Script
			};

			let mut script = UserScript::from_source(&code, kind);
			if let Some(name) = name {
				script.name = name;
			}
			if let Some(run_at) = run_at {
				script.run_at = run_at;
			}
			script.enabled = !disabled;

			let id = script.id.clone();
			let name = script.name.clone();
			let change = save_script(background.store_mut(), script)?;
			notify(background, change);
			println!("Added {} {} ({})", kind.as_str(), name, id);
		}
		Commands::Toggle { id } => {
			let (script, change) = toggle_script(background.store_mut(), &id)?;
			notify(background, change);
			let state = if script.enabled { "enabled" } else { "disabled" };
			println!("{} is now {}", script.name, state);
		}
		Commands::Remove { id } => {
			let change = delete_script(background.store_mut(), &id)?;
			notify(background, change);
			println!("Removed {}", id);
		}
		Commands::Enable => set_enabled(background, true)?,
		Commands::Disable => set_enabled(background, false)?,
		Commands::Inject { url, phase, tab } => {
			let target = InjectionTarget { tab_id: tab };
			let injected = match phase {
				RunAt::DocumentEnd => background.on_navigation_complete(target, &url)?,
				RunAt::DocumentStart => {
					let message = Message::BodyReady { url };
					match background.handle_message(Some(target), message)? {
						Response::Injected { injected } => injected,
						other => anyhow::bail!("Unexpected response: {other:?}"),
					}
				}
			};
			eprintln!("Injected {} script(s) at {}", injected, phase);
		}
		Commands::Match { .. } | Commands::Metadata { .. } | Commands::Config { .. } => {
			anyhow::bail!("Command does not operate on the catalog");
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn set_enabled(background: &mut Background<FileStore, StdoutExecutor>, enabled: bool) -> Result<()> {
	let change = set_extension_enabled(background.store_mut(), enabled)?;
	notify(background, change);
	println!("barescript is {}", if enabled { "enabled" } else { "disabled" });
	Ok(())
}

fn print_scripts(scripts: &[UserScript]) {
	if scripts.is_empty() {
		println!("No scripts found.");
		return;
	}

	for script in scripts {
		let state = if script.enabled { "on " } else { "off" };
		println!(
			"{}  [{}] {} ({}, {})",
			script.id,
			state,
			script.name,
			script.kind.as_str(),
			script.run_at
		);
		for pattern in &script.matches {
			println!("    @match {}", pattern);
		}
	}
}

fn handle_match(url: &str, patterns: &[String]) -> ExitCode {
	let mut any = false;

	for pattern in patterns {
		match compile(pattern) {
			Ok(compiled) => {
				let hit = compiled.is_match(url);
				any |= hit;
				println!(
					"{}  {}  -> {}",
					if hit { "match" } else { "miss " },
					compiled.as_str(),
					compiled.regex().as_str()
				);
			}
			Err(e) => println!("invalid  {}  ({})", pattern, e),
		}
	}

	if any {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	}
}

fn handle_metadata(file: &Path) -> Result<ExitCode> {
	let code = std::fs::read_to_string(file)
		.with_context(|| format!("Failed to read {}", file.display()))?;
	let metadata = parse_metadata(&code);

	println!("name: {}", metadata.name.as_deref().unwrap_or("(none)"));
	println!(
		"run-at: {}",
		metadata.run_at.map_or("(none)", |r| r.as_str())
	);
	for pattern in &metadata.matches {
		println!("match: {}", pattern);
	}

	Ok(ExitCode::SUCCESS)
}

fn print_config(loaded: &LoadedConfig) -> Result<()> {
	match loaded.path {
		Some(ref path) => println!("# Source: {}", path.display()),
		None => println!("# Source: built-in defaults"),
	}

	let store = store_path(&loaded.config).context("Failed to resolve store path")?;
	println!("store: {}", store.display());

	let injection = &loaded.config.injection;
	println!("idle-wait: {}", injection.idle_wait);
	println!("idle-quiet-ms: {}", injection.idle_quiet_ms);
	println!("idle-timeout-ms: {}", injection.idle_timeout_ms);
	println!("blur-while-loading: {}", injection.blur_while_loading);
	println!("excluded-prefixes: {}", injection.excluded_prefixes.join(", "));

	Ok(())
}

fn handle_config_show(config_path: Option<&Path>, cwd: &Path) -> Result<ExitCode> {
	let loaded = load_config(config_path, cwd).context("Failed to load configuration")?;
	print_config(&loaded)?;

	if let Ok(user_path) = user_config_path() {
		println!();
		println!("User config path: {}", user_path.display());
		if user_path.exists() {
			println!("  (exists)");
		} else {
			println!("  (not found)");
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_config_validate(config_path: Option<&Path>, cwd: &Path) -> Result<ExitCode> {
	let result = match config_path {
		Some(path) => load_config(Some(path), cwd).map(Some),
		None => discover_config(cwd),
	};

	match result {
		Ok(Some(loaded)) => {
			if let Some(ref path) = loaded.path {
				println!("Configuration is valid: {}", path.display());
			}
			Ok(ExitCode::SUCCESS)
		}
		Ok(None) => {
			println!("No configuration files found.");
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Configuration error: {}", e);
			Ok(ExitCode::FAILURE)
		}
	}
}

fn handle_config_init(cwd: &Path, force: bool) -> Result<ExitCode> {
	let config_path = cwd.join(CONFIG_FILE_NAME);

	if config_path.exists() && !force {
		anyhow::bail!("{CONFIG_FILE_NAME} already exists. Use --force to overwrite.");
	}

	std::fs::write(&config_path, init_template())
		.with_context(|| format!("Failed to write {}", config_path.display()))?;

	println!("Created {CONFIG_FILE_NAME}");
	Ok(ExitCode::SUCCESS)
}
