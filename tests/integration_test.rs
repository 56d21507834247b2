#![allow(deprecated)] // assert_cmd::Command::cargo_bin is deprecated but replacement requires nightly

use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn barescript_cmd() -> assert_cmd::Command {
	let mut cmd = assert_cmd::Command::cargo_bin("barescript").unwrap();
	cmd.env("BARESCRIPT_NO_USER_CONFIG", "1");
	cmd.env_remove("BARESCRIPT_LOG");
	cmd
}

/// A command bound to an isolated store inside `dir`.
fn store_cmd(dir: &Path) -> assert_cmd::Command {
	let mut cmd = barescript_cmd();
	cmd.current_dir(dir)
		.arg("--store")
		.arg(dir.join("storage.json"));
	cmd
}

fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
	let path = dir.join(name);
	fs::write(&path, content).unwrap();
	path
}

/// Add a source file and return the id printed by the CLI.
fn add(dir: &Path, file: &Path, extra: &[&str]) -> String {
	let output = store_cmd(dir)
		.arg("add")
		.arg(file)
		.args(extra)
		.output()
		.unwrap();
	assert!(output.status.success(), "add failed: {:?}", output);

	let stdout = String::from_utf8(output.stdout).unwrap();
	let start = stdout.rfind('(').unwrap() + 1;
	let end = stdout.rfind(')').unwrap();
	stdout[start..end].to_string()
}

const GREETER: &str = r#"// ==UserScript==
// @name        Greeter
// @match       *://*.example.com/*
// ==/UserScript==
import { greet } from "greetings";
greet("page");
"#;

const GREETINGS_LIB: &str = r#"// ==UserScript==
// @name        greetings
// ==/UserScript==
return { greet: (who) => console.log("hello " + who) };
"#;

const EARLY: &str = r#"// ==UserScript==
// @name        Early Bird
// @match       <all_urls>
// @run-at      document-start
// ==/UserScript==
document.documentElement.dataset.early = "1";
"#;

// ============================================================================
// CLI flag tests
// ============================================================================

#[test]
fn test_help_flag() {
	barescript_cmd()
		.arg("--help")
		.assert()
		.success()
		.stdout(predicate::str::contains("Lightweight userscript manager"));
}

#[test]
fn test_version_flag() {
	barescript_cmd()
		.arg("--version")
		.assert()
		.success()
		.stdout(predicate::str::contains("barescript"));
}

#[test]
fn test_no_args_shows_help() {
	barescript_cmd()
		.assert()
		.failure()
		.stderr(predicate::str::contains("Usage"));
}

// ============================================================================
// match / metadata tests
// ============================================================================

#[test]
fn test_match_reports_hits_and_invalid_patterns() {
	barescript_cmd()
		.args([
			"match",
			"https://foo.example.com/page",
			"*://*.example.com/*",
			"htp://bad",
		])
		.assert()
		.success()
		.stdout(predicate::str::contains("match  *://*.example.com/*"))
		.stdout(predicate::str::contains("invalid  htp://bad"));
}

#[test]
fn test_match_fails_when_nothing_matches() {
	barescript_cmd()
		.args(["match", "ftp://a.com/", "*://*/*", "<all_urls>"])
		.assert()
		.failure()
		.stdout(predicate::str::contains("miss"));
}

#[test]
fn test_metadata_command() {
	let temp_dir = tempfile::tempdir().unwrap();
	let file = write_source(temp_dir.path(), "early.js", EARLY);

	barescript_cmd()
		.arg("metadata")
		.arg(&file)
		.assert()
		.success()
		.stdout(predicate::str::contains("name: Early Bird"))
		.stdout(predicate::str::contains("run-at: document-start"))
		.stdout(predicate::str::contains("match: <all_urls>"));
}

// ============================================================================
// catalog tests
// ============================================================================

#[test]
fn test_list_empty_store() {
	let temp_dir = tempfile::tempdir().unwrap();

	store_cmd(temp_dir.path())
		.arg("list")
		.assert()
		.success()
		.stdout(predicate::str::contains("No scripts found."));
}

#[test]
fn test_add_and_list() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	let file = write_source(dir, "greeter.js", GREETER);

	let id = add(dir, &file, &[]);

	store_cmd(dir)
		.arg("list")
		.assert()
		.success()
		.stdout(predicate::str::contains(id.as_str()))
		.stdout(predicate::str::contains("[on ] Greeter (script, document-end)"))
		.stdout(predicate::str::contains("@match *://*.example.com/*"));

	assert!(dir.join("storage.json").exists());
}

#[test]
fn test_list_by_url() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	add(dir, &write_source(dir, "greeter.js", GREETER), &[]);
	add(dir, &write_source(dir, "lib.js", GREETINGS_LIB), &["--library"]);

	store_cmd(dir)
		.args(["list", "--url", "https://example.com/"])
		.assert()
		.success()
		.stdout(predicate::str::contains("Greeter"))
		.stdout(predicate::str::contains("greetings").not());

	store_cmd(dir)
		.args(["list", "--url", "https://elsewhere.org/"])
		.assert()
		.success()
		.stdout(predicate::str::contains("No scripts found."));
}

#[test]
fn test_add_with_overrides() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	let file = write_source(dir, "greeter.js", GREETER);

	add(
		dir,
		&file,
		&["--name", "Renamed", "--run-at", "document-start", "--disabled"],
	);

	store_cmd(dir)
		.arg("list")
		.assert()
		.success()
		.stdout(predicate::str::contains("[off] Renamed (script, document-start)"));
}

#[test]
fn test_add_rejects_bad_run_at() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	let file = write_source(dir, "greeter.js", GREETER);

	store_cmd(dir)
		.arg("add")
		.arg(&file)
		.args(["--run-at", "document-idle"])
		.assert()
		.failure()
		.stderr(predicate::str::contains("invalid run-at"));
}

#[test]
fn test_toggle_and_remove() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	let id = add(dir, &write_source(dir, "greeter.js", GREETER), &[]);

	store_cmd(dir)
		.args(["toggle", &id])
		.assert()
		.success()
		.stdout(predicate::str::contains("Greeter is now disabled"));

	store_cmd(dir)
		.args(["remove", &id])
		.assert()
		.success()
		.stdout(predicate::str::contains("Removed"));

	store_cmd(dir)
		.args(["remove", &id])
		.assert()
		.failure()
		.stderr(predicate::str::contains("Script not found"));
}

// ============================================================================
// check / inject tests
// ============================================================================

#[test]
fn test_check_follows_global_switch() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	add(dir, &write_source(dir, "greeter.js", GREETER), &[]);

	store_cmd(dir)
		.args(["check", "https://www.example.com/"])
		.assert()
		.success()
		.stdout(predicate::str::contains(r#"{"hasScripts":true}"#));

	store_cmd(dir).arg("disable").assert().success();

	store_cmd(dir)
		.args(["check", "https://www.example.com/"])
		.assert()
		.success()
		.stdout(predicate::str::contains(r#"{"hasScripts":false}"#));
}

#[test]
fn test_inject_document_end_inlines_library() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	add(dir, &write_source(dir, "lib.js", GREETINGS_LIB), &["--library"]);
	add(dir, &write_source(dir, "greeter.js", GREETER), &[]);

	store_cmd(dir)
		.args(["inject", "https://example.com/", "--tab", "9"])
		.assert()
		.success()
		.stdout(predicate::str::contains("// tab 9"))
		.stdout(predicate::str::contains("const { greet } = (function() {"))
		.stdout(predicate::str::contains("[userscript:Greeter] loaded"))
		.stdout(predicate::str::contains("waitForIdleDOM"))
		.stderr(predicate::str::contains("Injected 1 script(s) at document-end"));
}

#[test]
fn test_inject_missing_library_uses_placeholder() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	add(dir, &write_source(dir, "greeter.js", GREETER), &[]);

	store_cmd(dir)
		.args(["inject", "https://example.com/"])
		.assert()
		.success()
		.stdout(predicate::str::contains(
			r#"/* barescript: library "greetings" not found */"#,
		))
		.stdout(predicate::str::contains(r#"greet("page");"#));
}

#[test]
fn test_inject_document_start_uses_cache() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	add(dir, &write_source(dir, "early.js", EARLY), &[]);
	add(dir, &write_source(dir, "greeter.js", GREETER), &[]);

	let storage = fs::read_to_string(dir.join("storage.json")).unwrap();
	assert!(storage.contains("startScripts"));

	store_cmd(dir)
		.args(["inject", "https://example.com/", "--phase", "document-start"])
		.assert()
		.success()
		.stdout(predicate::str::contains("[userscript:Early Bird] loaded"))
		.stdout(predicate::str::contains("Greeter").not())
		.stdout(predicate::str::contains("waitForIdleDOM").not())
		.stderr(predicate::str::contains("Injected 1 script(s) at document-start"));
}

#[test]
fn test_inject_skips_excluded_pages() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	add(dir, &write_source(dir, "early.js", EARLY), &["--run-at", "document-end"]);

	store_cmd(dir)
		.args(["inject", "chrome://settings/"])
		.assert()
		.success()
		.stderr(predicate::str::contains("Injected 0 script(s)"));
}

#[test]
fn test_inject_honours_config() {
	let temp_dir = tempfile::tempdir().unwrap();
	let dir = temp_dir.path();
	fs::write(
		dir.join(".barescript.toml"),
		"[injection]\nidle-wait = false\nblur-while-loading = false\n",
	)
	.unwrap();
	add(dir, &write_source(dir, "greeter.js", GREETER), &[]);

	store_cmd(dir)
		.args(["inject", "https://example.com/"])
		.assert()
		.success()
		.stdout(predicate::str::contains("[userscript:Greeter] loaded"))
		.stdout(predicate::str::contains("waitForIdleDOM").not())
		.stdout(predicate::str::contains("barescript-blur").not());
}

// ============================================================================
// config subcommand tests
// ============================================================================

#[test]
fn test_config_validate_no_config() {
	let temp_dir = tempfile::tempdir().unwrap();

	barescript_cmd()
		.args(["config", "validate"])
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("No configuration files found"));
}

#[test]
fn test_config_validate_invalid_config() {
	let temp_dir = tempfile::tempdir().unwrap();
	fs::write(
		temp_dir.path().join(".barescript.toml"),
		"[injection]\nidle-quiet-ms = 9000\nidle-timeout-ms = 100\n",
	)
	.unwrap();

	barescript_cmd()
		.args(["config", "validate"])
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_config_init_then_validate() {
	let temp_dir = tempfile::tempdir().unwrap();

	barescript_cmd()
		.args(["config", "init"])
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("Created .barescript.toml"));

	barescript_cmd()
		.args(["config", "init"])
		.current_dir(temp_dir.path())
		.assert()
		.failure()
		.stderr(predicate::str::contains("already exists"));

	barescript_cmd()
		.args(["config", "init", "--force"])
		.current_dir(temp_dir.path())
		.assert()
		.success();

	barescript_cmd()
		.args(["config", "validate"])
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_show_explicit_file() {
	let temp_dir = tempfile::tempdir().unwrap();
	let config_path = temp_dir.path().join("custom.toml");
	fs::write(&config_path, "store = \"/tmp/somewhere.json\"\n").unwrap();

	barescript_cmd()
		.args(["config", "show", "--config"])
		.arg(&config_path)
		.current_dir(temp_dir.path())
		.assert()
		.success()
		.stdout(predicate::str::contains("# Source:"))
		.stdout(predicate::str::contains("store: /tmp/somewhere.json"))
		.stdout(predicate::str::contains("idle-wait: true"));
}
