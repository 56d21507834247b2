use crate::catalog::types::RunAt;
use regex::Regex;
use std::sync::LazyLock;

/// Opening sentinel of a userscript header block.
pub const HEADER_START: &str = "==UserScript==";

/// Closing sentinel of a userscript header block.
pub const HEADER_END: &str = "==/UserScript==";

/// Regex for a `// @key value` directive. The `//` may appear anywhere in the line.
#[allow(clippy::expect_used)]
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"//\s*@([\w-]+)\s+(.+)$").expect("valid regex pattern")
});

/// Directives declared in a userscript header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptMetadata {
	/// Value of the first `@name` directive.
	pub name: Option<String>,

	/// Every `@match` directive, in source order.
	pub matches: Vec<String>,

	/// Value of the first recognised `@run-at` directive.
	pub run_at: Option<RunAt>,
}

/// Scan the header block of a script.
///
/// Only lines between `==UserScript==` and `==/UserScript==` are considered;
/// scanning stops at the closing sentinel. Directives may appear in any order.
pub fn parse_metadata(code: &str) -> ScriptMetadata {
	let mut metadata = ScriptMetadata::default();
	let mut in_block = false;

	for line in code.lines() {
		let trimmed = line.trim();

		if trimmed.contains(HEADER_END) {
			break;
		}

		if trimmed.contains(HEADER_START) {
			in_block = true;
			continue;
		}

		if !in_block {
			continue;
		}

		let Some(caps) = DIRECTIVE.captures(trimmed) else {
			continue;
		};
		let value = caps[2].trim();

		match &caps[1] {
			"match" => metadata.matches.push(value.to_string()),
			"name" if metadata.name.is_none() => metadata.name = Some(value.to_string()),
			"run-at" if metadata.run_at.is_none() => metadata.run_at = RunAt::parse(value),
			_ => {}
		}
	}

	metadata
}

/// Extract the `@match` patterns declared in a script's header block.
pub fn parse_match_metadata(code: &str) -> Vec<String> {
	parse_metadata(code).matches
}
