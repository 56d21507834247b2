//! Library inlining for userscripts.
//!
//! Resolution is a single-pass textual macro substitution, not a module system.
//! Two statement forms are rewritten when they start a line:
//!
//! - `import Name from "lib"` becomes `const Name = (function() { ... })();`
//! - `import { a, b as c } from "lib"` becomes `const { a, b: c } = (function() { ... })();`
//!
//! The library source is inlined verbatim inside the function body, so a library
//! hands back its exports with a top-level `return`. Limitations:
//! - imports inside an inlined library are not resolved
//! - the same library is inlined again for every import site
//! - namespace imports (`import * as x`) and side-effect imports are left untouched
//!
//! A name missing from the library map becomes a comment placeholder and binds nothing.

use crate::catalog::types::UserScript;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for both supported import forms at the start of a line.
#[allow(clippy::expect_used)]
static IMPORT_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r#"(?m)^(?P<indent>[ \t]*)import(?:\s+(?P<default>[A-Za-z_$][\w$]*)\s+|\s*\{(?P<named>[^}]*)\}\s*)from\s*['"](?P<lib>[^'"]+)['"][ \t]*;?"#,
	)
	.expect("valid regex pattern")
});

/// Enabled libraries by import name.
pub type LibraryMap<'a> = HashMap<&'a str, &'a str>;

/// Build the name to source map of enabled libraries.
///
/// When two libraries share a name, the first one in catalog order wins.
pub fn library_map(catalog: &[UserScript]) -> LibraryMap<'_> {
	let mut map = LibraryMap::new();

	for library in catalog.iter().filter(|s| s.is_library() && s.enabled) {
		map.entry(library.name.as_str())
			.or_insert(library.code.as_str());
	}

	map
}

/// Wrap library source as an immediately invoked function expression.
fn wrap_library(code: &str) -> String {
	format!("(function() {{\n{code}\n}})()")
}

/// Turn an import specifier list into a destructuring pattern body.
///
/// `a, b as c` becomes `a, b: c`.
fn destructure_bindings(named: &str) -> String {
	named
		.split(',')
		.map(str::trim)
		.filter(|binding| !binding.is_empty())
		.map(|binding| match binding.split_once(" as ") {
			Some((imported, local)) => format!("{}: {}", imported.trim(), local.trim()),
			None => binding.to_string(),
		})
		.collect::<Vec<_>>()
		.join(", ")
}

/// Replace every supported import statement with an inline binding.
pub fn resolve_imports(code: &str, libraries: &LibraryMap) -> String {
	IMPORT_STATEMENT
		.replace_all(code, |caps: &Captures| {
			let indent = &caps["indent"];
			let lib_name = &caps["lib"];

			let Some(lib_code) = libraries.get(lib_name) else {
				tracing::warn!("library not found: {lib_name}");
				return format!("{indent}/* barescript: library \"{lib_name}\" not found */");
			};

			let binding = match caps.name("default") {
				Some(name) => name.as_str().to_string(),
				None => {
					let named = caps.name("named").map_or("", |m| m.as_str());
					format!("{{ {} }}", destructure_bindings(named))
				}
			};

			format!("{indent}const {binding} = {};", wrap_library(lib_code))
		})
		.into_owned()
}
