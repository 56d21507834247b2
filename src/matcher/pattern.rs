use crate::error::{BarescriptError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Token that matches every http and https URL.
pub const ALL_URLS: &str = "<all_urls>";

/// Grammar of a match pattern: `scheme://host[/path]`.
#[allow(clippy::expect_used)]
static PATTERN_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(\*|https?)://(\*|(?:\*\.)?[^/]+)(/.*)?$").expect("valid regex pattern")
});

/// A match pattern compiled to a fully anchored regex.
#[derive(Debug, Clone)]
pub struct MatchPattern {
	/// The pattern as written by the user.
	source: String,

	/// Anchored expansion of the pattern.
	regex: Regex,
}

impl MatchPattern {
	/// Compile a match pattern string.
	///
	/// Accepts `<all_urls>` or `scheme://host[/path]` where:
	/// - `scheme` is `*` (http or https), `http` or `https`
	/// - `host` is `*`, `*.domain` (the domain itself or any subdomain) or a literal
	/// - `path` defaults to `/*`
	///
	/// Any other `*` is a wildcard within its segment; every other character is literal.
	pub fn compile(pattern: &str) -> Result<Self> {
		if pattern == ALL_URLS {
			return Self::from_expansion(pattern, r"^https?://.*$".to_string());
		}

		let caps = PATTERN_GRAMMAR
			.captures(pattern)
			.ok_or_else(|| BarescriptError::InvalidPattern {
				pattern: pattern.to_string(),
				reason: "expected <all_urls> or scheme://host/path".to_string(),
			})?;

		let scheme = &caps[1];
		let host = &caps[2];
		let path = caps.get(3).map_or("/*", |m| m.as_str());

		let mut expansion = String::from("^");

		if scheme == "*" {
			expansion.push_str("https?");
		} else {
			expansion.push_str(&regex::escape(scheme));
		}
		expansion.push_str("://");

		if host == "*" {
			expansion.push_str("[^/]+");
		} else if let Some(base_domain) = host.strip_prefix("*.") {
			expansion.push_str(r"(?:[^/]+\.)?");
			expansion.push_str(&escape_with_wildcards(base_domain, "[^/]*"));
		} else {
			expansion.push_str(&escape_with_wildcards(host, "[^/]*"));
		}

		expansion.push_str(&escape_with_wildcards(path, ".*"));
		expansion.push('$');

		Self::from_expansion(pattern, expansion)
	}

	fn from_expansion(pattern: &str, expansion: String) -> Result<Self> {
		let regex = Regex::new(&expansion).map_err(|e| BarescriptError::InvalidPattern {
			pattern: pattern.to_string(),
			reason: e.to_string(),
		})?;

		Ok(MatchPattern {
			source: pattern.to_string(),
			regex,
		})
	}

	/// The pattern string this matcher was compiled from.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// The anchored regex the pattern expands to.
	pub fn regex(&self) -> &Regex {
		&self.regex
	}

	/// Check whether the whole URL matches this pattern.
	pub fn is_match(&self, url: &str) -> bool {
		self.regex.is_match(url)
	}
}

/// Escape a segment literally, turning each `*` into `wildcard`.
fn escape_with_wildcards(segment: &str, wildcard: &str) -> String {
	segment
		.split('*')
		.map(regex::escape)
		.collect::<Vec<_>>()
		.join(wildcard)
}

/// Compile a match pattern string.
pub fn compile(pattern: &str) -> Result<MatchPattern> {
	MatchPattern::compile(pattern)
}

/// Check a URL against one pattern.
///
/// Malformed patterns never match.
pub fn matches(url: &str, pattern: &str) -> bool {
	match MatchPattern::compile(pattern) {
		Ok(compiled) => compiled.is_match(url),
		Err(e) => {
			tracing::debug!("{e}");
			false
		}
	}
}

/// Check a URL against a set of patterns. First match wins.
pub fn matches_any<S: AsRef<str>>(url: &str, patterns: &[S]) -> bool {
	patterns.iter().any(|p| matches(url, p.as_ref()))
}
