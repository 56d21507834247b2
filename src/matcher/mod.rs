//! URL match patterns and userscript header parsing.
//!
//! This module handles:
//! - Compiling `scheme://host/path` match patterns into anchored regexes
//! - Testing URLs against one or many patterns (malformed patterns never match)
//! - Extracting `@match`, `@name` and `@run-at` directives from script headers

pub mod metadata;
pub mod pattern;

pub use metadata::{ScriptMetadata, parse_match_metadata, parse_metadata};
pub use pattern::{ALL_URLS, MatchPattern, compile, matches, matches_any};
