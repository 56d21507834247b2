//! Script selection, library inlining and injection for barescript.
//!
//! This module handles:
//! - Choosing which scripts run for a URL and lifecycle phase
//! - Inlining library imports into script source
//! - Wrapping resolved source and handing it to the host executor
//! - Coordinating the document-start and document-end phases

pub mod background;
pub mod executor;
pub mod imports;
pub mod policy;

pub use background::{Background, Event, prepare};
pub use executor::{
	BLUR_STYLE_ID, IdleWait, Injection, InjectionTarget, ScriptExecutor, WrapOptions, banner_tag,
	inject, inject_all, wrap_script,
};
pub use imports::{LibraryMap, library_map, resolve_imports};
pub use policy::{
	has_candidates, is_candidate, is_excluded_url, matching_scripts, select_candidates,
};
