//! Barescript - a lightweight userscript manager core.
//!
//! This library provides the pieces behind a userscript extension, including:
//! - URL match pattern compilation and header metadata parsing
//! - The script catalog over a host key-value store
//! - Candidate selection, library import inlining and injection handoff
//! - Two-phase (document-start / document-end) scheduling
//!
//! # Example
//!
//! ```no_run
//! use barescript::catalog::{MemoryStore, ScriptKind, UserScript, save_script};
//! use barescript::config::InjectionConfig;
//! use barescript::inject::{Background, InjectionTarget, ScriptExecutor};
//!
//! struct PrintExecutor;
//!
//! impl ScriptExecutor for PrintExecutor {
//!     fn execute(&mut self, _target: InjectionTarget, source: &str) -> barescript::Result<()> {
//!         println!("{source}");
//!         Ok(())
//!     }
//! }
//!
//! let mut store = MemoryStore::new();
//! let code = "// ==UserScript==\n// @match *://*/*\n// ==/UserScript==\nconsole.log('hi');";
//! save_script(&mut store, UserScript::from_source(code, ScriptKind::Script)).unwrap();
//!
//! let mut background = Background::new(store, PrintExecutor, InjectionConfig::default());
//! let target = InjectionTarget { tab_id: 1 };
//! background.on_navigation_complete(target, "https://example.com/").unwrap();
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod inject;
pub mod matcher;
pub mod protocol;

pub use error::{BarescriptError, Result};
