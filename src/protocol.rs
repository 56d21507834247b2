//! Messages exchanged between the page side, the management UI and the background.

use crate::catalog::types::UserScript;
use serde::{Deserialize, Serialize};

/// Request sent to the background coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
	/// Scripts whose patterns match the URL, for the popup.
	GetMatchingScripts { url: String },

	/// Whether any enabled script will run on the URL.
	CheckHasScripts { url: String },

	/// The page has a document element; replay document-start scripts.
	BodyReady { url: String },
}

/// Reply to a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
	Scripts(Vec<UserScript>),

	HasScripts {
		#[serde(rename = "hasScripts")]
		has_scripts: bool,
	},

	Injected { injected: usize },
}
