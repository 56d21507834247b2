use crate::catalog::scripts::{
	SCRIPTS_KEY, get_all_scripts, get_start_scripts, is_extension_enabled, set_start_scripts,
};
use crate::catalog::store::{KeyValueStore, StorageChange};
use crate::catalog::types::{PreparedScript, RunAt, UserScript};
use crate::config::types::InjectionConfig;
use crate::error::Result;
use crate::inject::executor::{Injection, InjectionTarget, ScriptExecutor, WrapOptions, inject_all};
use crate::inject::imports::{LibraryMap, library_map, resolve_imports};
use crate::inject::policy::{has_candidates, is_excluded_url, matching_scripts, select_candidates};
use crate::matcher::matches_any;
use crate::protocol::{Message, Response};

/// Something the host delivered to the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	/// A tab finished loading `url`.
	NavigationCompleted { target: InjectionTarget, url: String },

	/// The key-value store changed.
	StorageChanged(StorageChange),

	/// A message arrived, from a tab or from the management UI.
	Message {
		sender: Option<InjectionTarget>,
		message: Message,
	},
}

/// Coordinates the two injection phases over a store and an executor.
///
/// Document-start scripts are resolved whenever the catalog changes and
/// replayed from the store on each page; document-end scripts are resolved
/// when the page finishes loading. Nothing is cached in memory between events.
#[derive(Debug)]
pub struct Background<S, E> {
	store: S,
	executor: E,
	config: InjectionConfig,
}

/// Resolve a script's imports into an executor payload.
pub fn prepare(script: &UserScript, libraries: &LibraryMap) -> Injection {
	Injection {
		name: script.name.clone(),
		source: resolve_imports(&script.code, libraries),
	}
}

impl<S: KeyValueStore, E: ScriptExecutor> Background<S, E> {
	pub fn new(store: S, executor: E, config: InjectionConfig) -> Self {
		Background {
			store,
			executor,
			config,
		}
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn store_mut(&mut self) -> &mut S {
		&mut self.store
	}

	pub fn executor(&self) -> &E {
		&self.executor
	}

	pub fn config(&self) -> &InjectionConfig {
		&self.config
	}

	/// Dispatch a host event. Only messages produce a response.
	pub fn handle_event(&mut self, event: Event) -> Result<Option<Response>> {
		match event {
			Event::NavigationCompleted { target, url } => {
				self.on_navigation_complete(target, &url)?;
				Ok(None)
			}
			Event::StorageChanged(change) => {
				self.on_storage_changed(&change)?;
				Ok(None)
			}
			Event::Message { sender, message } => self.handle_message(sender, message).map(Some),
		}
	}

	/// Recompute the start-phase cache when the catalog changed.
	///
	/// Returns whether the cache was refreshed.
	pub fn on_storage_changed(&mut self, change: &StorageChange) -> Result<bool> {
		if !change.touches(SCRIPTS_KEY) {
			return Ok(false);
		}

		self.refresh_start_cache()?;
		Ok(true)
	}

	/// Resolve every enabled document-start script and store the result.
	pub fn refresh_start_cache(&mut self) -> Result<usize> {
		let catalog = get_all_scripts(&self.store)?;
		let libraries = library_map(&catalog);

		let prepared: Vec<PreparedScript> = catalog
			.iter()
			.filter(|s| !s.is_library() && s.enabled && s.run_at == RunAt::DocumentStart)
			.map(|s| PreparedScript {
				id: s.id.clone(),
				name: s.name.clone(),
				matches: s.matches.clone(),
				code: resolve_imports(&s.code, &libraries),
			})
			.collect();

		set_start_scripts(&mut self.store, &prepared)?;
		tracing::info!("start cache refreshed with {} scripts", prepared.len());

		Ok(prepared.len())
	}

	/// Check the global switch and the excluded prefixes.
	fn should_inject(&self, url: &str) -> Result<bool> {
		if is_excluded_url(url, &self.config.excluded_prefixes) {
			tracing::debug!("skipping excluded url {url}");
			return Ok(false);
		}

		is_extension_enabled(&self.store)
	}

	/// Inject document-end scripts once a page has finished loading.
	///
	/// Returns how many scripts the executor accepted.
	pub fn on_navigation_complete(&mut self, target: InjectionTarget, url: &str) -> Result<usize> {
		if !self.should_inject(url)? {
			return Ok(0);
		}

		let catalog = get_all_scripts(&self.store)?;
		let libraries = library_map(&catalog);

		let injections: Vec<Injection> =
			select_candidates(&catalog, url, RunAt::DocumentEnd)
				.into_iter()
				.map(|script| prepare(script, &libraries))
				.collect();

		let options = WrapOptions::for_phase(&self.config, RunAt::DocumentEnd);
		Ok(inject_all(&mut self.executor, target, &injections, &options))
	}

	/// Replay cached document-start scripts matching `url`.
	pub fn on_document_start(&mut self, target: InjectionTarget, url: &str) -> Result<usize> {
		if !self.should_inject(url)? {
			return Ok(0);
		}

		let injections: Vec<Injection> = get_start_scripts(&self.store)?
			.into_iter()
			.filter(|prepared| matches_any(url, &prepared.matches))
			.map(|prepared| Injection {
				name: prepared.name,
				source: prepared.code,
			})
			.collect();

		let options = WrapOptions::for_phase(&self.config, RunAt::DocumentStart);
		Ok(inject_all(&mut self.executor, target, &injections, &options))
	}

	/// Answer a request on the messaging channel.
	pub fn handle_message(
		&mut self,
		sender: Option<InjectionTarget>,
		message: Message,
	) -> Result<Response> {
		match message {
			Message::GetMatchingScripts { url } => {
				let catalog = get_all_scripts(&self.store)?;
				let scripts = matching_scripts(&catalog, &url)
					.into_iter()
					.cloned()
					.collect();
				Ok(Response::Scripts(scripts))
			}
			Message::CheckHasScripts { url } => {
				let has_scripts = self.should_inject(&url)?
					&& has_candidates(&get_all_scripts(&self.store)?, &url);
				Ok(Response::HasScripts { has_scripts })
			}
			Message::BodyReady { url } => {
				let injected = match sender {
					Some(target) => self.on_document_start(target, &url)?,
					None => {
						tracing::warn!("body ready signal without a sender tab for {url}");
						0
					}
				};
				Ok(Response::Injected { injected })
			}
		}
	}
}
