use crate::catalog::types::{RunAt, UserScript};
use crate::matcher::matches_any;

/// Check whether a script should run on `url` during `phase`.
///
/// Libraries never qualify, whatever their `matches` field says.
pub fn is_candidate(script: &UserScript, url: &str, phase: RunAt) -> bool {
	!script.is_library()
		&& script.enabled
		&& script.run_at == phase
		&& matches_any(url, &script.matches)
}

/// Select the scripts to inject for a URL and lifecycle phase, in catalog order.
pub fn select_candidates<'a>(
	catalog: &'a [UserScript],
	url: &str,
	phase: RunAt,
) -> Vec<&'a UserScript> {
	let candidates: Vec<_> = catalog
		.iter()
		.filter(|script| is_candidate(script, url, phase))
		.collect();

	tracing::debug!(
		"{} of {} catalog entries selected for {phase} on {url}",
		candidates.len(),
		catalog.len()
	);

	candidates
}

/// Check whether any enabled script would run on `url`, in either phase.
pub fn has_candidates(catalog: &[UserScript], url: &str) -> bool {
	catalog
		.iter()
		.any(|script| is_candidate(script, url, script.run_at))
}

/// Non-library scripts whose patterns match `url`, enabled or not.
pub fn matching_scripts<'a>(catalog: &'a [UserScript], url: &str) -> Vec<&'a UserScript> {
	catalog
		.iter()
		.filter(|script| !script.is_library() && matches_any(url, &script.matches))
		.collect()
}

/// Check whether a URL belongs to a page that is never injected into.
pub fn is_excluded_url<S: AsRef<str>>(url: &str, excluded_prefixes: &[S]) -> bool {
	excluded_prefixes
		.iter()
		.any(|prefix| url.starts_with(prefix.as_ref()))
}
