use crate::catalog::types::RunAt;
use crate::config::types::InjectionConfig;
use crate::error::Result;
use serde_json::Value;

/// Id of the style element the content side uses to blur a page while it loads.
pub const BLUR_STYLE_ID: &str = "barescript-blur";

/// The tab a payload is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InjectionTarget {
	pub tab_id: u32,
}

/// Host capability that runs source text in a page's main world.
pub trait ScriptExecutor {
	/// Run `source` in the page. The payload is opaque to the host.
	fn execute(&mut self, target: InjectionTarget, source: &str) -> Result<()>;
}

/// DOM quiescence gate applied before a script body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleWait {
	/// Milliseconds without mutations that count as idle.
	pub quiet_ms: u64,

	/// Give up waiting after this many milliseconds.
	pub timeout_ms: u64,
}

/// How a resolved script is wrapped before handoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WrapOptions {
	pub idle_wait: Option<IdleWait>,
	pub remove_blur: bool,
}

impl WrapOptions {
	/// Options for a lifecycle phase.
	///
	/// Document-start scripts never wait for DOM idle.
	pub fn for_phase(config: &InjectionConfig, phase: RunAt) -> Self {
		let idle_wait = (config.idle_wait && phase == RunAt::DocumentEnd).then_some(IdleWait {
			quiet_ms: config.idle_quiet_ms,
			timeout_ms: config.idle_timeout_ms,
		});

		WrapOptions {
			idle_wait,
			remove_blur: config.blur_while_loading,
		}
	}
}

/// A script whose source is ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
	/// Display name, used for log correlation.
	pub name: String,

	/// Import-resolved source text.
	pub source: String,
}

/// The diagnostic tag for a script.
pub fn banner_tag(name: &str) -> String {
	format!("[userscript:{name}]")
}

/// Quote a string as a JavaScript string literal.
fn js_string(s: &str) -> String {
	Value::String(s.to_string()).to_string()
}

fn idle_prelude(wait: IdleWait, tag: &str) -> String {
	format!(
		r#"  function waitForIdleDOM({{ quietMs, timeout }}) {{
    return new Promise((resolve, reject) => {{
      let timer = null;
      const done = () => {{ cleanup(); resolve(); }};
      const fail = () => {{ cleanup(); reject(new Error("Timeout waiting for DOM idle")); }};
      const obs = new MutationObserver(() => {{
        clearTimeout(timer);
        timer = setTimeout(done, quietMs);
      }});
      const cleanup = () => {{
        obs.disconnect();
        clearTimeout(timer);
        clearTimeout(deadline);
      }};
      obs.observe(document, {{ childList: true, subtree: true, attributes: true }});
      timer = setTimeout(done, quietMs);
      const deadline = setTimeout(fail, timeout);
    }});
  }}
  try {{
    await waitForIdleDOM({{ quietMs: {quiet}, timeout: {timeout} }});
  }} catch (e) {{
    console.warn({warning});
  }}
"#,
		quiet = wait.quiet_ms,
		timeout = wait.timeout_ms,
		warning = js_string(&format!("{tag} DOM idle timeout")),
	)
}

/// Wrap resolved source with the diagnostic banner and optional readiness gates.
pub fn wrap_script(name: &str, code: &str, options: &WrapOptions) -> String {
	let tag = banner_tag(name);
	let mut wrapped = String::from("(async function() {\n");

	if let Some(wait) = options.idle_wait {
		wrapped.push_str(&idle_prelude(wait, &tag));
	}

	if options.remove_blur {
		wrapped.push_str(&format!(
			"  const blurStyle = document.getElementById({});\n  if (blurStyle) blurStyle.remove();\n",
			js_string(BLUR_STYLE_ID)
		));
	}

	wrapped.push_str(&format!(
		"  console.log({});\n",
		js_string(&format!("{tag} loaded"))
	));
	wrapped.push_str(code);
	wrapped.push_str("\n})();\n");

	wrapped
}

/// Wrap and hand one script to the executor.
///
/// Failures are logged and reported as `false`; they never propagate.
pub fn inject<E: ScriptExecutor + ?Sized>(
	executor: &mut E,
	target: InjectionTarget,
	injection: &Injection,
	options: &WrapOptions,
) -> bool {
	let payload = wrap_script(&injection.name, &injection.source, options);

	match executor.execute(target, &payload) {
		Ok(()) => {
			tracing::info!("{} injected into tab {}", banner_tag(&injection.name), target.tab_id);
			true
		}
		Err(e) => {
			tracing::error!("{} injection failed: {e}", banner_tag(&injection.name));
			false
		}
	}
}

/// Inject each script in order. A failure does not stop later scripts.
///
/// Returns how many scripts the executor accepted.
pub fn inject_all<E: ScriptExecutor + ?Sized>(
	executor: &mut E,
	target: InjectionTarget,
	injections: &[Injection],
	options: &WrapOptions,
) -> usize {
	injections
		.iter()
		.filter(|injection| inject(executor, target, injection, options))
		.count()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::BarescriptError;

	#[derive(Default)]
	struct RecordingExecutor {
		payloads: Vec<(u32, String)>,
		fail_on: Option<String>,
	}

	impl ScriptExecutor for RecordingExecutor {
		fn execute(&mut self, target: InjectionTarget, source: &str) -> Result<()> {
			if let Some(ref marker) = self.fail_on
				&& source.contains(marker.as_str())
			{
				return Err(BarescriptError::ExecutionFailed {
					name: marker.clone(),
					reason: "tab closed".to_string(),
				});
			}
			self.payloads.push((target.tab_id, source.to_string()));
			Ok(())
		}
	}

	fn injection(name: &str, source: &str) -> Injection {
		Injection {
			name: name.to_string(),
			source: source.to_string(),
		}
	}

	const TAB: InjectionTarget = InjectionTarget { tab_id: 7 };

	#[test]
	fn test_wrap_plain() {
		let wrapped = wrap_script("Hello", "run();", &WrapOptions::default());
		assert_eq!(
			wrapped,
			"(async function() {\n  console.log(\"[userscript:Hello] loaded\");\nrun();\n})();\n"
		);
	}

	#[test]
	fn test_wrap_escapes_name() {
		let wrapped = wrap_script("Say \"hi\"\n", "run();", &WrapOptions::default());
		assert!(wrapped.contains(r#"console.log("[userscript:Say \"hi\"\n] loaded");"#));
	}

	#[test]
	fn test_wrap_with_idle_and_blur() {
		let options = WrapOptions {
			idle_wait: Some(IdleWait {
				quiet_ms: 250,
				timeout_ms: 4000,
			}),
			remove_blur: true,
		};
		let wrapped = wrap_script("Hello", "run();", &options);

		assert!(wrapped.contains("await waitForIdleDOM({ quietMs: 250, timeout: 4000 });"));
		assert!(wrapped.contains("console.warn(\"[userscript:Hello] DOM idle timeout\");"));
		assert!(wrapped.contains("document.getElementById(\"barescript-blur\")"));

		let idle = wrapped.find("waitForIdleDOM({ quietMs").unwrap();
		let body = wrapped.find("run();").unwrap();
		assert!(idle < body);
	}

	#[test]
	fn test_options_for_phase() {
		let config = InjectionConfig::default();

		let end = WrapOptions::for_phase(&config, RunAt::DocumentEnd);
		assert_eq!(
			end.idle_wait,
			Some(IdleWait {
				quiet_ms: 300,
				timeout_ms: 10_000
			})
		);
		assert!(end.remove_blur);

		let start = WrapOptions::for_phase(&config, RunAt::DocumentStart);
		assert!(start.idle_wait.is_none());

		let no_idle = InjectionConfig {
			idle_wait: false,
			..Default::default()
		};
		assert!(WrapOptions::for_phase(&no_idle, RunAt::DocumentEnd).idle_wait.is_none());
	}

	#[test]
	fn test_inject_all_continues_after_failure() {
		let mut executor = RecordingExecutor {
			fail_on: Some("second();".to_string()),
			..Default::default()
		};
		let injections = vec![
			injection("one", "first();"),
			injection("two", "second();"),
			injection("three", "third();"),
		];

		let injected = inject_all(&mut executor, TAB, &injections, &WrapOptions::default());

		assert_eq!(injected, 2);
		assert_eq!(executor.payloads.len(), 2);
		assert!(executor.payloads[0].1.contains("first();"));
		assert!(executor.payloads[1].1.contains("third();"));
		assert!(executor.payloads.iter().all(|(tab, _)| *tab == 7));
	}

	#[test]
	fn test_inject_reports_success() {
		let mut executor = RecordingExecutor::default();
		assert!(inject(
			&mut executor,
			TAB,
			&injection("one", "first();"),
			&WrapOptions::default()
		));
		assert!(executor.payloads[0].1.contains("[userscript:one] loaded"));
	}
}
