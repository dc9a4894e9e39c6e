//! Locating live popup pages.
//!
//! A popup can open at any moment relative to the caller: before it starts
//! looking, between its initial scan and its event subscription, or long
//! after. [`resolve_page`] covers every case by scanning first, then racing a
//! page-created subscription against a periodic re-scan under one deadline.
//! The event branch gives low latency; the polling branch catches pages the
//! subscription could never see (opened in the gap, lagged out of the channel,
//! or announced before their URL settled).

use std::time::Duration;

use testkit_protocol::{LoadState, Viewport};
use tokio::time::Instant;
use tracing::debug;

use crate::driver::{BrowserSession, PageRef, is_live_match};
use crate::error::{Error, Result};
use crate::url_pattern::UrlPattern;

/// Default overall lookup deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default interval between page re-scans.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Default bound on the best-effort load-state wait.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for [`resolve_page`].
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOptions {
	/// Overall deadline for finding a page.
	pub timeout: Duration,
	/// Interval between re-scans of the session's pages.
	pub poll_interval: Duration,
	/// Viewport to apply once a page is found.
	pub viewport: Option<Viewport>,
	/// Load state to wait for once a page is found.
	pub load_state: LoadState,
	/// Bound on the load-state wait.
	pub load_timeout: Duration,
}

impl Default for WaitOptions {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_TIMEOUT,
			poll_interval: DEFAULT_POLL_INTERVAL,
			viewport: None,
			load_state: LoadState::DomContentLoaded,
			load_timeout: DEFAULT_LOAD_TIMEOUT,
		}
	}
}

impl WaitOptions {
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}

	pub fn with_viewport(mut self, viewport: Viewport) -> Self {
		self.viewport = Some(viewport);
		self
	}
}

/// Returns the first open page whose URL matches `pattern`.
pub fn find_live_page(session: &dyn BrowserSession, pattern: &UrlPattern) -> Option<PageRef> {
	session.pages().into_iter().find(|page| is_live_match(page.as_ref(), pattern))
}

/// Returns the most recently opened page whose URL matches `pattern`.
///
/// After a popup is torn down and replaced, the replacement is the newest
/// match.
pub fn find_latest_live_page(session: &dyn BrowserSession, pattern: &UrlPattern) -> Option<PageRef> {
	session.pages().into_iter().rev().find(|page| is_live_match(page.as_ref(), pattern))
}

/// Finds a live page matching `pattern`, waiting up to `options.timeout`.
///
/// The returned page was open when selected, has had a best-effort wait for
/// `options.load_state`, and has `options.viewport` applied if one is set.
/// Neither of those steps can fail the lookup.
///
/// # Errors
///
/// [`Error::PageNotFound`] if no live match appears before the deadline.
pub async fn resolve_page(session: &dyn BrowserSession, pattern: &UrlPattern, options: &WaitOptions) -> Result<PageRef> {
	let page = match find_live_page(session, pattern) {
		Some(page) => {
			debug!(target = "testkit", url = %page.url(), "found existing page");
			page
		}
		None => race_for_page(session, pattern, options).await?,
	};
	prepare_page(&page, options).await;
	Ok(page)
}

async fn race_for_page(session: &dyn BrowserSession, pattern: &UrlPattern, options: &WaitOptions) -> Result<PageRef> {
	let started = Instant::now();
	let mut events = session.page_events();

	let from_events = async {
		loop {
			match events.recv().await {
				Some(page) if is_live_match(page.as_ref(), pattern) => return page,
				Some(_) => continue,
				// Subscription is gone; polling still runs.
				None => return std::future::pending::<PageRef>().await,
			}
		}
	};

	let from_polling = async {
		loop {
			tokio::time::sleep(options.poll_interval).await;
			if let Some(page) = find_live_page(session, pattern) {
				return page;
			}
		}
	};

	let race = async {
		tokio::select! {
			page = from_events => (page, "event"),
			page = from_polling => (page, "poll"),
		}
	};

	match tokio::time::timeout(options.timeout, race).await {
		Ok((page, via)) => {
			debug!(
				target = "testkit",
				url = %page.url(),
				via,
				elapsed_ms = started.elapsed().as_millis() as u64,
				"page appeared"
			);
			Ok(page)
		}
		Err(_) => {
			debug!(target = "testkit", pattern = %pattern, "no matching page before deadline");
			Err(Error::PageNotFound {
				pattern: pattern.to_string(),
				timeout_ms: options.timeout.as_millis() as u64,
			})
		}
	}
}

/// Waits for the load state and applies the viewport, ignoring failures.
///
/// Each step is also cut off after `load_timeout`, whether or not the driver
/// honours the timeout it is handed. A popup that closes or stalls here is
/// reported by whatever uses it next.
pub async fn prepare_page(page: &PageRef, options: &WaitOptions) {
	let load = page.wait_for_load_state(options.load_state, options.load_timeout);
	match tokio::time::timeout(options.load_timeout, load).await {
		Ok(Ok(())) => {}
		Ok(Err(err)) => debug!(target = "testkit", error = %err, state = %options.load_state, "load state wait failed"),
		Err(_) => debug!(target = "testkit", state = %options.load_state, "load state wait stalled"),
	}
	if let Some(viewport) = options.viewport {
		match tokio::time::timeout(options.load_timeout, page.set_viewport(viewport)).await {
			Ok(Ok(())) => {}
			Ok(Err(err)) => debug!(target = "testkit", error = %err, "viewport update failed"),
			Err(_) => debug!(target = "testkit", "viewport update stalled"),
		}
	}
}
