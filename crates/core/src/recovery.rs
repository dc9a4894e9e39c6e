//! One-shot retry for actions whose popup went stale.
//!
//! Wallet extensions sometimes tear a notification popup down and reopen it
//! while a test is interacting with it. The first page handle then fails with
//! a closed-target error even though an equivalent page is now open.
//! [`StaleWindowRecovery`] waits for the replacement to settle, picks the
//! newest live match, and runs the action once more on it.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::driver::{BrowserSession, PageRef};
use crate::error::{Error, Result};
use crate::url_pattern::UrlPattern;
use crate::waiter::{WaitOptions, find_latest_live_page, prepare_page};

/// Default pause before looking for a replacement popup.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Runs an action against a popup with a single stale-page retry.
pub struct StaleWindowRecovery<'a> {
	session: &'a dyn BrowserSession,
	pattern: &'a UrlPattern,
	settle_delay: Duration,
	prepare: WaitOptions,
}

impl<'a> StaleWindowRecovery<'a> {
	pub fn new(session: &'a dyn BrowserSession, pattern: &'a UrlPattern) -> Self {
		Self {
			session,
			pattern,
			settle_delay: DEFAULT_SETTLE_DELAY,
			prepare: WaitOptions::default(),
		}
	}

	pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
		self.settle_delay = settle_delay;
		self
	}

	/// Load state and viewport applied to the replacement page.
	pub fn with_wait_options(mut self, options: WaitOptions) -> Self {
		self.prepare = options;
		self
	}

	/// Resolves a page with `resolve`, then runs `action` on it.
	///
	/// If the action fails with a closed-target error, waits the settle delay,
	/// re-scans for the newest live page matching the pattern, prepares it,
	/// and runs `action` exactly once more. Any other error, or an error from
	/// `resolve`, is returned as is.
	///
	/// # Errors
	///
	/// [`Error::StaleTarget`] carrying both errors when no replacement page
	/// exists or the retry fails too.
	pub async fn run<T, R, A, Fut>(&self, resolve: R, mut action: A) -> Result<T>
	where
		R: Future<Output = Result<PageRef>>,
		A: FnMut(PageRef) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let page = resolve.await?;
		let original = match action(page).await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_target_closed() => err,
			Err(err) => return Err(err),
		};

		warn!(
			target = "testkit",
			error = %original,
			settle_ms = self.settle_delay.as_millis() as u64,
			"notification page went stale, retrying on a fresh page"
		);
		tokio::time::sleep(self.settle_delay).await;

		let Some(fresh) = find_latest_live_page(self.session, self.pattern) else {
			return Err(Error::StaleTarget {
				original: Box::new(original),
				retry: Box::new(Error::PageNotFound {
					pattern: self.pattern.to_string(),
					timeout_ms: self.settle_delay.as_millis() as u64,
				}),
			});
		};

		debug!(target = "testkit", url = %fresh.url(), guid = fresh.guid(), "retrying on replacement page");
		prepare_page(&fresh, &self.prepare).await;

		action(fresh).await.map_err(|retry| Error::StaleTarget {
			original: Box::new(original),
			retry: Box::new(retry),
		})
	}
}
