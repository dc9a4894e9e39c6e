//! Per-wallet popup state.
//!
//! [`WalletSession`] owns the single-slot notification page cache. The slot
//! holds the page that classification just looked at, so the action that
//! follows runs on the same window instead of searching again. An entry is
//! consumed by the first lookup that finds it still open, and is never served
//! once closed.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use testkit_protocol::NotificationType;
use tracing::debug;

use crate::classify::{ClassifyOptions, SignatureTable, classify};
use crate::driver::{BrowserSession, PageRef};
use crate::error::Result;
use crate::recovery::{DEFAULT_SETTLE_DELAY, StaleWindowRecovery};
use crate::url_pattern::UrlPattern;
use crate::waiter::{WaitOptions, resolve_page};

/// Where notification popups live and how long to wait for them.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
	pub pattern: UrlPattern,
	pub wait: WaitOptions,
	pub classify: ClassifyOptions,
	pub settle_delay: Duration,
}

impl NotificationSettings {
	pub fn new(pattern: UrlPattern) -> Self {
		Self {
			pattern,
			wait: WaitOptions::default(),
			classify: ClassifyOptions::default(),
			settle_delay: DEFAULT_SETTLE_DELAY,
		}
	}
}

/// Browser session plus the cached notification page.
pub struct WalletSession {
	browser: Arc<dyn BrowserSession>,
	settings: NotificationSettings,
	cached: Mutex<Option<PageRef>>,
}

impl WalletSession {
	pub fn new(browser: Arc<dyn BrowserSession>, settings: NotificationSettings) -> Self {
		Self {
			browser,
			settings,
			cached: Mutex::new(None),
		}
	}

	pub fn browser(&self) -> &Arc<dyn BrowserSession> {
		&self.browser
	}

	pub fn settings(&self) -> &NotificationSettings {
		&self.settings
	}

	/// Returns true if a page is cached, open or not.
	pub fn has_cached_page(&self) -> bool {
		self.cached.lock().is_some()
	}

	pub fn clear_cached_page(&self) {
		self.cached.lock().take();
	}

	fn take_cached_page(&self) -> Option<PageRef> {
		let page = self.cached.lock().take()?;
		if page.is_closed() {
			debug!(target = "testkit", guid = page.guid(), "discarding closed cached page");
			return None;
		}
		Some(page)
	}

	/// Returns the cached page if still open, otherwise resolves a new one.
	///
	/// Either way the cache is empty afterwards.
	pub async fn notification_page(&self) -> Result<PageRef> {
		if let Some(page) = self.take_cached_page() {
			debug!(target = "testkit", guid = page.guid(), "using cached notification page");
			return Ok(page);
		}
		resolve_page(self.browser.as_ref(), &self.settings.pattern, &self.settings.wait).await
	}

	/// Finds the current popup, classifies it, and caches it on success.
	///
	/// Any previously cached page is dropped first; a classification never
	/// reuses an older popup.
	pub async fn identify_notification(&self, table: &SignatureTable) -> Result<NotificationType> {
		self.clear_cached_page();
		let page = resolve_page(self.browser.as_ref(), &self.settings.pattern, &self.settings.wait).await?;
		let kind = classify(page.as_ref(), table, &self.settings.classify).await?;
		*self.cached.lock() = Some(page);
		Ok(kind)
	}

	/// Runs `action` on the notification page.
	pub async fn with_notification_page<T, A, Fut>(&self, action: A) -> Result<T>
	where
		A: FnOnce(PageRef) -> Fut,
		Fut: std::future::Future<Output = Result<T>>,
	{
		let page = self.notification_page().await?;
		action(page).await
	}

	/// Runs `action` on the notification page with one stale-page retry.
	pub async fn with_recovery<T, A, Fut>(&self, action: A) -> Result<T>
	where
		A: FnMut(PageRef) -> Fut,
		Fut: std::future::Future<Output = Result<T>>,
	{
		StaleWindowRecovery::new(self.browser.as_ref(), &self.settings.pattern)
			.with_settle_delay(self.settings.settle_delay)
			.with_wait_options(self.settings.wait.clone())
			.run(self.notification_page(), action)
			.await
	}
}
