//! Browser driver seam.
//!
//! The browser automation library is an external collaborator. These traits
//! cover the subset of it popup synchronization needs:
//! - [`Page`]: one browser tab or popup window
//! - [`BrowserSession`]: the context that owns pages and announces new ones
//!
//! Implement them over a real automation client, or use
//! [`memory`](crate::memory) in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use testkit_protocol::{LoadState, Viewport};

use crate::error::DriverResult;
use crate::events::PageEvents;
use crate::url_pattern::UrlPattern;

/// Shared handle to a page.
pub type PageRef = Arc<dyn Page>;

/// Operations on a single page.
///
/// Every method may be called after the page closed; implementations report
/// that as a closed-target [`DriverError`](crate::DriverError) rather than
/// panicking.
#[async_trait]
pub trait Page: Send + Sync {
	/// Driver-assigned identifier, stable for the page's lifetime.
	fn guid(&self) -> &str;

	/// Returns the current URL of the page.
	fn url(&self) -> String;

	/// Returns true once the page has closed. Never errors.
	fn is_closed(&self) -> bool;

	/// Waits until the page reaches `state`.
	async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> DriverResult<()>;

	/// Resizes the page's viewport.
	async fn set_viewport(&self, viewport: Viewport) -> DriverResult<()>;

	/// Returns whether `text` is currently rendered and visible.
	///
	/// Matching is by substring, the way a non-exact text locator matches.
	async fn is_text_visible(&self, text: &str) -> DriverResult<bool>;

	/// Clicks the first element matching `selector`.
	async fn click(&self, selector: &str) -> DriverResult<()>;

	/// Fills the input matching `selector` with `value`.
	async fn fill(&self, selector: &str, value: &str) -> DriverResult<()>;

	/// Waits until the page URL matches `pattern`.
	async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> DriverResult<()>;
}

/// A browser context: the set of open pages plus page-created events.
pub trait BrowserSession: Send + Sync {
	/// Pages currently known to the session, oldest first.
	///
	/// May include pages that closed a moment ago; callers check
	/// [`Page::is_closed`] before using one.
	fn pages(&self) -> Vec<PageRef>;

	/// Subscribes to pages opened from now on.
	fn page_events(&self) -> PageEvents;
}

/// Returns true if the page is open and its URL satisfies `pattern`.
pub fn is_live_match(page: &dyn Page, pattern: &UrlPattern) -> bool {
	!page.is_closed() && pattern.matches(&page.url())
}
