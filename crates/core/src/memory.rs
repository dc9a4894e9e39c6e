//! In-process browser driver for tests.
//!
//! [`MemorySession`] and [`MemoryPage`] implement the [`driver`](crate::driver)
//! traits without a browser. Tests script the popup lifecycle directly: open
//! pages (with or without a page-created event), change URLs, reveal text,
//! close pages, and queue failures for the next interaction. Every
//! interaction is recorded for assertions.
//!
//! ```ignore
//! let session = MemorySession::new();
//! let popup = session.open_page_after(Duration::from_millis(500), POPUP_URL);
//! let page = resolve_page(&session, &pattern, &WaitOptions::default()).await?;
//! ```

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use testkit_protocol::{LoadState, Viewport};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::driver::{BrowserSession, Page, PageRef};
use crate::error::{DriverError, DriverResult};
use crate::events::{EventBus, PageEvents};
use crate::url_pattern::UrlPattern;

const URL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Interaction recorded by [`MemoryPage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
	LoadState(LoadState),
	Viewport(Viewport),
	Click { selector: String },
	Fill { selector: String, value: String },
	WaitForUrl { pattern: String },
}

/// Scriptable in-memory page.
pub struct MemoryPage {
	guid: String,
	url: Mutex<String>,
	closed: AtomicBool,
	visible: Mutex<BTreeSet<String>>,
	viewport: Mutex<Option<Viewport>>,
	failures: Mutex<VecDeque<DriverError>>,
	interactions: Mutex<Vec<Interaction>>,
}

impl MemoryPage {
	pub fn new(guid: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			guid: guid.into(),
			url: Mutex::new(url.into()),
			closed: AtomicBool::new(false),
			visible: Mutex::new(BTreeSet::new()),
			viewport: Mutex::new(None),
			failures: Mutex::new(VecDeque::new()),
			interactions: Mutex::new(Vec::new()),
		}
	}

	/// Navigates the page without any load events.
	pub fn set_url(&self, url: &str) {
		*self.url.lock() = url.to_string();
	}

	pub fn close(&self) {
		self.closed.store(true, Ordering::SeqCst);
	}

	/// Renders `text` so visibility checks containing it succeed.
	pub fn show_text(&self, text: &str) {
		self.visible.lock().insert(text.to_string());
	}

	pub fn hide_text(&self, text: &str) {
		self.visible.lock().remove(text);
	}

	/// Renders `text` after `delay`.
	pub fn show_text_after(self: &Arc<Self>, delay: Duration, text: &str) -> JoinHandle<()> {
		let page = Arc::clone(self);
		let text = text.to_string();
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			page.show_text(&text);
		})
	}

	/// Closes the page after `delay`.
	pub fn close_after(self: &Arc<Self>, delay: Duration) -> JoinHandle<()> {
		let page = Arc::clone(self);
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			page.close();
		})
	}

	/// Queues `error` as the outcome of the next click, fill, or URL wait.
	pub fn fail_next(&self, error: DriverError) {
		self.failures.lock().push_back(error);
	}

	/// Queues a closed-target failure and closes the page when it fires.
	///
	/// Models a popup torn down by the extension while an action runs.
	pub fn close_on_next_action(&self) {
		self.fail_next(DriverError::TargetClosed {
			target: "page".to_string(),
			operation: "interact".to_string(),
		});
	}

	pub fn viewport(&self) -> Option<Viewport> {
		*self.viewport.lock()
	}

	/// Returns all recorded interactions.
	pub fn interactions(&self) -> Vec<Interaction> {
		self.interactions.lock().clone()
	}

	/// Returns the selectors clicked so far, in order.
	pub fn clicks(&self) -> Vec<String> {
		self.interactions
			.lock()
			.iter()
			.filter_map(|i| match i {
				Interaction::Click { selector } => Some(selector.clone()),
				_ => None,
			})
			.collect()
	}

	fn record(&self, interaction: Interaction) {
		self.interactions.lock().push(interaction);
	}

	fn ensure_open(&self, operation: &str) -> DriverResult<()> {
		if self.is_closed() {
			return Err(DriverError::TargetClosed {
				target: "page".to_string(),
				operation: operation.to_string(),
			});
		}
		Ok(())
	}

	/// Fires a queued failure, if any. Closed-target failures close the page.
	fn take_failure(&self) -> DriverResult<()> {
		match self.failures.lock().pop_front() {
			Some(err) => {
				if err.is_target_closed() {
					self.close();
				}
				Err(err)
			}
			None => Ok(()),
		}
	}
}

#[async_trait]
impl Page for MemoryPage {
	fn guid(&self) -> &str {
		&self.guid
	}

	fn url(&self) -> String {
		self.url.lock().clone()
	}

	fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	async fn wait_for_load_state(&self, state: LoadState, _timeout: Duration) -> DriverResult<()> {
		self.ensure_open("waitForLoadState")?;
		self.record(Interaction::LoadState(state));
		Ok(())
	}

	async fn set_viewport(&self, viewport: Viewport) -> DriverResult<()> {
		self.ensure_open("setViewportSize")?;
		*self.viewport.lock() = Some(viewport);
		self.record(Interaction::Viewport(viewport));
		Ok(())
	}

	async fn is_text_visible(&self, text: &str) -> DriverResult<bool> {
		self.ensure_open("isVisible")?;
		Ok(self.visible.lock().iter().any(|shown| shown.contains(text)))
	}

	async fn click(&self, selector: &str) -> DriverResult<()> {
		self.take_failure()?;
		self.ensure_open("click")?;
		self.record(Interaction::Click {
			selector: selector.to_string(),
		});
		Ok(())
	}

	async fn fill(&self, selector: &str, value: &str) -> DriverResult<()> {
		self.take_failure()?;
		self.ensure_open("fill")?;
		self.record(Interaction::Fill {
			selector: selector.to_string(),
			value: value.to_string(),
		});
		Ok(())
	}

	async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> DriverResult<()> {
		self.take_failure()?;
		self.record(Interaction::WaitForUrl {
			pattern: pattern.to_string(),
		});
		let deadline = Instant::now() + timeout;
		loop {
			self.ensure_open("waitForURL")?;
			if pattern.matches(&self.url()) {
				return Ok(());
			}
			let now = Instant::now();
			if now >= deadline {
				return Err(DriverError::Timeout {
					ms: timeout.as_millis() as u64,
					condition: format!("URL matching {pattern}"),
				});
			}
			tokio::time::sleep(URL_POLL_INTERVAL.min(deadline - now)).await;
		}
	}
}

/// In-memory browser context.
#[derive(Clone)]
pub struct MemorySession {
	inner: Arc<SessionInner>,
}

struct SessionInner {
	pages: Mutex<Vec<Arc<MemoryPage>>>,
	events: EventBus<PageRef>,
	next_id: AtomicU64,
}

impl MemorySession {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(SessionInner {
				pages: Mutex::new(Vec::new()),
				events: EventBus::default(),
				next_id: AtomicU64::new(1),
			}),
		}
	}

	/// Opens a page and announces it to page-event subscribers.
	pub fn open_page(&self, url: &str) -> Arc<MemoryPage> {
		let page = self.add_page(url);
		self.inner.events.emit(Arc::clone(&page) as PageRef);
		page
	}

	/// Opens a page without emitting a page-created event.
	///
	/// Models a page that slipped past a subscription, e.g. one opened
	/// between a scan and the subscribe call.
	pub fn open_page_silently(&self, url: &str) -> Arc<MemoryPage> {
		self.add_page(url)
	}

	/// Opens a page (with its event) after `delay`.
	pub fn open_page_after(&self, delay: Duration, url: &str) -> JoinHandle<Arc<MemoryPage>> {
		let session = self.clone();
		let url = url.to_string();
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			session.open_page(&url)
		})
	}

	/// Opens a page without an event after `delay`.
	pub fn open_page_silently_after(&self, delay: Duration, url: &str) -> JoinHandle<Arc<MemoryPage>> {
		let session = self.clone();
		let url = url.to_string();
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			session.open_page_silently(&url)
		})
	}

	/// All pages ever opened, closed ones included.
	pub fn memory_pages(&self) -> Vec<Arc<MemoryPage>> {
		self.inner.pages.lock().clone()
	}

	/// Number of subscribed page-event streams.
	pub fn subscriber_count(&self) -> usize {
		self.inner.events.subscriber_count()
	}

	fn add_page(&self, url: &str) -> Arc<MemoryPage> {
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		let page = Arc::new(MemoryPage::new(format!("page@{id}"), url));
		self.inner.pages.lock().push(Arc::clone(&page));
		page
	}
}

impl Default for MemorySession {
	fn default() -> Self {
		Self::new()
	}
}

impl BrowserSession for MemorySession {
	fn pages(&self) -> Vec<PageRef> {
		self.inner.pages.lock().iter().map(|page| Arc::clone(page) as PageRef).collect()
	}

	fn page_events(&self) -> PageEvents {
		self.inner.events.subscribe()
	}
}
