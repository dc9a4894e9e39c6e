use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use testkit::driver::{BrowserSession, Page, PageRef};
use testkit::memory::{Interaction, MemorySession};
use testkit::{DriverError, DriverResult, Error, EventBus, LoadState, PageEvents, UrlPattern, Viewport, WaitOptions, resolve_page};
use tokio::time::Instant;

const POPUP: &str = "chrome-extension://mm/notification.html";

fn pattern() -> UrlPattern {
	UrlPattern::contains("notification.html")
}

fn options(timeout_ms: u64) -> WaitOptions {
	WaitOptions::default().with_timeout(Duration::from_millis(timeout_ms))
}

#[tokio::test(start_paused = true)]
async fn existing_page_is_returned_without_waiting() {
	let session = MemorySession::new();
	session.open_page("https://dapp.test");
	let popup = session.open_page(POPUP);

	let start = Instant::now();
	let page = resolve_page(&session, &pattern(), &options(2_000).with_viewport(Viewport::new(360, 580)))
		.await
		.unwrap();

	assert_eq!(start.elapsed(), Duration::ZERO);
	assert_eq!(page.guid(), popup.guid());
	assert_eq!(
		popup.interactions(),
		vec![
			Interaction::LoadState(LoadState::DomContentLoaded),
			Interaction::Viewport(Viewport::new(360, 580)),
		]
	);
	assert_eq!(session.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn page_announced_midway_is_found_by_event() {
	let session = MemorySession::new();
	let opening = session.open_page_after(Duration::from_millis(1_000), POPUP);

	let start = Instant::now();
	let page = resolve_page(&session, &pattern(), &options(2_000)).await.unwrap();
	let elapsed = start.elapsed();

	assert_eq!(page.guid(), opening.await.unwrap().guid());
	assert!(elapsed >= Duration::from_millis(1_000), "{elapsed:?}");
	assert!(elapsed < Duration::from_millis(1_300), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn page_missed_by_subscription_is_found_by_polling() {
	let session = MemorySession::new();
	let opening = session.open_page_silently_after(Duration::from_millis(500), POPUP);

	let start = Instant::now();
	let page = resolve_page(&session, &pattern(), &options(5_000)).await.unwrap();
	let elapsed = start.elapsed();

	assert_eq!(page.guid(), opening.await.unwrap().guid());
	assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
	assert!(elapsed <= Duration::from_millis(800), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn page_that_navigates_after_opening_is_found_by_polling() {
	let session = MemorySession::new();
	let blank = session.open_page_after(Duration::from_millis(100), "about:blank");
	tokio::spawn(async move {
		let page = blank.await.unwrap();
		tokio::time::sleep(Duration::from_millis(300)).await;
		page.set_url(POPUP);
	});

	let start = Instant::now();
	let page = resolve_page(&session, &pattern(), &options(5_000)).await.unwrap();

	assert_eq!(page.url(), POPUP);
	assert!(start.elapsed() <= Duration::from_millis(700));
}

#[tokio::test(start_paused = true)]
async fn missing_page_times_out_at_deadline() {
	let session = MemorySession::new();
	session.open_page("https://dapp.test");

	let start = Instant::now();
	let err = resolve_page(&session, &pattern(), &options(1_500)).await.err().expect("expected resolve_page to fail");

	assert_eq!(start.elapsed(), Duration::from_millis(1_500));
	match err {
		Error::PageNotFound { pattern, timeout_ms } => {
			assert_eq!(pattern, "*notification.html*");
			assert_eq!(timeout_ms, 1_500);
		}
		other => panic!("unexpected error: {other}"),
	}
}

#[tokio::test(start_paused = true)]
async fn closed_pages_are_never_returned() {
	let session = MemorySession::new();
	session.open_page(POPUP).close();

	let err = resolve_page(&session, &pattern(), &options(1_000)).await.err().expect("expected resolve_page to fail");
	assert!(matches!(err, Error::PageNotFound { .. }));

	let live = session.open_page_after(Duration::from_millis(200), POPUP);
	let page = resolve_page(&session, &pattern(), &options(1_000)).await.unwrap();
	assert!(!page.is_closed());
	assert_eq!(page.guid(), live.await.unwrap().guid());
}

/// Page whose preparation calls always fail, or never return when `stall`
/// is set.
struct Unprepared {
	stall: bool,
}

impl Unprepared {
	async fn stall_if_asked(&self) {
		if self.stall {
			tokio::time::sleep(Duration::from_secs(3_600)).await;
		}
	}
}

#[async_trait]
impl Page for Unprepared {
	fn guid(&self) -> &str {
		"page@unprepared"
	}

	fn url(&self) -> String {
		POPUP.to_string()
	}

	fn is_closed(&self) -> bool {
		false
	}

	async fn wait_for_load_state(&self, _state: LoadState, timeout: Duration) -> DriverResult<()> {
		self.stall_if_asked().await;
		Err(DriverError::Timeout {
			ms: timeout.as_millis() as u64,
			condition: "domcontentloaded".into(),
		})
	}

	async fn set_viewport(&self, _viewport: Viewport) -> DriverResult<()> {
		self.stall_if_asked().await;
		Err(DriverError::Other("viewport unsupported".into()))
	}

	async fn is_text_visible(&self, _text: &str) -> DriverResult<bool> {
		Ok(false)
	}

	async fn click(&self, _selector: &str) -> DriverResult<()> {
		Ok(())
	}

	async fn fill(&self, _selector: &str, _value: &str) -> DriverResult<()> {
		Ok(())
	}

	async fn wait_for_url(&self, _pattern: &UrlPattern, _timeout: Duration) -> DriverResult<()> {
		Ok(())
	}
}

struct SinglePage {
	page: PageRef,
	events: EventBus<PageRef>,
}

impl BrowserSession for SinglePage {
	fn pages(&self) -> Vec<PageRef> {
		vec![Arc::clone(&self.page)]
	}

	fn page_events(&self) -> PageEvents {
		self.events.subscribe()
	}
}

#[tokio::test]
async fn preparation_failures_do_not_fail_lookup() {
	let session = SinglePage {
		page: Arc::new(Unprepared { stall: false }),
		events: EventBus::default(),
	};
	let page = resolve_page(&session, &pattern(), &options(1_000).with_viewport(Viewport::new(360, 580)))
		.await
		.unwrap();
	assert_eq!(page.guid(), "page@unprepared");
}

#[tokio::test(start_paused = true)]
async fn stalled_preparation_is_cut_off_per_step() {
	let session = SinglePage {
		page: Arc::new(Unprepared { stall: true }),
		events: EventBus::default(),
	};
	let options = WaitOptions {
		load_timeout: Duration::from_millis(500),
		..options(1_000).with_viewport(Viewport::new(360, 580))
	};

	let start = Instant::now();
	let page = resolve_page(&session, &pattern(), &options).await.unwrap();

	assert_eq!(page.guid(), "page@unprepared");
	assert_eq!(start.elapsed(), Duration::from_secs(1));
}
