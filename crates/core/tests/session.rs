use std::sync::Arc;
use std::time::Duration;

use testkit::driver::Page;
use testkit::memory::MemorySession;
use testkit::{ClassifyOptions, Error, NotificationSettings, NotificationType, SignatureTable, UrlPattern, WalletSession};

const POPUP: &str = "chrome-extension://mm/notification.html";

fn wallet_session(browser: &MemorySession) -> WalletSession {
	let mut settings = NotificationSettings::new(UrlPattern::contains(POPUP));
	settings.wait.timeout = Duration::from_secs(2);
	settings.classify = ClassifyOptions {
		timeout: Duration::from_secs(3),
		poll_interval: Duration::from_millis(500),
	};
	WalletSession::new(Arc::new(browser.clone()), settings)
}

#[tokio::test(start_paused = true)]
async fn classified_page_is_served_once() {
	let browser = MemorySession::new();
	let popup = browser.open_page(POPUP);
	popup.show_text("Network fee");
	let session = wallet_session(&browser);

	let kind = session.identify_notification(&SignatureTable::metamask()).await.unwrap();
	assert_eq!(kind, NotificationType::Transaction);
	assert!(session.has_cached_page());

	let page = session.notification_page().await.unwrap();
	assert_eq!(page.guid(), popup.guid());
	assert!(!session.has_cached_page());
}

#[tokio::test(start_paused = true)]
async fn closed_cached_page_is_replaced() {
	let browser = MemorySession::new();
	let first = browser.open_page(POPUP);
	first.show_text("Signature request");
	let session = wallet_session(&browser);

	session.identify_notification(&SignatureTable::metamask()).await.unwrap();
	first.close();
	let second = browser.open_page(POPUP);

	let page = session.notification_page().await.unwrap();
	assert_eq!(page.guid(), second.guid());
	assert!(!page.is_closed());
}

#[tokio::test(start_paused = true)]
async fn failed_classification_leaves_cache_empty() {
	let browser = MemorySession::new();
	let popup = browser.open_page(POPUP);
	popup.show_text("Signature request");
	let session = wallet_session(&browser);

	session.identify_notification(&SignatureTable::metamask()).await.unwrap();
	popup.hide_text("Signature request");

	let err = session.identify_notification(&SignatureTable::metamask()).await.unwrap_err();
	assert!(matches!(err, Error::ClassificationTimeout { timeout_ms: 3_000 }));
	assert!(!session.has_cached_page());
}

#[tokio::test(start_paused = true)]
async fn classification_of_closing_popup_reports_closed() {
	let browser = MemorySession::new();
	let popup = browser.open_page(POPUP);
	popup.close_after(Duration::from_millis(700));
	let session = wallet_session(&browser);

	let err = session.identify_notification(&SignatureTable::metamask()).await.unwrap_err();
	assert!(matches!(err, Error::PageClosed(_)));
	assert!(!session.has_cached_page());
}

#[tokio::test(start_paused = true)]
async fn with_notification_page_resolves_when_nothing_cached() {
	let browser = MemorySession::new();
	let session = wallet_session(&browser);
	let opening = browser.open_page_after(Duration::from_millis(300), POPUP);

	let url = session
		.with_notification_page(|page| async move { Ok(page.url()) })
		.await
		.unwrap();

	assert_eq!(url, POPUP);
	assert_eq!(opening.await.unwrap().interactions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn lookup_timeout_surfaces_page_not_found() {
	let browser = MemorySession::new();
	let session = wallet_session(&browser);

	let err = session.notification_page().await.err().expect("expected notification_page to fail");
	assert!(matches!(err, Error::PageNotFound { timeout_ms: 2_000, .. }));
}
