use std::sync::Arc;
use std::time::Duration;

use testkit::memory::MemorySession;
use testkit::{
	Decision, Error, NotificationAction, NotificationType, ScriptedActions, Step, TestkitConfig, Viewport, Wallet,
	WalletKind,
};

const EXTENSION_ID: &str = "nkbihfbeogaeaoehlefnkodbefgpgknn";

fn popup_url() -> String {
	format!("chrome-extension://{EXTENSION_ID}/notification.html")
}

fn config() -> TestkitConfig {
	let mut config = TestkitConfig::default();
	config.wallet.extension_id = EXTENSION_ID.to_string();
	config.timeouts.page_lookup = Duration::from_secs(2);
	config.wallet.actions.insert(
		NotificationAction::ConfirmTransaction,
		vec![Step::click("[data-testid=\"confirm-footer-button\"]")],
	);
	config
}

fn metamask(browser: &MemorySession) -> Wallet {
	Wallet::from_config_scripted(Arc::new(browser.clone()), &config()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn respond_approves_what_was_classified() {
	let browser = MemorySession::new();
	let popup = browser.open_page(&popup_url());
	popup.show_text("Spending cap request");
	popup.show_text("Network fee");
	let wallet = metamask(&browser);

	let kind = wallet.respond(Decision::Approve).await.unwrap();

	assert_eq!(kind, NotificationType::SpendingCap);
	assert_eq!(popup.clicks(), vec!["role=button[name=\"Confirm\"]".to_string()]);
	assert_eq!(popup.viewport(), Some(Viewport::new(360, 580)));
	assert!(!wallet.session().has_cached_page());
}

#[tokio::test(start_paused = true)]
async fn respond_waits_for_popup_and_render() {
	let browser = MemorySession::new();
	let wallet = metamask(&browser);
	let opening = browser.open_page_after(Duration::from_millis(800), &popup_url());
	let rendered = tokio::spawn(async move {
		let popup = opening.await.unwrap();
		popup.show_text_after(Duration::from_millis(600), "Spending cap request").await.unwrap();
		popup
	});

	let kind = wallet.respond(Decision::Reject).await.unwrap();
	let popup = rendered.await.unwrap();

	assert_eq!(kind, NotificationType::SpendingCap);
	assert_eq!(popup.clicks(), vec!["role=button[name=\"Cancel\"]".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn transaction_confirm_survives_popup_swap() {
	let browser = MemorySession::new();
	let stale = browser.open_page(&popup_url());
	stale.close_on_next_action();
	let reopening = browser.open_page_silently_after(Duration::from_millis(300), &popup_url());
	let wallet = metamask(&browser);

	wallet.handle(NotificationAction::ConfirmTransaction).await.unwrap();

	let fresh = reopening.await.unwrap();
	assert!(stale.clicks().is_empty());
	assert_eq!(fresh.clicks(), vec!["[data-testid=\"confirm-footer-button\"]".to_string()]);
	assert_eq!(fresh.viewport(), Some(Viewport::new(360, 580)));
}

#[tokio::test(start_paused = true)]
async fn connect_is_not_retried_on_stale_popup() {
	let browser = MemorySession::new();
	let stale = browser.open_page(&popup_url());
	stale.close_on_next_action();
	let other = browser.open_page(&popup_url());
	let wallet = metamask(&browser);

	let err = wallet.handle(NotificationAction::ConnectToDapp).await.unwrap_err();

	assert!(matches!(err, Error::Driver(ref e) if e.is_target_closed()), "{err}");
	assert!(other.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn action_without_script_is_unsupported() {
	let browser = MemorySession::new();
	browser.open_page(&popup_url());
	let wallet = metamask(&browser);

	let err = wallet.handle(NotificationAction::AddToken).await.unwrap_err();
	assert!(matches!(
		err,
		Error::UnsupportedAction {
			wallet: WalletKind::MetaMask,
			action: NotificationAction::AddToken
		}
	));
}

#[tokio::test(start_paused = true)]
async fn coinbase_uses_its_own_popup() {
	let browser = MemorySession::new();
	browser.open_page(&popup_url());
	let coinbase_popup = browser.open_page("chrome-extension://cb/index.html?inPageRequest=true");

	let mut config = config();
	config.wallet.kind = WalletKind::Coinbase;
	config.wallet.extension_id = "cb".to_string();
	let actions = ScriptedActions::new(WalletKind::Coinbase).with_script(NotificationAction::ConnectToDapp, vec![Step::click("#connect")]);
	let wallet = Wallet::from_config(Arc::new(browser.clone()), &config, Arc::new(actions)).unwrap();

	wallet.handle(NotificationAction::ConnectToDapp).await.unwrap();

	assert_eq!(wallet.kind(), WalletKind::Coinbase);
	assert_eq!(coinbase_popup.clicks(), vec!["#connect".to_string()]);
	assert_eq!(coinbase_popup.viewport(), Some(Viewport::new(360, 592)));
}

#[test]
fn extension_id_is_required() {
	let browser = MemorySession::new();
	let err = Wallet::from_config_scripted(Arc::new(browser), &TestkitConfig::default()).err();
	assert!(matches!(err, Some(Error::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn identify_without_builtin_signatures_is_a_config_error() {
	let browser = MemorySession::new();
	browser.open_page("chrome-extension://ph/notification.html");
	let mut config = config();
	config.wallet.kind = WalletKind::Phantom;
	config.wallet.extension_id = "ph".to_string();
	let wallet = Wallet::from_config_scripted(Arc::new(browser), &config).unwrap();

	let err = wallet.identify_notification().await.unwrap_err();
	assert!(matches!(err, Error::Config(_)));
}
