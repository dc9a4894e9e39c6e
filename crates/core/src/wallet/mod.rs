//! Wallet brands on top of popup synchronization.
//!
//! - [`WalletProfile`]: where a brand's notification popup lives and its size
//! - [`NotificationActions`]: what clicking through a popup means for a brand
//! - [`Wallet`]: the two composed with a [`WalletSession`]

mod actions;
mod profile;

use std::sync::Arc;

use testkit_protocol::{Decision, NotificationAction, NotificationType, WalletKind};
use tracing::info;

pub use actions::{NotificationActions, ScriptedActions, Step};
pub use profile::WalletProfile;

use crate::classify::SignatureTable;
use crate::config::TestkitConfig;
use crate::driver::BrowserSession;
use crate::error::{Error, Result};
use crate::session::{NotificationSettings, WalletSession};

/// Returns true for actions that run with stale-popup recovery.
///
/// These are the flows where the extension is known to swap the popup window
/// mid-interaction.
pub fn recovers_stale_popup(action: NotificationAction) -> bool {
	use NotificationAction::*;

	matches!(
		action,
		ConfirmTransaction
			| RejectTransaction
			| ApproveTokenPermission
			| RejectTokenPermission
			| ConfirmSpendingCapRemoval
			| RejectSpendingCapRemoval
	)
}

/// A wallet extension under test.
pub struct Wallet {
	profile: WalletProfile,
	session: WalletSession,
	actions: Arc<dyn NotificationActions>,
	signatures: SignatureTable,
}

impl Wallet {
	pub fn new(
		browser: Arc<dyn BrowserSession>,
		profile: WalletProfile,
		settings: NotificationSettings,
		actions: Arc<dyn NotificationActions>,
	) -> Self {
		let signatures = SignatureTable::for_wallet(profile.kind);
		Self {
			profile,
			session: WalletSession::new(browser, settings),
			actions,
			signatures,
		}
	}

	/// Builds a wallet from configuration with the given action implementation.
	pub fn from_config(
		browser: Arc<dyn BrowserSession>,
		config: &TestkitConfig,
		actions: Arc<dyn NotificationActions>,
	) -> Result<Self> {
		config.validate()?;
		if config.wallet.extension_id.is_empty() {
			return Err(Error::Config("wallet.extensionId is required".to_string()));
		}

		let mut profile = WalletProfile::for_wallet(config.wallet.kind, &config.wallet.extension_id);
		if let Some(viewport) = config.wallet.viewport {
			profile.viewport = viewport;
		}
		let settings = config.notification_settings(&profile);
		let signatures = config.signature_table();

		Ok(Self {
			profile,
			session: WalletSession::new(browser, settings),
			actions,
			signatures,
		})
	}

	/// Builds a wallet from configuration using its scripted actions.
	///
	/// Built-in scripts for the brand are used where the configuration does
	/// not provide one.
	pub fn from_config_scripted(browser: Arc<dyn BrowserSession>, config: &TestkitConfig) -> Result<Self> {
		let actions = ScriptedActions::for_wallet(config.wallet.kind).merge(config.wallet.actions.clone());
		Self::from_config(browser, config, Arc::new(actions))
	}

	/// Replaces the signature table used by [`identify_notification`](Self::identify_notification).
	pub fn with_signatures(mut self, signatures: SignatureTable) -> Self {
		self.signatures = signatures;
		self
	}

	pub fn kind(&self) -> WalletKind {
		self.profile.kind
	}

	pub fn profile(&self) -> &WalletProfile {
		&self.profile
	}

	pub fn session(&self) -> &WalletSession {
		&self.session
	}

	pub fn signatures(&self) -> &SignatureTable {
		&self.signatures
	}

	/// Performs `action` on the current notification popup.
	pub async fn handle(&self, action: NotificationAction) -> Result<()> {
		info!(target = "testkit", wallet = %self.profile.kind, ?action, "handling notification");
		let actions = &self.actions;
		if recovers_stale_popup(action) {
			self.session.with_recovery(move |page| actions.perform(action, page)).await
		} else {
			self.session.with_notification_page(move |page| actions.perform(action, page)).await
		}
	}

	/// Identifies the current popup's type with the wallet's signature table.
	pub async fn identify_notification(&self) -> Result<NotificationType> {
		self.session.identify_notification(&self.signatures).await
	}

	/// Identifies the current popup, then approves or rejects it.
	///
	/// The action runs on the page classification looked at.
	pub async fn respond(&self, decision: Decision) -> Result<NotificationType> {
		let kind = self.identify_notification().await?;
		self.handle(NotificationAction::for_notification(kind, decision)).await?;
		Ok(kind)
	}
}
