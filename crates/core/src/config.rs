//! JSON configuration.
//!
//! Every field has a default, so a config file only names what it changes:
//!
//! ```json
//! {
//!   "wallet": { "kind": "metamask", "extensionId": "nkbihfbeogaeaoehlefnkodbefgpgknn" },
//!   "timeouts": { "pageLookupMs": 20000 },
//!   "retry": { "maxAttempts": 5 }
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use testkit_protocol::{NotificationAction, Viewport, WalletKind};
use testkit_runtime::{LocalNode, NodeConfig, RetryPolicy, RetryStrategy};
use tracing::debug;

use crate::classify::{ClassifyOptions, SignatureTable};
use crate::error::{Error, Result};
use crate::session::NotificationSettings;
use crate::waiter::WaitOptions;
use crate::wallet::{Step, WalletProfile};

/// Environment variable naming a config file for [`TestkitConfig::from_env`].
pub const CONFIG_ENV: &str = "TESTKIT_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestkitConfig {
	pub wallet: WalletConfig,
	pub timeouts: Timeouts,
	/// Policy for retried infrastructure operations.
	pub retry: RetryPolicy,
	/// Local chain node to start, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub node: Option<NodeConfig>,
}

/// Wallet under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletConfig {
	pub kind: WalletKind,
	pub extension_id: String,
	/// Overrides the brand's popup viewport.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub viewport: Option<Viewport>,
	/// Replaces the brand's built-in signature table.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub signatures: Option<SignatureTable>,
	/// Scripted steps per action, on top of the brand's built-in scripts.
	#[serde(skip_serializing_if = "HashMap::is_empty")]
	pub actions: HashMap<NotificationAction, Vec<Step>>,
}

/// Popup timing knobs, all in milliseconds on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeouts {
	#[serde(rename = "pageLookupMs", with = "testkit_runtime::duration_ms")]
	pub page_lookup: Duration,
	#[serde(rename = "pagePollMs", with = "testkit_runtime::duration_ms")]
	pub page_poll: Duration,
	#[serde(rename = "loadStateMs", with = "testkit_runtime::duration_ms")]
	pub load_state: Duration,
	#[serde(rename = "classifyMs", with = "testkit_runtime::duration_ms")]
	pub classify: Duration,
	#[serde(rename = "classifyPollMs", with = "testkit_runtime::duration_ms")]
	pub classify_poll: Duration,
	#[serde(rename = "staleSettleMs", with = "testkit_runtime::duration_ms")]
	pub stale_settle: Duration,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			page_lookup: crate::waiter::DEFAULT_TIMEOUT,
			page_poll: crate::waiter::DEFAULT_POLL_INTERVAL,
			load_state: crate::waiter::DEFAULT_LOAD_TIMEOUT,
			classify: crate::classify::DEFAULT_TIMEOUT,
			classify_poll: crate::classify::DEFAULT_POLL_INTERVAL,
			stale_settle: crate::recovery::DEFAULT_SETTLE_DELAY,
		}
	}
}

impl Timeouts {
	pub fn wait_options(&self, viewport: Option<Viewport>) -> WaitOptions {
		WaitOptions {
			timeout: self.page_lookup,
			poll_interval: self.page_poll,
			viewport,
			load_timeout: self.load_state,
			..WaitOptions::default()
		}
	}

	pub fn classify_options(&self) -> ClassifyOptions {
		ClassifyOptions {
			timeout: self.classify,
			poll_interval: self.classify_poll,
		}
	}

	fn validate(&self) -> Result<()> {
		if self.page_poll.is_zero() || self.classify_poll.is_zero() {
			return Err(Error::Config("poll intervals must be greater than zero".to_string()));
		}
		Ok(())
	}
}

impl TestkitConfig {
	/// Reads and validates a JSON config file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = fs::read_to_string(path)?;
		let config: Self = serde_json::from_str(&content)?;
		config.validate()?;
		debug!(target = "testkit", path = %path.display(), wallet = %config.wallet.kind, "loaded config");
		Ok(config)
	}

	/// Loads the file named by `TESTKIT_CONFIG`, or defaults if it is unset.
	pub fn from_env() -> Result<Self> {
		match std::env::var_os(CONFIG_ENV) {
			Some(path) => Self::load(path),
			None => Ok(Self::default()),
		}
	}

	pub fn validate(&self) -> Result<()> {
		self.timeouts.validate()?;
		self.retry.validate()?;
		if let Some(node) = &self.node {
			node.validate()?;
		}
		Ok(())
	}

	/// Signature table for the configured wallet.
	pub fn signature_table(&self) -> SignatureTable {
		self.wallet.signatures.clone().unwrap_or_else(|| SignatureTable::for_wallet(self.wallet.kind))
	}

	/// Popup settings for `profile` under these timeouts.
	pub fn notification_settings(&self, profile: &WalletProfile) -> NotificationSettings {
		NotificationSettings {
			pattern: profile.notification_pattern(),
			wait: self.timeouts.wait_options(Some(profile.viewport)),
			classify: self.timeouts.classify_options(),
			settle_delay: self.timeouts.stale_settle,
		}
	}

	pub fn retry_strategy(&self) -> RetryStrategy {
		RetryStrategy::new(self.retry)
	}

	/// Starts the configured local node, or returns `None` when no `node`
	/// section is present.
	pub async fn start_node(&self) -> Result<Option<LocalNode>> {
		match &self.node {
			Some(node) => Ok(Some(LocalNode::start(node.clone()).await?)),
			None => Ok(None),
		}
	}
}
