use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use testkit_protocol::{NotificationAction, WalletKind};
use tracing::debug;

use crate::driver::PageRef;
use crate::error::{DriverError, Error, Result};
use crate::url_pattern::UrlPattern;

const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);

fn default_step_timeout() -> Duration {
	DEFAULT_STEP_TIMEOUT
}

/// Performs notification actions on a resolved popup page.
///
/// Implementations hold the brand's UI knowledge. Page lookup, caching, and
/// stale-page recovery happen before `perform` is called.
#[async_trait]
pub trait NotificationActions: Send + Sync {
	async fn perform(&self, action: NotificationAction, page: PageRef) -> Result<()>;
}

/// One UI step of a scripted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
	Click {
		selector: String,
	},
	Fill {
		selector: String,
		value: String,
	},
	WaitForUrl {
		contains: String,
		#[serde(rename = "timeoutMs", default = "default_step_timeout", with = "testkit_runtime::duration_ms")]
		timeout: Duration,
	},
	/// Fails unless `text` is visible.
	ExpectText {
		text: String,
	},
}

impl Step {
	pub fn click(selector: impl Into<String>) -> Self {
		Self::Click { selector: selector.into() }
	}

	async fn run(&self, page: &PageRef) -> Result<()> {
		match self {
			Step::Click { selector } => page.click(selector).await?,
			Step::Fill { selector, value } => page.fill(selector, value).await?,
			Step::WaitForUrl { contains, timeout } => page.wait_for_url(&UrlPattern::contains(contains.as_str()), *timeout).await?,
			Step::ExpectText { text } => {
				if !page.is_text_visible(text).await? {
					return Err(DriverError::ElementNotFound(format!("text={text}")).into());
				}
			}
		}
		Ok(())
	}
}

/// [`NotificationActions`] driven by per-action step lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedActions {
	wallet: WalletKind,
	scripts: HashMap<NotificationAction, Vec<Step>>,
}

impl ScriptedActions {
	pub fn new(wallet: WalletKind) -> Self {
		Self {
			wallet,
			scripts: HashMap::new(),
		}
	}

	pub fn with_script(mut self, action: NotificationAction, steps: Vec<Step>) -> Self {
		self.scripts.insert(action, steps);
		self
	}

	/// Adds `scripts`, replacing existing scripts for the same actions.
	pub fn merge(mut self, scripts: HashMap<NotificationAction, Vec<Step>>) -> Self {
		self.scripts.extend(scripts);
		self
	}

	/// Built-in scripts for MetaMask's permission popups.
	pub fn metamask() -> Self {
		use NotificationAction::*;

		let button = |name: &str| vec![Step::click(format!("role=button[name=\"{name}\"]"))];
		Self::new(WalletKind::MetaMask)
			.with_script(ConnectToDapp, button("Connect"))
			.with_script(ApproveSpendingCap, button("Confirm"))
			.with_script(RejectSpendingCap, button("Cancel"))
			.with_script(ApproveTokenPermission, button("Confirm"))
			.with_script(RejectTokenPermission, button("Reject"))
	}

	/// Built-in scripts for `kind`. Empty for brands without any.
	pub fn for_wallet(kind: WalletKind) -> Self {
		match kind {
			WalletKind::MetaMask => Self::metamask(),
			WalletKind::Coinbase | WalletKind::Phantom => Self::new(kind),
		}
	}

	pub fn script(&self, action: NotificationAction) -> Option<&[Step]> {
		self.scripts.get(&action).map(Vec::as_slice)
	}
}

#[async_trait]
impl NotificationActions for ScriptedActions {
	async fn perform(&self, action: NotificationAction, page: PageRef) -> Result<()> {
		let steps = self.script(action).ok_or(Error::UnsupportedAction {
			wallet: self.wallet,
			action,
		})?;
		for (index, step) in steps.iter().enumerate() {
			debug!(target = "testkit", ?action, index, ?step, "running step");
			step.run(&page).await?;
		}
		Ok(())
	}
}
