//! Identifying what a notification popup is asking for.
//!
//! Popups render their content some time after the window opens, so
//! classification polls: every cycle checks that the page is still open, then
//! tests each known text fragment in table order. The first visible fragment
//! wins.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use testkit_protocol::{NotificationType, WalletKind};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::driver::Page;
use crate::error::{Error, Result};

/// Default overall classification deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default interval between classification cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A text fragment that identifies a notification type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
	pub kind: NotificationType,
	pub text: String,
}

/// Ordered signature list. Earlier entries take priority.
///
/// Order matters when one popup renders more than one fragment; a spending
/// cap request also shows a network fee, so it is listed first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureTable {
	entries: Vec<Signature>,
}

impl SignatureTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a signature with the lowest priority so far.
	pub fn with(mut self, kind: NotificationType, text: impl Into<String>) -> Self {
		self.push(kind, text);
		self
	}

	pub fn push(&mut self, kind: NotificationType, text: impl Into<String>) {
		self.entries.push(Signature { kind, text: text.into() });
	}

	/// MetaMask's popup headings.
	pub fn metamask() -> Self {
		Self::new()
			.with(NotificationType::SpendingCap, "Spending cap request")
			.with(NotificationType::Signature, "Signature request")
			.with(NotificationType::Transaction, "Network fee")
			.with(NotificationType::RemoveSpendCap, "Remove Permission")
	}

	/// Built-in table for `kind`. Empty for wallets without known headings.
	pub fn for_wallet(kind: WalletKind) -> Self {
		match kind {
			WalletKind::MetaMask => Self::metamask(),
			WalletKind::Coinbase | WalletKind::Phantom => Self::new(),
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = &Signature> {
		self.entries.iter()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<S: Into<String>> FromIterator<(NotificationType, S)> for SignatureTable {
	fn from_iter<I: IntoIterator<Item = (NotificationType, S)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().map(|(kind, text)| Signature { kind, text: text.into() }).collect(),
		}
	}
}

/// Options for [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
	/// Overall deadline.
	pub timeout: Duration,
	/// Interval between cycles.
	pub poll_interval: Duration,
}

impl Default for ClassifyOptions {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_TIMEOUT,
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}
}

/// Polls `page` until one of `table`'s fragments is visible.
///
/// A visibility check that errors counts as not visible; if the error came
/// from the page closing, the next cycle reports it.
///
/// # Errors
///
/// - [`Error::PageClosed`] as soon as a cycle finds the page closed
/// - [`Error::ClassificationTimeout`] if nothing matched by the deadline
/// - [`Error::Config`] if `table` is empty
pub async fn classify(page: &dyn Page, table: &SignatureTable, options: &ClassifyOptions) -> Result<NotificationType> {
	if table.is_empty() {
		return Err(Error::Config("signature table is empty".to_string()));
	}

	let started = Instant::now();
	let deadline = started + options.timeout;
	let mut cycles = 0u32;

	loop {
		if page.is_closed() {
			return Err(Error::PageClosed(format!(
				"notification page {} closed before its type was identified",
				page.guid()
			)));
		}

		for signature in table.iter() {
			// A check still pending at the deadline counts as not visible.
			let Ok(visible) = tokio::time::timeout_at(deadline, page.is_text_visible(&signature.text)).await else {
				trace!(target = "testkit", text = %signature.text, "visibility check outlasted the deadline");
				break;
			};
			match visible {
				Ok(true) => {
					debug!(
						target = "testkit",
						kind = signature.kind.as_str(),
						cycles,
						elapsed_ms = started.elapsed().as_millis() as u64,
						"classified notification"
					);
					return Ok(signature.kind);
				}
				Ok(false) => {}
				Err(err) => {
					trace!(target = "testkit", text = %signature.text, error = %err, "visibility check failed");
				}
			}
		}

		cycles += 1;
		let now = Instant::now();
		if now >= deadline {
			break;
		}
		tokio::time::sleep(options.poll_interval.min(deadline - now)).await;
	}

	debug!(target = "testkit", cycles, "no signature matched");
	Err(Error::ClassificationTimeout {
		timeout_ms: options.timeout.as_millis() as u64,
	})
}
