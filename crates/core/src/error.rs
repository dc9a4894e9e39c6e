//! Error types for popup synchronization.

use testkit_protocol::{NotificationAction, WalletKind};
use thiserror::Error;

/// Result type alias for testkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for browser driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Message browsers report when an operation hits a closed target.
pub const CLOSED_TARGET_MESSAGE: &str = "Target page, context or browser has been closed";

/// Errors reported by a browser automation driver.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
	/// Target was closed or detached (page, context, or browser).
	#[error("Target closed: cannot {operation} on closed {target}")]
	TargetClosed { target: String, operation: String },

	/// Driver-side timeout.
	#[error("Timeout after {ms}ms waiting for: {condition}")]
	Timeout { ms: u64, condition: String },

	/// Element not found by selector.
	#[error("Element not found: selector '{0}'")]
	ElementNotFound(String),

	/// Error reported by a remote browser with its error class name.
	#[error("{name}: {message}")]
	Remote { name: String, message: String },

	/// Anything else the driver could not do.
	#[error("Driver error: {0}")]
	Other(String),
}

impl DriverError {
	/// Returns true if this is a target closed/detached error.
	///
	/// Remote errors count when their class is `TargetClosedError` or their
	/// message carries the browser's closed-target wording.
	pub fn is_target_closed(&self) -> bool {
		match self {
			DriverError::TargetClosed { .. } => true,
			DriverError::Remote { name, message } => name == "TargetClosedError" || message.contains(CLOSED_TARGET_MESSAGE),
			DriverError::Other(message) => message.contains(CLOSED_TARGET_MESSAGE),
			DriverError::Timeout { .. } | DriverError::ElementNotFound(_) => false,
		}
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		match self {
			DriverError::Timeout { .. } => true,
			DriverError::Remote { name, .. } => name == "TimeoutError",
			_ => false,
		}
	}
}

/// Errors that can occur while synchronizing with wallet popups.
#[derive(Debug, Error)]
pub enum Error {
	/// No live page matched the URL pattern within the timeout.
	#[error("No live page matching {pattern} within {timeout_ms}ms")]
	PageNotFound { pattern: String, timeout_ms: u64 },

	/// The page closed before or during an interaction that needed it open.
	#[error("Page closed: {0}")]
	PageClosed(String),

	/// No signature in the table became visible before the deadline.
	#[error("No notification signature became visible within {timeout_ms}ms")]
	ClassificationTimeout { timeout_ms: u64 },

	/// The one recovery retry after a closed-target error failed as well.
	#[error("Retry on a fresh page failed: {retry} (original error: {original})")]
	StaleTarget {
		original: Box<Error>,
		#[source]
		retry: Box<Error>,
	},

	/// The wallet has no implementation for the requested action.
	#[error("{wallet} has no handler for notification action {action:?}")]
	UnsupportedAction { wallet: WalletKind, action: NotificationAction },

	/// Invalid configuration.
	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error(transparent)]
	Driver(#[from] DriverError),

	#[error(transparent)]
	Runtime(#[from] testkit_runtime::Error),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if the error means the page went away under us.
	///
	/// This is the only error class stale-window recovery retries.
	pub fn is_target_closed(&self) -> bool {
		match self {
			Error::PageClosed(_) => true,
			Error::Driver(err) => err.is_target_closed(),
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn closed_target_is_recognized_across_shapes() {
		let typed = DriverError::TargetClosed {
			target: "page".into(),
			operation: "click".into(),
		};
		let remote = DriverError::Remote {
			name: "TargetClosedError".into(),
			message: "page.click: Target closed".into(),
		};
		let worded = DriverError::Other(format!("locator.click: {CLOSED_TARGET_MESSAGE}"));
		assert!(typed.is_target_closed());
		assert!(remote.is_target_closed());
		assert!(worded.is_target_closed());

		assert!(!DriverError::ElementNotFound("button".into()).is_target_closed());
		assert!(
			!DriverError::Remote {
				name: "TimeoutError".into(),
				message: "waiting for locator".into()
			}
			.is_target_closed()
		);
	}

	#[test]
	fn only_closed_page_errors_are_recoverable() {
		assert!(Error::PageClosed("gone".into()).is_target_closed());
		assert!(
			Error::Driver(DriverError::TargetClosed {
				target: "page".into(),
				operation: "fill".into()
			})
			.is_target_closed()
		);
		assert!(!Error::ClassificationTimeout { timeout_ms: 10 }.is_target_closed());
		assert!(!Error::Driver(DriverError::ElementNotFound("#confirm".into())).is_target_closed());
	}

	#[test]
	fn stale_target_keeps_both_errors() {
		let err = Error::StaleTarget {
			original: Box::new(Error::PageClosed("first".into())),
			retry: Box::new(Error::Driver(DriverError::ElementNotFound("#ok".into()))),
		};
		let msg = err.to_string();
		assert!(msg.contains("first"));
		assert!(msg.contains("#ok"));
		assert!(std::error::Error::source(&err).is_some());
	}
}
