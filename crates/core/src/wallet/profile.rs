use testkit_protocol::{Viewport, WalletKind};

use crate::url_pattern::UrlPattern;

/// Brand-specific popup location and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletProfile {
	pub kind: WalletKind,
	/// Full URL of the notification popup.
	pub notification_url: String,
	/// Viewport the popup is resized to.
	pub viewport: Viewport,
}

impl WalletProfile {
	pub fn for_wallet(kind: WalletKind, extension_id: &str) -> Self {
		let (path, viewport) = match kind {
			WalletKind::MetaMask => ("notification.html", Viewport::new(360, 580)),
			WalletKind::Coinbase => ("index.html?inPageRequest=true", Viewport::new(360, 592)),
			WalletKind::Phantom => ("notification.html", Viewport::new(360, 580)),
		};
		Self {
			kind,
			notification_url: format!("chrome-extension://{extension_id}/{path}"),
			viewport,
		}
	}

	/// Pattern matching the popup at any route within it.
	pub fn notification_pattern(&self) -> UrlPattern {
		UrlPattern::contains(self.notification_url.clone())
	}
}
