//! Page-level value types.

use serde::{Deserialize, Serialize};

/// Page load state a driver can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
	/// The `load` event fired.
	Load,
	/// The `DOMContentLoaded` event fired. This is the minimal state popups are
	/// waited for.
	#[default]
	#[serde(rename = "domcontentloaded")]
	DomContentLoaded,
	/// No network connections for at least 500ms.
	#[serde(rename = "networkidle")]
	NetworkIdle,
}

impl std::fmt::Display for LoadState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Load => write!(f, "load"),
			Self::DomContentLoaded => write!(f, "domcontentloaded"),
			Self::NetworkIdle => write!(f, "networkidle"),
		}
	}
}

/// Viewport dimensions applied to a popup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
	/// Page width in pixels
	pub width: u32,
	/// Page height in pixels
	pub height: u32,
}

impl Viewport {
	pub const fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn load_state_uses_playwright_names() {
		let json = serde_json::to_string(&LoadState::DomContentLoaded).unwrap();
		assert_eq!(json, "\"domcontentloaded\"");
		let parsed: LoadState = serde_json::from_str("\"networkidle\"").unwrap();
		assert_eq!(parsed, LoadState::NetworkIdle);
		assert_eq!(LoadState::default(), LoadState::DomContentLoaded);
	}
}
