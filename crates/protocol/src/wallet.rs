//! Wallet brand selection.

use serde::{Deserialize, Serialize};

/// Browser-extension wallet brand under test.
///
/// Selected by configuration; each brand maps to its own popup URL and
/// viewport in `onchain-testkit`'s wallet profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
	#[default]
	MetaMask,
	Coinbase,
	Phantom,
}

impl WalletKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::MetaMask => "metamask",
			Self::Coinbase => "coinbase",
			Self::Phantom => "phantom",
		}
	}
}

impl std::fmt::Display for WalletKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for WalletKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"metamask" => Ok(Self::MetaMask),
			"coinbase" => Ok(Self::Coinbase),
			"phantom" => Ok(Self::Phantom),
			other => Err(format!("unknown wallet kind: {other}")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wallet_kind_parses_case_insensitively() {
		assert_eq!("MetaMask".parse::<WalletKind>(), Ok(WalletKind::MetaMask));
		assert_eq!("PHANTOM".parse::<WalletKind>(), Ok(WalletKind::Phantom));
		assert!("rabby".parse::<WalletKind>().is_err());
	}

	#[test]
	fn wallet_kind_serializes_lowercase() {
		assert_eq!(serde_json::to_string(&WalletKind::Coinbase).unwrap(), "\"coinbase\"");
	}
}
