//! Notification popup vocabulary.
//!
//! A wallet extension opens a short-lived popup for every request that needs
//! user approval. [`NotificationType`] names what the popup is asking for,
//! [`NotificationAction`] names what a test does about it, and [`Decision`]
//! picks between approving and rejecting.

use serde::{Deserialize, Serialize};

/// Kind of request a notification popup represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationType {
	/// ERC-20 allowance (spending cap) request.
	SpendingCap,
	/// Message signature request.
	Signature,
	/// Transaction confirmation.
	Transaction,
	/// Allowance revocation.
	RemoveSpendCap,
	/// Dapp connection request.
	Connect,
	/// Token permission (approve-all style) request.
	TokenPermission,
}

impl NotificationType {
	pub const ALL: [NotificationType; 6] = [
		Self::SpendingCap,
		Self::Signature,
		Self::Transaction,
		Self::RemoveSpendCap,
		Self::Connect,
		Self::TokenPermission,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::SpendingCap => "spending-cap",
			Self::Signature => "signature",
			Self::Transaction => "transaction",
			Self::RemoveSpendCap => "remove-spend-cap",
			Self::Connect => "connect",
			Self::TokenPermission => "token-permission",
		}
	}
}

impl std::fmt::Display for NotificationType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Approve or reject a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
	Approve,
	Reject,
}

/// Action a test performs on a notification popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationAction {
	ConnectToDapp,
	RejectConnection,
	ApproveNewNetwork,
	RejectNewNetwork,
	ApproveSwitchNetwork,
	RejectSwitchNetwork,
	ApproveAddNetwork,
	RejectAddNetwork,
	ConfirmTransaction,
	RejectTransaction,
	ConfirmSignature,
	RejectSignature,
	ApproveSpendingCap,
	RejectSpendingCap,
	ApproveTokenPermission,
	RejectTokenPermission,
	ConfirmSpendingCapRemoval,
	RejectSpendingCapRemoval,
	AddToken,
}

impl NotificationAction {
	/// Action answering a classified popup with the given decision.
	pub fn for_notification(kind: NotificationType, decision: Decision) -> Self {
		use Decision::*;
		use NotificationType::*;

		match (kind, decision) {
			(SpendingCap, Approve) => Self::ApproveSpendingCap,
			(SpendingCap, Reject) => Self::RejectSpendingCap,
			(Signature, Approve) => Self::ConfirmSignature,
			(Signature, Reject) => Self::RejectSignature,
			(Transaction, Approve) => Self::ConfirmTransaction,
			(Transaction, Reject) => Self::RejectTransaction,
			(RemoveSpendCap, Approve) => Self::ConfirmSpendingCapRemoval,
			(RemoveSpendCap, Reject) => Self::RejectSpendingCapRemoval,
			(Connect, Approve) => Self::ConnectToDapp,
			(Connect, Reject) => Self::RejectConnection,
			(TokenPermission, Approve) => Self::ApproveTokenPermission,
			(TokenPermission, Reject) => Self::RejectTokenPermission,
		}
	}
}
