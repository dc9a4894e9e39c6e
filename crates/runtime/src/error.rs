//! Error types for the testkit runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the testkit runtime.
#[derive(Debug, Error)]
pub enum Error {
	/// Retry policy violates its invariants.
	#[error("Invalid retry policy: {0}")]
	InvalidPolicy(String),

	/// Failed to spawn the local node process, or it exited right away.
	#[error("Failed to launch local node: {0}")]
	NodeLaunch(String),

	/// The node process is running but its RPC endpoint never answered.
	#[error("Local node on port {port} unresponsive after {attempts} probes: {source}")]
	NodeUnresponsive {
		port: u16,
		attempts: u32,
		#[source]
		source: Box<Error>,
	},

	/// Every startup attempt failed.
	#[error("Local node not ready after {attempts} startup attempts: {source}")]
	NodeNotReady {
		attempts: u32,
		#[source]
		source: Box<Error>,
	},

	/// Node answered with a different chain id than configured.
	#[error("Chain id mismatch: expected {expected}, node reports {actual}")]
	ChainIdMismatch { expected: u64, actual: u64 },

	/// JSON-RPC error object returned by the node.
	#[error("JSON-RPC error {code}: {message}")]
	Rpc { code: i64, message: String },

	/// HTTP transport error talking to the node.
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}
