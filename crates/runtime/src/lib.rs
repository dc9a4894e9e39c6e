//! Runtime infrastructure for onchain-testkit.
//!
//! Nothing in here knows about browser popups:
//!
//! - **Retry**: [`RetryStrategy`] runs a flaky async operation under a bounded
//!   backoff [`RetryPolicy`] and reports exhaustion as [`AggregateFailure`]
//! - **Local node**: [`LocalNode`] spawns a local chain node (anvil by
//!   default) and waits for its JSON-RPC endpoint, retrying startup
//!
//! The browser-facing crate uses the same policies for its own timing knobs.

pub mod duration_ms;
pub mod error;
pub mod node;
pub mod retry;

pub use error::{Error, Result};
pub use node::{LocalNode, NodeConfig};
pub use retry::{AggregateFailure, Attempt, Backoff, RetryPolicy, RetryStrategy, compute_delay, execute_with_retry};
