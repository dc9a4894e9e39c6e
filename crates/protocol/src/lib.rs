//! Shared data types for onchain-testkit.
//!
//! These types cross crate boundaries: the runtime, the browser-facing core,
//! and configuration files all agree on their serialized shape.
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization and naming
//! - **Stable**: Renaming a variant changes the config file format
//!
//! Behavior built on top of them lives in `onchain-testkit`.

pub mod notification;
pub mod types;
pub mod wallet;

pub use notification::*;
pub use types::*;
pub use wallet::*;
