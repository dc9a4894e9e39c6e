//! Popup synchronization for browser-extension wallet end-to-end tests.
//!
//! Wallet extensions answer dapp requests by opening short-lived popup
//! windows. They appear whenever the extension decides, get reused or torn
//! down mid-interaction, and render their content after they are found. This
//! crate deals with that surface:
//!
//! - [`waiter::resolve_page`] finds a live popup by URL, racing a page-created
//!   event subscription against polling so a popup opened between the initial
//!   scan and the subscription is not missed
//! - [`classify::classify`] polls a popup's rendered text against an ordered
//!   [`SignatureTable`] to decide what kind of request it is
//! - [`recovery::StaleWindowRecovery`] retries an action once on a fresh popup
//!   when the first one closed under it
//! - [`WalletSession`] carries the single-slot cached popup between
//!   classification and the action that follows it
//! - [`Wallet`] composes all of that with a brand profile and a pluggable
//!   [`NotificationActions`] implementation
//!
//! The browser itself is an external collaborator behind the [`driver`]
//! traits; [`memory`] provides an in-process implementation for tests.
//!
//! Retry with backoff for infrastructure (local chain node startup) lives in
//! `testkit-runtime` and is re-exported here as [`runtime`].

pub mod classify;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod logging;
pub mod memory;
pub mod recovery;
pub mod session;
pub mod url_pattern;
pub mod waiter;
pub mod wallet;

pub use classify::{ClassifyOptions, Signature, SignatureTable, classify};
pub use config::{TestkitConfig, Timeouts, WalletConfig};
pub use driver::{BrowserSession, Page, PageRef};
pub use error::{DriverError, DriverResult, Error, Result};
pub use events::{EventBus, EventStream, PageEvents};
pub use recovery::StaleWindowRecovery;
pub use session::{NotificationSettings, WalletSession};
pub use testkit_protocol as protocol;
pub use testkit_protocol::{Decision, LoadState, NotificationAction, NotificationType, Viewport, WalletKind};
pub use testkit_runtime as runtime;
pub use url_pattern::UrlPattern;
pub use waiter::{WaitOptions, resolve_page};
pub use wallet::{NotificationActions, ScriptedActions, Step, Wallet, WalletProfile};
