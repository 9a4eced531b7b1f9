//! # hookrelay
//!
//! Relays signed webhooks from a code-hosting platform onto a broker topic.
//!
//! ## Architecture
//!
//! ```text
//! Platform -> HTTP (axum) -> Authenticator -> Header canonicalizer
//!          -> Dispatcher (one task per request) -> Broker (Redis stream)
//! ```
//!
//! The HTTP response is returned as soon as the request is authenticated;
//! the publish runs in a detached task tracked by [`InFlight`] so that
//! shutdown can drain it.
//!
//! ## Modules
//!
//! - [`auth`]: HMAC-SHA256 request authentication
//! - [`headers`]: multi-valued header collapsing
//! - [`message`]: outbound message types
//! - [`broker`]: the [`Broker`] trait and its Redis Streams implementation
//! - [`inflight`]: counting barrier for outstanding publishes
//! - [`dispatch`]: the detached publish task
//! - [`delivery`]: the webhook HTTP handler
//! - [`server`]: axum router assembly
//! - [`shutdown`]: signal handling and the drain coordinator
//! - [`config`], [`options`], [`telemetry`]: process bootstrap

pub mod auth;
pub mod broker;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod headers;
pub mod inflight;
pub mod message;
pub mod options;
pub mod server;
pub mod shutdown;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types at crate root
pub use auth::{AuthError, Authenticated, Authenticator};
pub use broker::{Broker, PublishError, RedisBroker};
pub use delivery::DeliveryHandler;
pub use dispatch::Dispatcher;
pub use inflight::InFlight;
pub use message::{EventMeta, MessageHeaders, OutboundMessage};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal, ShutdownState};

/// Component name attached to startup logs
pub const COMPONENT: &str = "robot-universal-hook-delivery";
