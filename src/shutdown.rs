//! Graceful shutdown.
//!
//! Two pieces cooperate here:
//!
//! - [`ShutdownSignal`] waits for SIGINT/SIGTERM and broadcasts a shutdown
//!   notification. The HTTP server subscribes to it and stops accepting
//!   connections.
//! - [`ShutdownCoordinator`] then drains: it waits for every dispatched
//!   publish to finish and closes the broker.
//!
//! ```text
//! Running ──drain()──> Draining ──in-flight == 0, broker closed──> Terminated
//! ```
//!
//! There is no drain timeout. A publish that never completes keeps the
//! process alive until it is killed.
//!
//! # Example
//!
//! ```rust,ignore
//! let shutdown = ShutdownSignal::new();
//! let mut stop = shutdown.subscribe();
//!
//! tokio::spawn({
//!     let shutdown = shutdown.clone();
//!     async move { shutdown.wait().await }
//! });
//!
//! axum::serve(listener, app)
//!     .with_graceful_shutdown(async move {
//!         let _ = stop.recv().await;
//!     })
//!     .await?;
//!
//! coordinator.drain().await;
//! ```

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{error, info};

use crate::broker::Broker;
use crate::inflight::InFlight;

/// A signal for coordinating graceful shutdown across components.
///
/// When a termination signal (SIGTERM, SIGINT) is received, all components
/// holding a receiver from [`ShutdownSignal::subscribe`] are notified.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// Wait for a termination signal (SIGTERM or SIGINT), then notify all
    /// receivers.
    pub async fn wait(&self) {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        let _ = self.sender.send(());
    }

    /// Subscribe to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Trigger shutdown manually (for testing or programmatic shutdown).
    pub fn trigger(&self) {
        info!("Shutdown triggered programmatically");
        let _ = self.sender.send(());
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of the relay with respect to shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Accepting and dispatching webhooks
    Running,
    /// Waiting for outstanding publishes to finish
    Draining,
    /// Drain complete and broker closed
    Terminated,
}

/// Drains outstanding publishes and releases the broker.
pub struct ShutdownCoordinator {
    in_flight: InFlight,
    broker: Arc<dyn Broker>,
    state: watch::Sender<ShutdownState>,
}

impl ShutdownCoordinator {
    pub fn new(in_flight: InFlight, broker: Arc<dyn Broker>) -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self {
            in_flight,
            broker,
            state,
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn watch_state(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Wait for every dispatched publish to finish, then close the broker.
    ///
    /// Callers must have stopped accepting new requests first. Calling
    /// `drain` again after it has completed is a no-op.
    pub async fn drain(&self) {
        let started = self.state.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::Draining;
                true
            } else {
                false
            }
        });
        if !started {
            return;
        }

        info!(
            in_flight = self.in_flight.current(),
            "Draining outstanding publishes"
        );
        self.in_flight.wait_idle().await;

        self.broker.close().await;
        self.state.send_replace(ShutdownState::Terminated);

        info!(broker = self.broker.name(), "Shutdown drain complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::message::{EventMeta, MessageHeaders, OutboundMessage};
    use crate::test_utils::RecordingBroker;
    use bytes::Bytes;
    use std::time::Duration;

    #[tokio::test]
    async fn test_manual_trigger() {
        let signal = ShutdownSignal::new();
        let mut receiver = signal.subscribe();

        let trigger_signal = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger_signal.trigger();
        });

        let result = tokio::time::timeout(Duration::from_millis(100), receiver.recv()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_clone_receives_signal() {
        let signal = ShutdownSignal::new();
        let signal2 = signal.clone();

        let mut receiver1 = signal.subscribe();
        let mut receiver2 = signal2.subscribe();

        signal.trigger();

        assert!(receiver1.recv().await.is_ok());
        assert!(receiver2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_drain_when_idle() {
        let broker = Arc::new(RecordingBroker::new());
        let coordinator = ShutdownCoordinator::new(InFlight::new(), broker.clone());
        assert_eq!(coordinator.state(), ShutdownState::Running);

        tokio::time::timeout(Duration::from_secs(1), coordinator.drain())
            .await
            .unwrap();

        assert_eq!(coordinator.state(), ShutdownState::Terminated);
        assert!(broker.is_closed());
    }

    #[tokio::test]
    async fn test_drain_waits_for_all_dispatches() {
        const N: usize = 16;

        let broker = Arc::new(RecordingBroker::gated());
        let dispatcher = Dispatcher::new(broker.clone());
        let coordinator = Arc::new(ShutdownCoordinator::new(
            dispatcher.in_flight().clone(),
            broker.clone(),
        ));

        for i in 0..N {
            dispatcher.dispatch(
                OutboundMessage::new("t1", MessageHeaders::new(), Bytes::from(format!("m{}", i))),
                EventMeta::new("Push Hook", format!("d{}", i)),
            );
        }
        assert_eq!(dispatcher.in_flight().current(), N);

        let mut state = coordinator.watch_state();
        let drain = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.drain().await })
        };

        state
            .wait_for(|s| *s == ShutdownState::Draining)
            .await
            .unwrap();

        // Release all but one; the drain must keep waiting
        broker.release(N - 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!drain.is_finished());
        assert_eq!(dispatcher.in_flight().current(), 1);
        assert!(!broker.is_closed());

        broker.release(1);
        tokio::time::timeout(Duration::from_secs(1), drain)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(broker.published().len(), N);
        assert_eq!(dispatcher.in_flight().current(), 0);
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
        assert!(broker.is_closed());
    }

    #[tokio::test]
    async fn test_drain_counts_failures_as_complete() {
        let broker = Arc::new(RecordingBroker::failing());
        let dispatcher = Dispatcher::new(broker.clone());
        let coordinator = ShutdownCoordinator::new(dispatcher.in_flight().clone(), broker.clone());

        for i in 0..4 {
            dispatcher.dispatch(
                OutboundMessage::new("t1", MessageHeaders::new(), Bytes::from_static(b"x")),
                EventMeta::new("Push Hook", format!("d{}", i)),
            );
        }

        tokio::time::timeout(Duration::from_secs(1), coordinator.drain())
            .await
            .unwrap();
        assert_eq!(broker.attempts(), 4);
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
    }

    #[tokio::test]
    async fn test_second_drain_is_noop() {
        let broker = Arc::new(RecordingBroker::new());
        let coordinator = ShutdownCoordinator::new(InFlight::new(), broker.clone());

        coordinator.drain().await;
        coordinator.drain().await;
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
    }
}
