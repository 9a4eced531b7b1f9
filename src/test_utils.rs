//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

use crate::broker::{Broker, PublishError};
use crate::message::OutboundMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeed,
    Fail,
    Panic,
}

/// A broker that records what it is asked to publish.
///
/// A gated broker holds every publish until [`RecordingBroker::release`]
/// hands out permits, which lets tests observe the pipeline mid-flight.
pub(crate) struct RecordingBroker {
    outcome: Outcome,
    gate: Option<Semaphore>,
    attempts: AtomicUsize,
    published: Mutex<Vec<OutboundMessage>>,
    closed: AtomicBool,
}

impl RecordingBroker {
    fn with(outcome: Outcome, gate: Option<Semaphore>) -> Self {
        Self {
            outcome,
            gate,
            attempts: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn new() -> Self {
        Self::with(Outcome::Succeed, None)
    }

    pub(crate) fn failing() -> Self {
        Self::with(Outcome::Fail, None)
    }

    pub(crate) fn panicking() -> Self {
        Self::with(Outcome::Panic, None)
    }

    pub(crate) fn gated() -> Self {
        Self::with(Outcome::Succeed, Some(Semaphore::new(0)))
    }

    pub(crate) fn gated_failing() -> Self {
        Self::with(Outcome::Fail, Some(Semaphore::new(0)))
    }

    /// Let `n` held publishes proceed.
    pub(crate) fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn published(&self) -> Vec<OutboundMessage> {
        self.published.lock().unwrap().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        match self.outcome {
            Outcome::Succeed => {
                self.published.lock().unwrap().push(message.clone());
                Ok(())
            }
            Outcome::Fail => Err(PublishError::Rejected("broker unavailable".to_string())),
            Outcome::Panic => panic!("broker client crashed"),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
