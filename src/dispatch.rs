//! Publish dispatch.
//!
//! Each accepted webhook becomes one detached tokio task that publishes the
//! message and exits. There is no pool and no queue limit; the number of
//! concurrent tasks follows the inbound request rate.
//!
//! Delivery is best-effort: a failed publish is logged with the event
//! metadata and the message is dropped. Nothing is reported back to the HTTP
//! caller, which has already received its response.

use std::sync::Arc;
use tracing::{error, info};

use crate::broker::Broker;
use crate::inflight::{InFlight, InFlightGuard};
use crate::message::{EventMeta, OutboundMessage};

/// Spawns publish tasks and tracks them in an [`InFlight`] counter.
#[derive(Clone)]
pub struct Dispatcher {
    broker: Arc<dyn Broker>,
    in_flight: InFlight,
}

impl Dispatcher {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            in_flight: InFlight::new(),
        }
    }

    /// The counter shared with the shutdown coordinator
    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Register and spawn one publish. Returns without waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, message: OutboundMessage, meta: EventMeta) {
        let guard = self.in_flight.enter();
        let broker = self.broker.clone();

        tokio::spawn(publish(broker, message, meta, guard));
    }
}

async fn publish(
    broker: Arc<dyn Broker>,
    message: OutboundMessage,
    meta: EventMeta,
    _guard: InFlightGuard,
) {
    match broker.publish(&message).await {
        Ok(()) => {
            info!(
                broker = broker.name(),
                event_type = %meta.event_type,
                delivery_id = %meta.delivery_id,
                "the request is successfully sent to the MQ topic[{}]",
                message.topic
            );
        }
        Err(e) => {
            error!(
                broker = broker.name(),
                topic = %message.topic,
                event_type = %meta.event_type,
                delivery_id = %meta.delivery_id,
                error = %e,
                "failed to send the request to the MQ"
            );
        }
    }
}
