//! Webhook delivery handler.
//!
//! ```text
//! POST /<handle-path>
//!     │
//!     ▼
//! authenticate ── rejected ──> 401 (logged, nothing published)
//!     │
//!  accepted
//!     ▼
//! User-Agent := configured identity
//! collapse headers (first value wins)
//! dispatch publish task ──> 200 (returned before the publish runs)
//! ```

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error};

use crate::auth::Authenticator;
use crate::dispatch::Dispatcher;
use crate::headers::collapse;
use crate::message::{EventMeta, OutboundMessage};

/// Relays authenticated webhooks to a single broker topic.
pub struct DeliveryHandler {
    authenticator: Authenticator,
    dispatcher: Dispatcher,
    topic: String,
    user_agent: HeaderValue,
}

impl DeliveryHandler {
    pub fn new(
        authenticator: Authenticator,
        dispatcher: Dispatcher,
        topic: impl Into<String>,
        user_agent: HeaderValue,
    ) -> Self {
        Self {
            authenticator,
            dispatcher,
            topic: topic.into(),
            user_agent,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one webhook request.
    ///
    /// The returned status only reflects authentication; the publish is
    /// spawned and may still be pending (or later fail) when this returns.
    pub fn handle(&self, mut headers: HeaderMap, body: Bytes) -> Response {
        let accepted = match self.authenticator.authenticate(&headers, body) {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "request authenticate failed");
                return e.into_response();
            }
        };

        // Downstream consumers see the relay's identity, not the platform's
        headers.insert(USER_AGENT, self.user_agent.clone());

        let message = OutboundMessage::new(
            self.topic.clone(),
            collapse(&headers),
            accepted.payload,
        );
        let meta = EventMeta::new(accepted.event_type, accepted.delivery_id);

        debug!(
            topic = %self.topic,
            event_type = %meta.event_type,
            delivery_id = %meta.delivery_id,
            "Webhook accepted"
        );

        self.dispatcher.dispatch(message, meta);

        StatusCode::OK.into_response()
    }
}

/// axum handler for the webhook route.
pub async fn deliver(
    State(handler): State<Arc<DeliveryHandler>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handler.handle(headers, body)
}
