//! Verbatim relay of peer-to-peer signaling envelopes.

use tracing::debug;

use crate::envelope::SignalingEnvelope;
use crate::registry::ConnectionRegistry;

/// Forwards opaque session-establishment payloads by recipient id. The
/// offer/answer/candidate structure inside is never inspected.
#[derive(Clone)]
pub struct SignalingRelay {
    registry: ConnectionRegistry,
}

impl SignalingRelay {
    /// Create a new signaling relay.
    #[must_use]
    pub const fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Forward the raw frame to its addressee. Failures are logged, never
    /// retried, and never surfaced to the sender.
    pub async fn relay(&self, envelope: &SignalingEnvelope) {
        if !self
            .registry
            .send_raw(&envelope.to_id, envelope.raw.clone())
            .await
        {
            debug!(
                from = %envelope.from_id,
                to = %envelope.to_id,
                "signaling recipient unavailable"
            );
        }
    }
}
