//! Direct-message routing.
//!
//! Inbound chat envelopes either reach the recipient's live session or land
//! in the store; receipts get the same treatment, which guarantees eventual
//! delivery without a separate receipt queue.

use peerlink_common::AppResult;
use peerlink_db::repositories::MessageRepository;
use tracing::debug;

use crate::envelope::{
    self, CONTENT_DELIVERED, CONTENT_READ, CONTENT_STATUS_UPDATE, ChatEnvelope, STATUS_DELIVERED,
    STATUS_READ,
};
use crate::registry::ConnectionRegistry;

/// Routes chat and receipt envelopes between direct endpoints.
#[derive(Clone)]
pub struct RoutingService {
    messages: MessageRepository,
    registry: ConnectionRegistry,
}

impl RoutingService {
    /// Create a new routing service.
    #[must_use]
    pub const fn new(messages: MessageRepository, registry: ConnectionRegistry) -> Self {
        Self { messages, registry }
    }

    /// Dispatch one inbound envelope according to its control content.
    pub async fn dispatch(&self, mut envelope: ChatEnvelope) -> AppResult<()> {
        envelope.fill_defaults();

        match envelope.content.control_str() {
            CONTENT_DELIVERED => {
                self.messages
                    .set_flags(envelope::referenced_message_id(&envelope), true, false)
                    .await?;
                envelope.status = STATUS_DELIVERED.to_owned();
                self.relay_or_store(envelope).await
            }
            CONTENT_READ => {
                self.messages
                    .set_flags(envelope::referenced_message_id(&envelope), true, true)
                    .await?;
                envelope.status = STATUS_READ.to_owned();
                self.relay_or_store(envelope).await
            }
            // Presence is emitted by the session lifecycle, not by clients.
            CONTENT_STATUS_UPDATE => Ok(()),
            _ => self.relay_or_store(envelope).await,
        }
    }

    async fn relay_or_store(&self, envelope: ChatEnvelope) -> AppResult<()> {
        if !self.deliver_inline(&envelope).await? {
            debug!(id = %envelope.id, to = %envelope.to_id, "recipient unavailable, storing");
            self.messages.insert(envelope.to_record()).await?;
        }
        Ok(())
    }

    /// Try to push an envelope straight onto the recipient's session.
    ///
    /// A successful regular delivery fires an automatic `delivered` receipt
    /// back to the sender; that receipt is inline-only and never persisted.
    /// Receipts do not trigger further receipts.
    pub async fn deliver_inline(&self, envelope: &ChatEnvelope) -> AppResult<bool> {
        if !self.registry.send(&envelope.to_id, envelope).await {
            return Ok(false);
        }

        if !envelope.content.is_receipt() {
            let receipt =
                envelope::delivery_receipt(&envelope.id, &envelope.to_id, &envelope.from_id);
            self.registry.send(&envelope.from_id, &receipt).await;
        }

        if envelope.content.control_str() == CONTENT_READ {
            self.messages
                .set_flags(envelope::referenced_message_id(envelope), true, true)
                .await?;
        }

        Ok(true)
    }

    /// Replay the full direct history for a freshly connected user in
    /// ascending timestamp order. Rows addressed to the user that were still
    /// undelivered are flipped in one batch, and each original sender still
    /// online gets a synthesized `delivered` receipt.
    pub async fn sync_direct(&self, user_id: &str) -> AppResult<()> {
        let history = self.messages.find_by_participant(user_id).await?;

        let mut newly_delivered: Vec<(String, String)> = Vec::new();
        for record in history {
            if record.to_id == user_id && !record.delivered {
                newly_delivered.push((record.id.clone(), record.from_id.clone()));
            }

            let envelope = ChatEnvelope::from_record(record);
            if !self.registry.send(user_id, &envelope).await {
                // Session already gone; nothing was marked, the next
                // reconnect replays from the same state.
                return Ok(());
            }
        }

        if newly_delivered.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = newly_delivered.iter().map(|(id, _)| id.clone()).collect();
        self.messages.mark_delivered(&ids).await?;

        for (id, sender) in newly_delivered {
            let receipt = envelope::delivery_receipt(&id, user_id, &sender);
            self.registry.send(&sender, &receipt).await;
        }

        Ok(())
    }

    /// Full direct-message history for a user, re-inflated for the API.
    pub async fn history(&self, user_id: &str) -> AppResult<Vec<ChatEnvelope>> {
        let records = self.messages.find_by_participant(user_id).await?;
        Ok(records.into_iter().map(ChatEnvelope::from_record).collect())
    }

    /// Delete the conversation between two users, both directions.
    pub async fn purge(&self, user_id: &str, contact_id: &str) -> AppResult<()> {
        self.messages.purge_conversation(user_id, contact_id).await
    }
}
