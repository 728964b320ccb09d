//! Inbound guards applied to every message-created event.

use tracing::debug;

use super::{InboundMessage, Relay};

/// Why a message was not relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Authored by the relay itself.
    OwnMessage,
    /// Authored by another bot or a webhook.
    BotAuthor,
    /// Posted outside the source channel.
    OtherChannel,
}

impl<W: Clone + Send + Sync + 'static> Relay<W> {
    /// Apply the self-guard, then the source-guard.
    ///
    /// # Errors
    ///
    /// Returns the [`IgnoreReason`] of the first guard that rejects the message.
    pub fn admit(&self, message: &InboundMessage) -> Result<(), IgnoreReason> {
        if self.self_id() == Some(message.author_id) {
            debug!(channel_id = message.channel_id, "ignoring own message");
            return Err(IgnoreReason::OwnMessage);
        }
        if message.author_is_bot {
            debug!(
                channel_id = message.channel_id,
                author_id = message.author_id,
                "ignoring bot message"
            );
            return Err(IgnoreReason::BotAuthor);
        }
        if message.channel_id != self.rule().source {
            debug!(
                channel_id = message.channel_id,
                source = self.rule().source,
                "ignoring message outside source channel"
            );
            return Err(IgnoreReason::OtherChannel);
        }
        Ok(())
    }
}
