//! Discord event handler for serenity.
//!
//! Applies the listener guards to every message and queues the ones that
//! pass for the relay worker. The other gateway events are only logged.

use std::sync::Arc;

use serenity::{
    all::{Context, EventHandler, Message, Ready, ResumedEvent, ShardStageUpdateEvent},
    async_trait,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::relay::{AttachmentRef, InboundMessage};

use super::DiscordRelay;

/// Handler for Discord gateway events.
pub struct RelayHandler {
    relay: Arc<DiscordRelay>,
    queue: mpsc::Sender<InboundMessage>,
}

impl RelayHandler {
    /// Create a handler feeding `queue`.
    pub fn new(relay: Arc<DiscordRelay>, queue: mpsc::Sender<InboundMessage>) -> Self {
        Self { relay, queue }
    }

    /// Apply the listener guards and queue the message for the relay worker.
    ///
    /// Nothing is awaited before the send, so on a current-thread runtime
    /// handler tasks reach the queue in the order they were spawned.
    pub async fn enqueue(&self, inbound: InboundMessage) {
        if let Err(reason) = self.relay.admit(&inbound) {
            debug!(channel_id = inbound.channel_id, ?reason, "message not relayed");
            return;
        }

        debug!(
            author = %inbound.author_name,
            attachments = inbound.attachments.len(),
            "queueing message for relay"
        );
        if self.queue.send(inbound).await.is_err() {
            warn!("relay worker stopped, dropping message");
        }
    }
}

/// Reduce a serenity message to what the relay needs.
///
/// The author name prefers the guild nickname, then the global display name,
/// then the username.
pub fn inbound_message(msg: &Message) -> InboundMessage {
    let author_name = msg
        .member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .or_else(|| msg.author.global_name.clone())
        .unwrap_or_else(|| msg.author.name.clone());

    InboundMessage {
        author_id: msg.author.id.get(),
        author_name,
        author_avatar_url: Some(msg.author.face()),
        author_is_bot: msg.author.bot || msg.webhook_id.is_some(),
        channel_id: msg.channel_id.get(),
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| AttachmentRef {
                filename: a.filename.clone(),
                url: a.url.clone(),
                size: u64::from(a.size),
            })
            .collect(),
    }
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.relay.set_self_id(ready.user.id.get());
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        self.enqueue(inbound_message(&msg)).await;
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        info!("gateway session resumed");
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        info!(
            shard = ?event.shard_id,
            old = ?event.old,
            new = ?event.new,
            "gateway connection stage changed"
        );
    }
}
