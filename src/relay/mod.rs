//! Relay core: listener guards, delivery resolution, webhook caching, and
//! attachment fetching.
//!
//! Everything here is platform-agnostic. Outbound calls go through the
//! [`RelayPlatform`] trait so the forwarding rules can be exercised without a
//! gateway connection; the Discord implementation lives in
//! [`crate::discord::platform`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

pub mod attachments;
pub mod delivery;
pub mod listener;
pub mod webhook;
pub mod worker;

pub use delivery::{fallback_content, DeliveryPath, RelayOutcome};
pub use listener::IgnoreReason;

use self::webhook::WebhookCache;

/// Default label of the webhook the relay posts through.
pub const DEFAULT_WEBHOOK_NAME: &str = "Message Forwarder";

/// Fixed source/target channel pair for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayRule {
    /// Channel whose messages are relayed.
    pub source: u64,
    /// Channel the relayed messages are posted into.
    pub target: u64,
}

/// A remote attachment reference carried by an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Original filename as uploaded.
    pub filename: String,
    /// Download URL.
    pub url: String,
    /// Size in bytes as reported by the platform.
    pub size: u64,
}

/// An attachment whose bytes have been downloaded.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchedAttachment {
    /// Sanitized filename used for re-upload.
    pub filename: String,
    /// Raw file contents.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for FetchedAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedAttachment")
            .field("filename", &self.filename)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// An inbound message event, reduced to what the relay needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Platform user id of the author.
    pub author_id: u64,
    /// Name shown for the author (nickname, display name, or username).
    pub author_name: String,
    /// Avatar URL of the author, if any.
    pub author_avatar_url: Option<String>,
    /// Whether the author is a bot or webhook account.
    pub author_is_bot: bool,
    /// Channel the message was posted in.
    pub channel_id: u64,
    /// Text content, possibly empty.
    pub content: String,
    /// Attachments in their original order.
    pub attachments: Vec<AttachmentRef>,
}

/// A message ready to hand to the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Text content; `None` when the message only carries files.
    pub content: Option<String>,
    /// Display name override (webhook sends only).
    pub username: Option<String>,
    /// Avatar URL override (webhook sends only).
    pub avatar_url: Option<String>,
    /// Files to upload alongside the content.
    pub files: Vec<FetchedAttachment>,
}

/// Errors reported by a [`RelayPlatform`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The relay's identity lacks the permission for this call.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The referenced channel, webhook, or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other failure (rate limit, network, server error).
    #[error("platform request failed: {0}")]
    Transient(String),
}

/// Per-message relay failures. Logged and dropped, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The target channel could not be resolved.
    #[error("target channel {channel_id} unavailable: {source}")]
    Resolution {
        /// Target channel id.
        channel_id: u64,
        /// Underlying platform error.
        source: PlatformError,
    },
    /// Dispatching the relayed message failed.
    #[error("dispatch via {path} failed: {source}")]
    Transfer {
        /// Delivery path that was attempted.
        path: DeliveryPath,
        /// Underlying platform error.
        source: PlatformError,
    },
}

/// Outbound platform operations used by the relay.
#[async_trait]
pub trait RelayPlatform: Send + Sync {
    /// Platform webhook handle.
    type Webhook: Clone + Send + Sync + 'static;

    /// Check that a channel exists and is accessible.
    async fn resolve_channel(&self, channel_id: u64) -> Result<(), PlatformError>;

    /// List the webhooks bound to a channel.
    async fn webhooks(&self, channel_id: u64) -> Result<Vec<Self::Webhook>, PlatformError>;

    /// Name of a webhook, if it has one.
    fn webhook_name<'a>(&self, webhook: &'a Self::Webhook) -> Option<&'a str>;

    /// Create a webhook on a channel.
    async fn create_webhook(
        &self,
        channel_id: u64,
        name: &str,
    ) -> Result<Self::Webhook, PlatformError>;

    /// Post a message through a webhook.
    async fn execute_webhook(
        &self,
        webhook: &Self::Webhook,
        message: OutboundMessage,
    ) -> Result<(), PlatformError>;

    /// Post a plain message under the relay's own identity.
    async fn send_message(
        &self,
        channel_id: u64,
        message: OutboundMessage,
    ) -> Result<(), PlatformError>;

    /// Download the bytes of an attachment.
    async fn download(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, PlatformError>;
}

#[async_trait]
impl<T: RelayPlatform> RelayPlatform for Arc<T> {
    type Webhook = T::Webhook;

    async fn resolve_channel(&self, channel_id: u64) -> Result<(), PlatformError> {
        (**self).resolve_channel(channel_id).await
    }

    async fn webhooks(&self, channel_id: u64) -> Result<Vec<Self::Webhook>, PlatformError> {
        (**self).webhooks(channel_id).await
    }

    fn webhook_name<'a>(&self, webhook: &'a Self::Webhook) -> Option<&'a str> {
        (**self).webhook_name(webhook)
    }

    async fn create_webhook(
        &self,
        channel_id: u64,
        name: &str,
    ) -> Result<Self::Webhook, PlatformError> {
        (**self).create_webhook(channel_id, name).await
    }

    async fn execute_webhook(
        &self,
        webhook: &Self::Webhook,
        message: OutboundMessage,
    ) -> Result<(), PlatformError> {
        (**self).execute_webhook(webhook, message).await
    }

    async fn send_message(
        &self,
        channel_id: u64,
        message: OutboundMessage,
    ) -> Result<(), PlatformError> {
        (**self).send_message(channel_id, message).await
    }

    async fn download(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, PlatformError> {
        (**self).download(attachment).await
    }
}

/// Relay state shared by the gateway handler and the relay worker.
///
/// Holds the channel rule, the relay's own user id once known, and the
/// webhook cache. Outlives individual gateway connections.
pub struct Relay<W> {
    rule: RelayRule,
    impersonate: bool,
    self_id: AtomicU64,
    webhooks: WebhookCache<W>,
}

impl<W> std::fmt::Debug for Relay<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("rule", &self.rule)
            .field("impersonate", &self.impersonate)
            .field("self_id", &self.self_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl<W: Clone + Send + Sync + 'static> Relay<W> {
    /// Create relay state for a rule.
    ///
    /// `impersonate = false` always uses the fallback path.
    pub fn new(rule: RelayRule, webhook_name: impl Into<String>, impersonate: bool) -> Self {
        Self {
            rule,
            impersonate,
            self_id: AtomicU64::new(0),
            webhooks: WebhookCache::new(webhook_name),
        }
    }

    /// The configured channel rule.
    pub fn rule(&self) -> RelayRule {
        self.rule
    }

    /// The webhook cache.
    pub fn webhooks(&self) -> &WebhookCache<W> {
        &self.webhooks
    }

    /// Record the relay's own user id (from the gateway `ready` event).
    pub fn set_self_id(&self, id: u64) {
        self.self_id.store(id, Ordering::Relaxed);
    }

    /// The relay's own user id, once known.
    pub fn self_id(&self) -> Option<u64> {
        match self.self_id.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    /// Run the listener guards and, when they pass, deliver the message.
    pub async fn handle<P>(&self, platform: &P, message: &InboundMessage) -> RelayOutcome
    where
        P: RelayPlatform<Webhook = W>,
    {
        if let Err(reason) = self.admit(message) {
            return RelayOutcome::Ignored(reason);
        }
        self.deliver(platform, message).await
    }
}
