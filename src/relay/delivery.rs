//! Delivery resolution: webhook relay when possible, plain annotated relay
//! otherwise.
//!
//! Delivery is at-most-once. Dispatch failures are logged and the message is
//! dropped; there is no retry queue.

use tracing::{debug, info, warn};

use super::attachments::fetch_all;
use super::{
    FetchedAttachment, IgnoreReason, InboundMessage, OutboundMessage, PlatformError, Relay,
    RelayError, RelayPlatform,
};

/// Maximum message length accepted by the platform.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Maximum webhook username length accepted by the platform.
pub const MAX_USERNAME_CHARS: usize = 80;

/// How a message was (or would have been) delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    /// Posted through the webhook under the author's name and avatar.
    Webhook,
    /// Posted under the relay's own identity with an author prefix.
    Fallback,
}

impl std::fmt::Display for DeliveryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Webhook => f.write_str("webhook"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Rejected by a listener guard.
    Ignored(IgnoreReason),
    /// Nothing to relay (no text and no usable attachments).
    Skipped,
    /// Posted to the target channel.
    Delivered {
        /// Path used.
        path: DeliveryPath,
        /// Number of files attached.
        files: usize,
    },
    /// Failed and dropped.
    Dropped(RelayError),
}

/// Content for the fallback path.
///
/// `"**{name}**: {text}"` for text messages, `"**{name}** sent an attachment"`
/// for attachment-only messages, `None` when there is nothing to say.
pub fn fallback_content(author_name: &str, text: &str, has_attachments: bool) -> Option<String> {
    if !text.is_empty() {
        Some(format!("**{author_name}**: {text}"))
    } else if has_attachments {
        Some(format!("**{author_name}** sent an attachment"))
    } else {
        None
    }
}

/// Truncate to `max` characters, ending with an ellipsis when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

impl<W: Clone + Send + Sync + 'static> Relay<W> {
    /// Deliver an admitted message to the target channel.
    ///
    /// Resolves the target channel, picks the webhook or fallback path,
    /// downloads attachments, and dispatches once.
    pub async fn deliver<P>(&self, platform: &P, message: &InboundMessage) -> RelayOutcome
    where
        P: RelayPlatform<Webhook = W>,
    {
        if message.content.is_empty() && message.attachments.is_empty() {
            debug!(author = %message.author_name, "message has no text or attachments, skipping");
            return RelayOutcome::Skipped;
        }

        let target = self.rule().target;
        if let Err(source) = platform.resolve_channel(target).await {
            let err = RelayError::Resolution {
                channel_id: target,
                source,
            };
            warn!(error = %err, "dropping message");
            return RelayOutcome::Dropped(err);
        }

        let webhook = if self.impersonate {
            self.webhooks().resolve(platform, target).await
        } else {
            None
        };

        let files = fetch_all(platform, &message.attachments).await;

        match webhook {
            Some(webhook) => {
                self.send_via_webhook(platform, &webhook, message, files)
                    .await
            }
            None => self.send_fallback(platform, message, files).await,
        }
    }

    async fn send_via_webhook<P>(
        &self,
        platform: &P,
        webhook: &W,
        message: &InboundMessage,
        files: Vec<FetchedAttachment>,
    ) -> RelayOutcome
    where
        P: RelayPlatform<Webhook = W>,
    {
        let content = (!message.content.is_empty())
            .then(|| truncate_chars(&message.content, MAX_CONTENT_CHARS));
        if content.is_none() && files.is_empty() {
            warn!(
                author = %message.author_name,
                "all attachments failed and message has no text, nothing to relay"
            );
            return RelayOutcome::Skipped;
        }

        let username = (!message.author_name.is_empty())
            .then(|| truncate_chars(&message.author_name, MAX_USERNAME_CHARS));
        let file_count = files.len();
        let outbound = OutboundMessage {
            content,
            username,
            avatar_url: message.author_avatar_url.clone(),
            files,
        };

        match platform.execute_webhook(webhook, outbound).await {
            Ok(()) => {
                info!(
                    author = %message.author_name,
                    files = file_count,
                    "message relayed via webhook"
                );
                RelayOutcome::Delivered {
                    path: DeliveryPath::Webhook,
                    files: file_count,
                }
            }
            Err(source) => {
                if matches!(source, PlatformError::NotFound(_)) {
                    self.webhooks().evict(self.rule().target).await;
                }
                let err = RelayError::Transfer {
                    path: DeliveryPath::Webhook,
                    source,
                };
                warn!(author = %message.author_name, error = %err, "dropping message");
                RelayOutcome::Dropped(err)
            }
        }
    }

    async fn send_fallback<P>(
        &self,
        platform: &P,
        message: &InboundMessage,
        files: Vec<FetchedAttachment>,
    ) -> RelayOutcome
    where
        P: RelayPlatform<Webhook = W>,
    {
        let Some(content) = fallback_content(
            &message.author_name,
            &message.content,
            !message.attachments.is_empty(),
        ) else {
            return RelayOutcome::Skipped;
        };

        let file_count = files.len();
        let outbound = OutboundMessage {
            content: Some(truncate_chars(&content, MAX_CONTENT_CHARS)),
            username: None,
            avatar_url: None,
            files,
        };

        match platform.send_message(self.rule().target, outbound).await {
            Ok(()) => {
                info!(
                    author = %message.author_name,
                    files = file_count,
                    "message relayed as plain message"
                );
                RelayOutcome::Delivered {
                    path: DeliveryPath::Fallback,
                    files: file_count,
                }
            }
            Err(source) => {
                let err = RelayError::Transfer {
                    path: DeliveryPath::Fallback,
                    source,
                };
                warn!(author = %message.author_name, error = %err, "dropping message");
                RelayOutcome::Dropped(err)
            }
        }
    }
}
