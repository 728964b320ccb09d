//! Lookup-or-create of the relay webhook, cached per channel.
//!
//! Each channel gets its own async mutex around the lookup-or-create
//! sequence, so two messages arriving before the first resolution finishes
//! still produce a single webhook.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{PlatformError, RelayPlatform};

type Slot<W> = Arc<Mutex<Option<W>>>;

/// Channel id → resolved webhook.
pub struct WebhookCache<W> {
    name: String,
    slots: Mutex<HashMap<u64, Slot<W>>>,
}

impl<W: Clone + Send + Sync + 'static> WebhookCache<W> {
    /// Create an empty cache for webhooks labelled `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Label matched against existing webhooks and used for creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the webhook for a channel, or `None` when it is unavailable.
    ///
    /// Cache hits return immediately. On a miss the channel's webhooks are
    /// searched for one with the configured name, and one is created if none
    /// matches. Permission and transient failures are logged and yield
    /// `None`; they are not cached, so a later call tries again.
    pub async fn resolve<P>(&self, platform: &P, channel_id: u64) -> Option<W>
    where
        P: RelayPlatform<Webhook = W>,
    {
        let slot = self.slot(channel_id).await;
        let mut cached = slot.lock().await;
        if let Some(webhook) = cached.as_ref() {
            return Some(webhook.clone());
        }

        match self.lookup_or_create(platform, channel_id).await {
            Ok(webhook) => {
                *cached = Some(webhook.clone());
                Some(webhook)
            }
            Err(PlatformError::PermissionDenied(reason)) => {
                warn!(
                    channel_id,
                    %reason,
                    "missing webhook permission, falling back to plain relay"
                );
                None
            }
            Err(e) => {
                warn!(channel_id, error = %e, "webhook unavailable, falling back to plain relay");
                None
            }
        }
    }

    /// Drop the cached webhook for a channel.
    pub async fn evict(&self, channel_id: u64) {
        let slot = self.slots.lock().await.get(&channel_id).cloned();
        if let Some(slot) = slot {
            *slot.lock().await = None;
            debug!(channel_id, "webhook evicted from cache");
        }
    }

    /// Whether a webhook for the channel is currently cached.
    pub async fn is_cached(&self, channel_id: u64) -> bool {
        let slot = self.slots.lock().await.get(&channel_id).cloned();
        match slot {
            Some(slot) => slot.lock().await.is_some(),
            None => false,
        }
    }

    async fn slot(&self, channel_id: u64) -> Slot<W> {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(channel_id).or_default())
    }

    async fn lookup_or_create<P>(&self, platform: &P, channel_id: u64) -> Result<W, PlatformError>
    where
        P: RelayPlatform<Webhook = W>,
    {
        let existing = platform.webhooks(channel_id).await?;
        if let Some(webhook) = existing
            .into_iter()
            .find(|w| platform.webhook_name(w) == Some(self.name.as_str()))
        {
            debug!(channel_id, name = %self.name, "reusing existing webhook");
            return Ok(webhook);
        }

        let webhook = platform.create_webhook(channel_id, &self.name).await?;
        info!(channel_id, name = %self.name, "created relay webhook");
        Ok(webhook)
    }
}
