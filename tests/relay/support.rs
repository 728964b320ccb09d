//! In-memory [`RelayPlatform`] used by the relay tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use channel_relay::relay::{
    AttachmentRef, InboundMessage, OutboundMessage, PlatformError, RelayPlatform, RelayRule,
};

pub const SOURCE: u64 = 100;
pub const TARGET: u64 = 200;
pub const RULE: RelayRule = RelayRule {
    source: SOURCE,
    target: TARGET,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockWebhook {
    pub id: u64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Webhook {
        webhook_id: u64,
        message: OutboundMessage,
    },
    Plain {
        channel_id: u64,
        message: OutboundMessage,
    },
}

/// Records every call; failures are configured up front.
#[derive(Default)]
pub struct MockPlatform {
    pub missing_channels: HashSet<u64>,
    pub existing_webhooks: Mutex<HashMap<u64, Vec<MockWebhook>>>,
    pub webhook_error: Option<PlatformError>,
    pub execute_error: Option<PlatformError>,
    pub send_error: Option<PlatformError>,
    pub failing_urls: HashSet<String>,
    pub create_delay: Option<Duration>,
    pub list_calls: AtomicU32,
    pub created: AtomicU32,
    pub downloads: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<Sent>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_webhook(self, channel_id: u64, id: u64, name: &str) -> Self {
        self.existing_webhooks
            .lock()
            .expect("webhook lock")
            .entry(channel_id)
            .or_default()
            .push(MockWebhook {
                id,
                name: Some(name.to_owned()),
            });
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().expect("downloads lock").clone()
    }
}

#[async_trait]
impl RelayPlatform for MockPlatform {
    type Webhook = MockWebhook;

    async fn resolve_channel(&self, channel_id: u64) -> Result<(), PlatformError> {
        if self.missing_channels.contains(&channel_id) {
            return Err(PlatformError::NotFound(format!("channel {channel_id}")));
        }
        Ok(())
    }

    async fn webhooks(&self, channel_id: u64) -> Result<Vec<MockWebhook>, PlatformError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.webhook_error {
            return Err(err.clone());
        }
        Ok(self
            .existing_webhooks
            .lock()
            .expect("webhook lock")
            .get(&channel_id)
            .cloned()
            .unwrap_or_default())
    }

    fn webhook_name<'a>(&self, webhook: &'a MockWebhook) -> Option<&'a str> {
        webhook.name.as_deref()
    }

    async fn create_webhook(
        &self,
        channel_id: u64,
        name: &str,
    ) -> Result<MockWebhook, PlatformError> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.webhook_error {
            return Err(err.clone());
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let webhook = MockWebhook {
            id: 1000_u64.saturating_add(u64::from(n)),
            name: Some(name.to_owned()),
        };
        self.existing_webhooks
            .lock()
            .expect("webhook lock")
            .entry(channel_id)
            .or_default()
            .push(webhook.clone());
        Ok(webhook)
    }

    async fn execute_webhook(
        &self,
        webhook: &MockWebhook,
        message: OutboundMessage,
    ) -> Result<(), PlatformError> {
        if let Some(err) = &self.execute_error {
            return Err(err.clone());
        }
        self.sent.lock().expect("sent lock").push(Sent::Webhook {
            webhook_id: webhook.id,
            message,
        });
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: u64,
        message: OutboundMessage,
    ) -> Result<(), PlatformError> {
        if let Some(err) = &self.send_error {
            return Err(err.clone());
        }
        self.sent
            .lock()
            .expect("sent lock")
            .push(Sent::Plain { channel_id, message });
        Ok(())
    }

    async fn download(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, PlatformError> {
        self.downloads
            .lock()
            .expect("downloads lock")
            .push(attachment.url.clone());
        if self.failing_urls.contains(&attachment.url) {
            return Err(PlatformError::Transient(format!(
                "download {} timed out",
                attachment.url
            )));
        }
        Ok(attachment.filename.as_bytes().to_vec())
    }
}

pub fn attachment(filename: &str) -> AttachmentRef {
    AttachmentRef {
        filename: filename.to_owned(),
        url: format!("https://cdn.example/{filename}"),
        size: 10,
    }
}

pub fn message(content: &str, attachments: Vec<AttachmentRef>) -> InboundMessage {
    InboundMessage {
        author_id: 42,
        author_name: "Alice".to_owned(),
        author_avatar_url: Some("https://cdn.example/avatars/alice.png".to_owned()),
        author_is_bot: false,
        channel_id: SOURCE,
        content: content.to_owned(),
        attachments,
    }
}
