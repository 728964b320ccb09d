//! [`RelayPlatform`] implementation on top of serenity's HTTP client.
//!
//! Channel, webhook, and message calls go through serenity. Attachment bytes
//! are fetched from the CDN with a plain `reqwest` client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{
    ChannelId, CreateAttachment, CreateMessage, CreateWebhook, ExecuteWebhook, Http, Webhook,
};
use tracing::warn;

use crate::relay::{AttachmentRef, OutboundMessage, PlatformError, RelayPlatform};

/// HTTP connect timeout for attachment downloads.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Discord-backed platform.
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
    client: reqwest::Client,
}

impl SerenityPlatform {
    /// Wrap a serenity HTTP client.
    pub fn new(http: Arc<Http>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self { http, client }
    }

    /// Build a platform from a bot token.
    pub fn from_token(token: &str) -> Self {
        Self::new(Arc::new(Http::new(token)))
    }
}

#[async_trait]
impl RelayPlatform for SerenityPlatform {
    type Webhook = Webhook;

    async fn resolve_channel(&self, channel_id: u64) -> Result<(), PlatformError> {
        self.http
            .get_channel(ChannelId::new(channel_id))
            .await
            .map(|_| ())
            .map_err(|e| map_error("get channel", &e))
    }

    async fn webhooks(&self, channel_id: u64) -> Result<Vec<Webhook>, PlatformError> {
        ChannelId::new(channel_id)
            .webhooks(&*self.http)
            .await
            .map_err(|e| map_error("list webhooks", &e))
    }

    fn webhook_name<'a>(&self, webhook: &'a Webhook) -> Option<&'a str> {
        webhook.name.as_deref()
    }

    async fn create_webhook(&self, channel_id: u64, name: &str) -> Result<Webhook, PlatformError> {
        ChannelId::new(channel_id)
            .create_webhook(&*self.http, CreateWebhook::new(name))
            .await
            .map_err(|e| map_error("create webhook", &e))
    }

    async fn execute_webhook(
        &self,
        webhook: &Webhook,
        message: OutboundMessage,
    ) -> Result<(), PlatformError> {
        let mut builder = ExecuteWebhook::new();
        if let Some(content) = message.content {
            builder = builder.content(content);
        }
        if let Some(username) = message.username {
            builder = builder.username(username);
        }
        if let Some(avatar_url) = message.avatar_url {
            builder = builder.avatar_url(avatar_url);
        }
        builder = builder.add_files(
            message
                .files
                .into_iter()
                .map(|f| CreateAttachment::bytes(f.data, f.filename)),
        );

        webhook
            .execute(&*self.http, false, builder)
            .await
            .map(|_| ())
            .map_err(|e| map_error("execute webhook", &e))
    }

    async fn send_message(
        &self,
        channel_id: u64,
        message: OutboundMessage,
    ) -> Result<(), PlatformError> {
        let mut builder = CreateMessage::new();
        if let Some(content) = message.content {
            builder = builder.content(content);
        }
        builder = builder.add_files(
            message
                .files
                .into_iter()
                .map(|f| CreateAttachment::bytes(f.data, f.filename)),
        );

        ChannelId::new(channel_id)
            .send_message(&*self.http, builder)
            .await
            .map(|_| ())
            .map_err(|e| map_error("send message", &e))
    }

    async fn download(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, PlatformError> {
        let resp = self
            .client
            .get(&attachment.url)
            .send()
            .await
            .map_err(|e| PlatformError::Transient(format!("download: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error("download", status.as_u16(), &attachment.url));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| PlatformError::Transient(format!("download body: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Classify a serenity error by its HTTP status.
fn map_error(op: &str, err: &serenity::Error) -> PlatformError {
    if let serenity::Error::Http(http_err) = err {
        if let Some(status) = http_err.status_code() {
            return status_error(op, status.as_u16(), &err.to_string());
        }
    }
    PlatformError::Transient(format!("{op}: {err}"))
}

/// Map an HTTP status to a [`PlatformError`].
pub fn status_error(op: &str, status: u16, detail: &str) -> PlatformError {
    match status {
        401 | 403 => PlatformError::PermissionDenied(format!("{op}: {detail}")),
        404 => PlatformError::NotFound(format!("{op}: {detail}")),
        _ => PlatformError::Transient(format!("{op}: HTTP {status}: {detail}")),
    }
}
