//! Discord adapter: gateway handler, serenity-backed platform, and the
//! supervised connection loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use serenity::all::{Client, GatewayIntents, Webhook};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::RelaySettings;
use crate::relay::{worker, InboundMessage, Relay};
use crate::supervisor::{supervise, SupervisorExit};

pub mod handler;
pub mod platform;

use self::handler::RelayHandler;
use self::platform::SerenityPlatform;

/// How long queued messages may keep relaying after the supervisor stops.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Relay state specialised to Discord webhooks.
pub type DiscordRelay = Relay<Webhook>;

/// Gateway intents the relay needs.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Run the relay until `shutdown` resolves or connection attempts run out.
///
/// The relay worker and webhook cache are created once and survive
/// reconnects; each connection attempt builds a fresh gateway client.
pub async fn run<S>(settings: RelaySettings, shutdown: S) -> SupervisorExit
where
    S: Future<Output = ()>,
{
    let relay = Arc::new(DiscordRelay::new(
        settings.rule,
        settings.webhook_name.clone(),
        settings.impersonate,
    ));
    let (queue_tx, queue_rx) = mpsc::channel::<InboundMessage>(settings.queue_capacity);
    let platform = SerenityPlatform::from_token(&settings.token);
    let worker = worker::spawn_worker(Arc::clone(&relay), platform, queue_rx);

    info!(
        source = settings.rule.source,
        target = settings.rule.target,
        impersonate = settings.impersonate,
        "relay starting"
    );

    let token = settings.token;
    let exit = supervise(
        settings.retry,
        |_attempt| connect(token.clone(), Arc::clone(&relay), queue_tx.clone()),
        shutdown,
    )
    .await;

    worker::drain_worker(queue_tx, worker, DRAIN_GRACE).await;
    exit
}

/// One gateway connection. Returns when the connection ends.
async fn connect(
    token: String,
    relay: Arc<DiscordRelay>,
    queue: mpsc::Sender<InboundMessage>,
) -> anyhow::Result<()> {
    let mut client = Client::builder(&token, intents())
        .event_handler(RelayHandler::new(relay, queue))
        .await
        .context("failed to build discord client")?;

    client
        .start()
        .await
        .context("discord gateway connection failed")?;
    Ok(())
}
