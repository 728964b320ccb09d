//! Relay worker: drains the handler queue one message at a time.
//!
//! A single consumer keeps relayed messages in the order the gateway
//! delivered them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{InboundMessage, Relay, RelayPlatform};

/// Spawn the worker task. It stops when every queue sender is dropped.
pub fn spawn_worker<P>(
    relay: Arc<Relay<P::Webhook>>,
    platform: P,
    mut queue: mpsc::Receiver<InboundMessage>,
) -> JoinHandle<()>
where
    P: RelayPlatform + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            let outcome = relay.deliver(&platform, &message).await;
            debug!(?outcome, "relay finished message");
        }
        info!("relay queue closed, worker stopping");
    })
}

/// Close the queue and give the worker `grace` to finish what is queued.
///
/// Returns `true` when the worker drained in time. Otherwise the worker is
/// aborted and whatever it still held is lost.
pub async fn drain_worker(
    queue: mpsc::Sender<InboundMessage>,
    mut worker: JoinHandle<()>,
    grace: Duration,
) -> bool {
    let pending = queue.max_capacity().saturating_sub(queue.capacity());
    drop(queue);
    info!(pending, grace_secs = grace.as_secs(), "draining relay queue");

    match tokio::time::timeout(grace, &mut worker).await {
        Ok(_) => {
            debug!("relay worker drained");
            true
        }
        Err(_) => {
            warn!(pending, "relay queue not drained in time, aborting worker");
            worker.abort();
            false
        }
    }
}
