//! Background WebSocket connection loop with auto-reconnect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::BusShared;
use super::handler::handle_phoenix_message;
use super::subscription::lock_table;
use super::types::{BusCommand, BusConfig, PhoenixMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Ref Counter
// ---------------------------------------------------------------------------

/// Monotonically increasing ref counter for Phoenix messages.
static REF_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_ref() -> String {
    REF_COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

async fn send_message<S>(ws_write: &Mutex<S>, msg: &PhoenixMessage) -> bool
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => {
            let mut writer = ws_write.lock().await;
            writer.send(WsMessage::Text(json.into())).await.is_ok()
        }
        Err(e) => {
            warn!(error = %e, event = %msg.event, "Failed to encode bus message");
            true
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Cancelled,
    Dropped,
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task managing the WebSocket connection with auto-reconnect.
pub(crate) async fn connection_loop(
    config: BusConfig,
    shared: Arc<BusShared>,
    cancel: CancellationToken,
) {
    let mut reconnect_delay = config.reconnect_delay_secs;
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);

    loop {
        info!(url = %config.redacted_url(), "Connecting to collaboration bus");

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = tokio::time::timeout(
                connect_timeout,
                tokio_tungstenite::connect_async(config.url.as_str()),
            ) => attempt,
        };

        match attempt {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = config.reconnect_delay_secs;
                let end = run_session(ws_stream, &config, &shared, &cancel).await;
                shared.connected.send_replace(false);
                if end == SessionEnd::Cancelled {
                    break;
                }
                info!("Collaboration bus connection lost");
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to collaboration bus");
            }
            Err(_elapsed) => {
                error!(
                    timeout_secs = config.connect_timeout_secs,
                    "Collaboration bus connection timed out"
                );
            }
        }

        // Exponential backoff reconnect.
        info!(
            delay = reconnect_delay,
            "Reconnecting in {} seconds", reconnect_delay
        );
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(reconnect_delay)) => {}
        }
        reconnect_delay = (reconnect_delay * 2).clamp(1, config.max_reconnect_delay_secs.max(1));
    }

    shared.connected.send_replace(false);
    debug!("Collaboration bus loop exited");
}

/// Drive one established connection until it drops or is cancelled.
async fn run_session(
    ws_stream: WsStream,
    config: &BusConfig,
    shared: &Arc<BusShared>,
    cancel: &CancellationToken,
) -> SessionEnd {
    let (ws_write, mut ws_read) = ws_stream.split();
    let ws_write = Arc::new(Mutex::new(ws_write));

    shared.connected.send_replace(true);
    info!("Connected to collaboration bus");

    // Rejoin every topic that still has live subscriptions.
    let topics = lock_table(&shared.subscriptions).topics();
    for topic in &topics {
        send_message(&ws_write, &PhoenixMessage::join(topic, next_ref())).await;
    }
    if !topics.is_empty() {
        debug!(count = topics.len(), "Rejoined topics");
    }

    let heartbeat_handle = tokio::spawn(heartbeat_task(
        Arc::clone(&ws_write),
        config.heartbeat_interval_secs,
    ));
    let cmd_handle = tokio::spawn(command_forwarder(Arc::clone(shared), Arc::clone(&ws_write)));

    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => break SessionEnd::Cancelled,
            msg = ws_read.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<PhoenixMessage>(&text) {
                        Ok(phoenix_msg) => handle_phoenix_message(&phoenix_msg, shared),
                        Err(_) => debug!(text = %text, "Unrecognized message from broker"),
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!("Broker closed connection");
                    break SessionEnd::Dropped;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break SessionEnd::Dropped;
                }
                Some(Ok(_)) => {}
            }
        }
    };

    heartbeat_handle.abort();
    cmd_handle.abort();
    // The forwarder holds the command receiver lock; let it go before the
    // next session spawns a new forwarder.
    let _ = cmd_handle.await;

    if end == SessionEnd::Cancelled {
        // Publishes queued before the disconnect still go out.
        let mut rx = shared.command_rx.lock().await;
        while let Ok(cmd) = rx.try_recv() {
            if let BusCommand::Broadcast {
                topic,
                event,
                payload,
            } = cmd
            {
                send_message(
                    &ws_write,
                    &PhoenixMessage::broadcast(&topic, &event, payload, next_ref()),
                )
                .await;
            }
        }
        drop(rx);

        let topics = lock_table(&shared.subscriptions).topics();
        for topic in &topics {
            send_message(&ws_write, &PhoenixMessage::leave(topic, next_ref())).await;
        }
        let mut writer = ws_write.lock().await;
        let _ = writer.send(WsMessage::Close(None)).await;
    }

    end
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

async fn heartbeat_task<S>(ws_write: Arc<Mutex<S>>, interval_secs: u64)
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        if !send_message(&ws_write, &PhoenixMessage::heartbeat(next_ref())).await {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Command Forwarder
// ---------------------------------------------------------------------------

async fn command_forwarder<S>(shared: Arc<BusShared>, ws_write: Arc<Mutex<S>>)
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    let mut rx = shared.command_rx.lock().await;
    while let Some(cmd) = rx.recv().await {
        let msg = match cmd {
            // The table is the source of truth: a join/leave queued before a
            // later cancel/subscribe must not undo it.
            BusCommand::Join { topic } => {
                if !lock_table(&shared.subscriptions).has_topic(&topic) {
                    continue;
                }
                PhoenixMessage::join(&topic, next_ref())
            }
            BusCommand::Leave { topic } => {
                if lock_table(&shared.subscriptions).has_topic(&topic) {
                    continue;
                }
                PhoenixMessage::leave(&topic, next_ref())
            }
            BusCommand::Broadcast {
                topic,
                event,
                payload,
            } => PhoenixMessage::broadcast(&topic, &event, payload, next_ref()),
        };
        if !send_message(&ws_write, &msg).await {
            warn!(topic = %msg.topic, event = %msg.event, "Failed to send bus message");
        }
    }
}
