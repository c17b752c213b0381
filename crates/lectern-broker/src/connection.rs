//! Per-connection handler: track topic memberships and fan out broadcasts.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::protocol::{self, Frame};
use crate::topics::{ConnId, TopicStore};

type Sink = SplitSink<WebSocketStream<TcpStream>, Message>;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Handle a single WebSocket connection until it closes or the broker stops.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    store: TopicStore,
    shutdown: CancellationToken,
) {
    let conn = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::channel::<String>(256);

    tracing::info!(peer = %addr, conn, "Client connected");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }

            // Broadcasts from other members → this client's WebSocket
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<Frame>(&text) {
                            Ok(frame) => {
                                if handle_frame(&frame, &text, conn, &tx, &store, &mut sink)
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(peer = %addr, error = %e, "Invalid frame");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    store.remove_connection(conn).await;
    tracing::info!(peer = %addr, conn, "Client disconnected");
}

async fn handle_frame(
    frame: &Frame,
    raw: &str,
    conn: ConnId,
    tx: &mpsc::Sender<String>,
    store: &TopicStore,
    sink: &mut Sink,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    match frame.event.as_str() {
        protocol::JOIN => {
            store.join(&frame.topic, conn, tx.clone()).await;
            tracing::debug!(conn, topic = %frame.topic, "Joined topic");
            send_frame(sink, &Frame::reply_ok(frame)).await
        }
        protocol::LEAVE => {
            store.leave(&frame.topic, conn).await;
            tracing::debug!(conn, topic = %frame.topic, "Left topic");
            send_frame(sink, &Frame::reply_ok(frame)).await
        }
        protocol::HEARTBEAT => send_frame(sink, &Frame::reply_ok(frame)).await,
        protocol::BROADCAST => {
            let peers = store.peers(&frame.topic, conn).await;
            tracing::debug!(conn, topic = %frame.topic, peers = peers.len(), "Broadcast");
            fan_out(&frame.topic, &peers, raw);
            Ok(())
        }
        other => {
            tracing::debug!(conn, event = %other, "Unsupported event");
            send_frame(sink, &Frame::reply_error(frame, "unsupported event")).await
        }
    }
}

/// Queue `raw` for every peer without waiting. A peer whose outbox is full
/// misses the message. Returns how many peers it was queued for.
pub(crate) fn fan_out(topic: &str, peers: &[mpsc::Sender<String>], raw: &str) -> usize {
    let mut delivered = 0;
    for peer in peers {
        match peer.try_send(raw.to_string()) {
            Ok(()) => delivered += 1,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(topic, "Peer outbox full, dropping broadcast");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(topic, "Peer channel closed");
            }
        }
    }
    delivered
}

/// Send a Frame as a JSON text frame.
async fn send_frame(
    sink: &mut Sink,
    frame: &Frame,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    match serde_json::to_string(frame) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode frame");
            Ok(())
        }
    }
}
