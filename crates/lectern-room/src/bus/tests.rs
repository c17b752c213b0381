//! Bus client tests against the development broker.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lectern_broker::Broker;
use tokio::sync::mpsc;

use super::*;

fn fast_config(url: String) -> BusConfig {
    BusConfig {
        url,
        heartbeat_interval_secs: 1,
        reconnect_delay_secs: 1,
        max_reconnect_delay_secs: 1,
        connect_timeout_secs: 2,
    }
}

async fn wait_connected(client: &BusClient) {
    let mut state = client.connection_state();
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|c| *c))
        .await
        .expect("bus did not connect")
        .unwrap();
}

async fn wait_members(broker: &Broker, topic: &str, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while broker.store().member_count(topic).await != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("broker membership did not settle");
}

fn collector() -> (
    impl Fn(&BusMessage) + Send + Sync + 'static,
    mpsc::UnboundedReceiver<BusMessage>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (move |m: &BusMessage| drop(tx.send(m.clone())), rx)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<BusMessage>) -> BusMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("channel closed")
}

#[test]
fn debug_hides_query_string() {
    let config = BusConfig::new("wss://bus.example.com/socket?token=secret");
    let debug = format!("{config:?}");
    assert!(debug.contains("wss://bus.example.com/socket"));
    assert!(!debug.contains("secret"));
}

#[tokio::test]
async fn publish_while_disconnected_is_suppressed() {
    let client = BusClient::new(BusConfig::default());
    assert!(!client.is_connected());
    assert_eq!(
        client.publish("room:demo:whiteboard", "board-update", serde_json::json!({})),
        PublishStatus::Suppressed
    );
}

#[tokio::test]
async fn disconnect_without_connect_is_safe() {
    let client = BusClient::new(BusConfig::default());
    client.disconnect().await;
    client.disconnect().await;
    assert!(!client.is_connected());
}

#[tokio::test]
async fn broadcast_reaches_other_subscriber() {
    let broker = Broker::start("127.0.0.1:0").await.unwrap();
    let alice = BusClient::new(fast_config(broker.ws_url()));
    let bob = BusClient::new(fast_config(broker.ws_url()));

    let (handler, mut bob_rx) = collector();
    let _bob_sub = bob.subscribe("room:demo", handler);
    let (handler, mut alice_rx) = collector();
    let _alice_sub = alice.subscribe("room:demo", handler);

    alice.connect();
    alice.connect();
    bob.connect();
    wait_connected(&alice).await;
    wait_connected(&bob).await;
    wait_members(&broker, "room:demo", 2).await;

    let status = alice.publish("room:demo", "board-update", serde_json::json!({"n": 1}));
    assert_eq!(status, PublishStatus::Sent);

    let message = next(&mut bob_rx).await;
    assert_eq!(message.topic, "room:demo");
    assert_eq!(message.event, "board-update");
    assert_eq!(message.payload, serde_json::json!({"n": 1}));

    // No self-echo.
    assert!(
        tokio::time::timeout(Duration::from_millis(200), alice_rx.recv())
            .await
            .is_err()
    );

    alice.disconnect().await;
    bob.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn cancelled_subscription_stops_delivery() {
    let broker = Broker::start("127.0.0.1:0").await.unwrap();
    let alice = BusClient::new(fast_config(broker.ws_url()));
    let bob = BusClient::new(fast_config(broker.ws_url()));
    alice.connect();
    bob.connect();
    wait_connected(&alice).await;
    wait_connected(&bob).await;

    let (handler, mut kept_rx) = collector();
    let _kept = bob.subscribe("t", handler);
    let (handler, mut cancelled_rx) = collector();
    let cancelled = bob.subscribe("t", handler);
    wait_members(&broker, "t", 1).await;

    cancelled.cancel();
    cancelled.cancel();
    assert!(!cancelled.is_active());

    alice.publish("t", "ping", serde_json::json!(1));
    assert_eq!(next(&mut kept_rx).await.event, "ping");
    assert!(cancelled_rx.try_recv().is_err());

    alice.disconnect().await;
    bob.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn last_cancel_leaves_topic() {
    let broker = Broker::start("127.0.0.1:0").await.unwrap();
    let client = BusClient::new(fast_config(broker.ws_url()));
    client.connect();
    wait_connected(&client).await;

    let sub = client.subscribe("t", |_| {});
    wait_members(&broker, "t", 1).await;
    sub.cancel();
    wait_members(&broker, "t", 0).await;

    client.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn dropping_subscription_keeps_delivery() {
    let broker = Broker::start("127.0.0.1:0").await.unwrap();
    let alice = BusClient::new(fast_config(broker.ws_url()));
    let bob = BusClient::new(fast_config(broker.ws_url()));
    alice.connect();
    bob.connect();
    wait_connected(&alice).await;
    wait_connected(&bob).await;

    let (handler, mut rx) = collector();
    drop(bob.subscribe("t", handler));
    wait_members(&broker, "t", 1).await;

    alice.publish("t", "still-here", serde_json::json!(null));
    assert_eq!(next(&mut rx).await.event, "still-here");

    alice.disconnect().await;
    bob.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn reconnect_rejoins_live_topics() {
    let broker = Broker::start("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = broker.local_addr();
    let url = broker.ws_url();

    let bob = BusClient::new(fast_config(url.clone()));
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let _sub = bob.subscribe("room:demo", move |m| {
        sink.lock().unwrap().push(m.event.clone());
    });
    let dead = bob.subscribe("room:gone", |_| {});
    dead.cancel();

    bob.connect();
    wait_connected(&bob).await;
    wait_members(&broker, "room:demo", 1).await;

    // Kill the broker and bring a fresh one up on the same port.
    let mut state = bob.connection_state();
    broker.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|c| !*c))
        .await
        .unwrap()
        .unwrap();
    let broker = Broker::start(&addr.to_string()).await.unwrap();

    wait_connected(&bob).await;
    wait_members(&broker, "room:demo", 1).await;
    assert_eq!(broker.store().member_count("room:gone").await, 0);

    let alice = BusClient::new(fast_config(url));
    alice.connect();
    wait_connected(&alice).await;
    alice.publish("room:demo", "after-reconnect", serde_json::json!({}));

    tokio::time::timeout(Duration::from_secs(5), async {
        while received.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(received.lock().unwrap().as_slice(), ["after-reconnect"]);

    alice.disconnect().await;
    bob.disconnect().await;
    broker.shutdown().await;
}

#[tokio::test]
async fn connect_failure_keeps_retrying_until_disconnect() {
    // Nothing listens on this port.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BusClient::new(fast_config(format!("ws://{addr}/socket/websocket")));
    client.connect();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!client.is_connected());
    assert_eq!(
        client.publish("t", "e", serde_json::json!({})),
        PublishStatus::Suppressed
    );

    tokio::time::timeout(Duration::from_secs(5), client.disconnect())
        .await
        .unwrap();
}
