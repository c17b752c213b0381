//! In-crate fakes for the token service and the media transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::error::SessionError;
use crate::identity::ScopedIdentity;
use crate::token::{TokenIntent, TokenProvider};
use crate::tracks::{MediaHandle, TrackKind};
use crate::transport::{
    MediaConnection, MediaError, MediaLink, MediaTransport, RemoteParticipant, RemotePublication,
    RemoteTrack, TransportEvent,
};

/// Poll `check` until it holds or five seconds pass.
pub(crate) async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}

/// A gate that holds callers until opened.
#[derive(Clone)]
pub(crate) struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    pub(crate) fn closed() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn open(&self) {
        self.tx.send_replace(true);
    }

    async fn pass(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

// ---------------------------------------------------------------------------
// Token provider
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct FakeTokenProvider {
    failure: Mutex<Option<String>>,
    gate: Mutex<Option<Gate>>,
    calls: Mutex<Vec<(TokenIntent, String, String)>>,
}

impl FakeTokenProvider {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    pub(crate) fn hold(&self) -> Gate {
        let gate = Gate::closed();
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// `(intent, room, wire identity)` per request.
    pub(crate) fn calls(&self) -> Vec<(TokenIntent, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenProvider for FakeTokenProvider {
    async fn request_token(
        &self,
        intent: TokenIntent,
        room: &str,
        identity: &ScopedIdentity,
    ) -> Result<String, SessionError> {
        self.calls
            .lock()
            .unwrap()
            .push((intent, room.to_string(), identity.wire_name()));

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(SessionError::TokenRequestFailed(reason));
        }
        Ok(format!("token:{room}:{}", identity.wire_name()))
    }
}

// ---------------------------------------------------------------------------
// Media transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MediaCounters {
    pub(crate) connects: AtomicUsize,
    pub(crate) captures: AtomicUsize,
    pub(crate) disconnects: AtomicUsize,
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    pub(crate) counters: Arc<MediaCounters>,
    connect_failure: Mutex<Option<String>>,
    capture_failure: Arc<Mutex<Option<String>>>,
    gate: Mutex<Option<Gate>>,
    tokens: Mutex<Vec<String>>,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_connect(&self, reason: &str) {
        *self.connect_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub(crate) fn fail_capture(&self, reason: &str) {
        *self.capture_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub(crate) fn hold(&self) -> Gate {
        let gate = Gate::closed();
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn captures(&self) -> usize {
        self.counters.captures.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.counters.disconnects.load(Ordering::SeqCst)
    }

    /// Tokens passed to `connect`, in order.
    pub(crate) fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    /// Push an event on the most recent connection's stream.
    pub(crate) async fn emit(&self, event: TransportEvent) {
        let tx = self.events.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

#[async_trait]
impl MediaTransport for FakeTransport {
    async fn connect(&self, _url: &str, token: &str) -> Result<MediaLink, MediaError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        if let Some(reason) = self.connect_failure.lock().unwrap().clone() {
            return Err(MediaError(reason));
        }

        let (tx, rx) = mpsc::channel(64);
        *self.events.lock().unwrap() = Some(tx);
        Ok(MediaLink {
            connection: Box::new(FakeConnection {
                counters: Arc::clone(&self.counters),
                capture_failure: Arc::clone(&self.capture_failure),
            }),
            events: rx,
        })
    }
}

struct FakeConnection {
    counters: Arc<MediaCounters>,
    capture_failure: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl MediaConnection for FakeConnection {
    async fn enable_camera_and_microphone(&self) -> Result<(), MediaError> {
        if let Some(reason) = self.capture_failure.lock().unwrap().clone() {
            return Err(MediaError(reason));
        }
        self.counters.captures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Event builders
// ---------------------------------------------------------------------------

pub(crate) fn track_subscribed(sid: &str, identity: &str, kind: TrackKind) -> TransportEvent {
    TransportEvent::TrackSubscribed {
        track: RemoteTrack {
            sid: sid.to_string(),
            kind,
            media_handle: MediaHandle(sid.len() as u64),
        },
        publication: RemotePublication {
            track_sid: sid.to_string(),
            kind,
        },
        participant: RemoteParticipant {
            identity: identity.to_string(),
        },
    }
}

pub(crate) fn track_unsubscribed(sid: &str, kind: TrackKind) -> TransportEvent {
    TransportEvent::TrackUnsubscribed {
        track: RemoteTrack {
            sid: sid.to_string(),
            kind,
            media_handle: MediaHandle(0),
        },
        publication: RemotePublication {
            track_sid: sid.to_string(),
            kind,
        },
    }
}
