//! Shared WebSocket transport with namespaced registration.
//!
//! Exactly one connection per page load: every widget that wants
//! realtime traffic registers through this manager instead of opening
//! its own socket. The manager owns the connection lifecycle —
//! bounded reconnection with backoff, an optimistic grace window that
//! absorbs the disconnect/reconnect pairs normal page navigation
//! produces, and fan-out of decoded pushes to namespaced handlers.
//!
//! ```text
//! widget A ──┐ on("a", "score_updated", …)
//! widget B ──┼ on("b", "timer_updated", …)      ┌──────────┐
//! widget C ──┘ emit(intent)                ◄──► │  server  │
//!          TransportManager (one socket)        └──────────┘
//! ```
//!
//! Failure semantics: connect errors count and log; at the attempt
//! ceiling realtime features degrade silently while the rest of the
//! page stays usable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use pitchside_proto::{Intent, Push};

use crate::pending::PendingTimer;

/// Callback fired on every (re)connect.
pub type ConnectCallback = Arc<dyn Fn() + Send + Sync>;
/// Callback fired after a disconnect outlives the grace window.
pub type DisconnectCallback = Arc<dyn Fn() + Send + Sync>;
/// Handler for a decoded server push.
pub type PushHandler = Arc<dyn Fn(&Push) + Send + Sync>;

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket endpoint of the live namespace.
    pub url: String,
    /// Connect attempts before giving up.
    pub max_attempts: u32,
    /// First backoff step; doubled per attempt.
    pub base_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
    /// Optimistic delay before a disconnect is reported.
    pub grace_window: Duration,
    /// Per-attempt connect timeout.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9090/live".to_string(),
            max_attempts: 8,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            grace_window: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Connection state as seen by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ───────────────────────────────────────────────────────────────────
// Handler registry
// ───────────────────────────────────────────────────────────────────

/// Namespaced handler table: everything a component registers lives
/// under its component id, so one `remove_component` call is the whole
/// teardown path.
pub(crate) struct Registry {
    connect: HashMap<String, ConnectCallback>,
    disconnect: HashMap<String, DisconnectCallback>,
    /// (component_id, event_name) → handler. Insert replaces.
    events: HashMap<(String, String), PushHandler>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            connect: HashMap::new(),
            disconnect: HashMap::new(),
            events: HashMap::new(),
        }
    }

    pub(crate) fn set_connect(&mut self, component: &str, cb: ConnectCallback) {
        self.connect.insert(component.to_string(), cb);
    }

    pub(crate) fn set_disconnect(&mut self, component: &str, cb: DisconnectCallback) {
        self.disconnect.insert(component.to_string(), cb);
    }

    /// Re-registering the same (component, event) pair replaces the
    /// prior handler rather than stacking a duplicate.
    pub(crate) fn set_event(&mut self, component: &str, event: &str, handler: PushHandler) {
        self.events
            .insert((component.to_string(), event.to_string()), handler);
    }

    pub(crate) fn remove_component(&mut self, component: &str) {
        self.connect.remove(component);
        self.disconnect.remove(component);
        self.events.retain(|(c, _), _| c != component);
    }

    pub(crate) fn connect_callbacks(&self) -> Vec<ConnectCallback> {
        self.connect.values().cloned().collect()
    }

    pub(crate) fn disconnect_callbacks(&self) -> Vec<DisconnectCallback> {
        self.disconnect.values().cloned().collect()
    }

    pub(crate) fn handlers_for(&self, event: &str) -> Vec<PushHandler> {
        self.events
            .iter()
            .filter(|((_, e), _)| e == event)
            .map(|(_, h)| h.clone())
            .collect()
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.events.len()
    }
}

// ───────────────────────────────────────────────────────────────────
// Transport manager
// ───────────────────────────────────────────────────────────────────

struct TransportInner {
    config: TransportConfig,
    registry: Mutex<Registry>,
    outgoing: Mutex<Option<mpsc::Sender<Message>>>,
    connected: AtomicBool,
    connecting: AtomicBool,
    started: AtomicBool,
    shutdown: AtomicBool,
    attempts: AtomicU32,
    grace: Mutex<PendingTimer>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

/// The one shared transport handle. Cheap to clone; all clones share
/// one socket, one registry, one supervisor.
#[derive(Clone)]
pub struct TransportManager {
    inner: Arc<TransportInner>,
}

impl TransportManager {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                config,
                registry: Mutex::new(Registry::new()),
                outgoing: Mutex::new(None),
                connected: AtomicBool::new(false),
                connecting: AtomicBool::new(false),
                started: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
                grace: Mutex::new(PendingTimer::new()),
                supervisor: Mutex::new(None),
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(TransportConfig::default())
    }

    /// Start the connection supervisor. Idempotent: a second caller
    /// reuses the running connection instead of opening a duplicate.
    pub fn connect(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            log::debug!("transport: connect() reusing existing connection");
            return;
        }
        let inner = self.inner.clone();
        let handle = tokio::spawn(run_supervisor(inner));
        *self.inner.supervisor.lock().unwrap() = Some(handle);
    }

    pub fn state(&self) -> ConnectionState {
        if self.inner.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else if self.inner.connecting.load(Ordering::SeqCst) {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Failed connect attempts since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Register a callback fired on every (re)connect. If the
    /// transport is already connected, fires synchronously right now —
    /// there is no missed-event window at registration time.
    pub fn on_connect<F>(&self, component: &str, cb: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let cb: ConnectCallback = Arc::new(cb);
        self.inner
            .registry
            .lock()
            .unwrap()
            .set_connect(component, cb.clone());
        if self.is_connected() {
            cb();
        }
    }

    /// Register a callback fired when a disconnect outlives the
    /// optimistic grace window without a reconnect.
    pub fn on_disconnect<F>(&self, component: &str, cb: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .registry
            .lock()
            .unwrap()
            .set_disconnect(component, Arc::new(cb));
    }

    /// Namespaced push subscription. Re-registering the same
    /// (component, event) pair replaces the prior handler.
    pub fn on<F>(&self, component: &str, event: &str, handler: F)
    where
        F: Fn(&Push) + Send + Sync + 'static,
    {
        self.inner
            .registry
            .lock()
            .unwrap()
            .set_event(component, event, Arc::new(handler));
    }

    /// Send an intent. Returns false — silently, nothing queued — when
    /// not connected; the caller re-triggers if it cares.
    pub fn emit(&self, intent: &Intent) -> bool {
        if !self.is_connected() {
            log::debug!("transport: emit({}) while disconnected", intent.event_name());
            return false;
        }
        let text = match intent.encode() {
            Ok(text) => text,
            Err(e) => {
                log::error!("transport: failed to encode {}: {e}", intent.event_name());
                return false;
            }
        };
        let guard = self.inner.outgoing.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.try_send(Message::Text(text.into())).is_ok(),
            None => false,
        }
    }

    /// Remove every handler registered under a component id. The only
    /// supported teardown path.
    pub fn remove_listeners(&self, component: &str) {
        self.inner
            .registry
            .lock()
            .unwrap()
            .remove_component(component);
    }

    /// Stop the supervisor and drop the connection (test teardown).
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.grace.lock().unwrap().cancel();
        if let Some(handle) = self.inner.supervisor.lock().unwrap().take() {
            handle.abort();
        }
        *self.inner.outgoing.lock().unwrap() = None;
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.connecting.store(false, Ordering::SeqCst);
    }
}

// ───────────────────────────────────────────────────────────────────
// Connection supervisor
// ───────────────────────────────────────────────────────────────────

async fn run_supervisor(inner: Arc<TransportInner>) {
    let cfg = inner.config.clone();
    let mut attempt: u32 = 0;

    loop {
        if inner.shutdown.load(Ordering::SeqCst) {
            break;
        }
        inner.connecting.store(true, Ordering::SeqCst);

        let connected = tokio::time::timeout(
            cfg.connect_timeout,
            tokio_tungstenite::connect_async(&cfg.url),
        )
        .await;

        match connected {
            Ok(Ok((ws, _response))) => {
                attempt = 0;
                inner.attempts.store(0, Ordering::SeqCst);
                inner.connecting.store(false, Ordering::SeqCst);

                let (mut sink, mut stream) = ws.split();
                let (tx, mut rx) = mpsc::channel::<Message>(256);
                *inner.outgoing.lock().unwrap() = Some(tx);
                inner.connected.store(true, Ordering::SeqCst);

                // A reconnect landing inside the grace window cancels
                // the pending disconnect notification — no UI flicker
                // across normal page navigation.
                inner.grace.lock().unwrap().cancel();

                let callbacks = inner.registry.lock().unwrap().connect_callbacks();
                for cb in callbacks {
                    cb();
                }
                log::info!("transport: connected to {}", cfg.url);

                let writer = tokio::spawn(async move {
                    while let Some(message) = rx.recv().await {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                });

                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => match Push::decode(text.as_str()) {
                            Ok(push) => dispatch_push(&inner, &push),
                            Err(e) => {
                                // Malformed pushes die at this boundary;
                                // downstream never sees them.
                                log::warn!("transport: dropping malformed push: {e}");
                            }
                        },
                        Ok(Message::Close(_)) | Err(_) => break,
                        _ => {}
                    }
                }

                inner.connected.store(false, Ordering::SeqCst);
                *inner.outgoing.lock().unwrap() = None;
                writer.abort();

                if inner.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                log::warn!("transport: connection lost, reconnecting");

                let grace_inner = inner.clone();
                inner
                    .grace
                    .lock()
                    .unwrap()
                    .schedule(cfg.grace_window, move || fire_disconnect(&grace_inner));
            }
            _ => {
                attempt += 1;
                inner.attempts.store(attempt, Ordering::SeqCst);
                log::warn!(
                    "transport: connect attempt {attempt}/{} to {} failed",
                    cfg.max_attempts,
                    cfg.url
                );
                if attempt >= cfg.max_attempts {
                    log::warn!(
                        "transport: giving up after {attempt} attempts; realtime features degraded"
                    );
                    break;
                }
                tokio::time::sleep(backoff_delay(&cfg, attempt)).await;
            }
        }
    }
    inner.connecting.store(false, Ordering::SeqCst);
}

fn dispatch_push(inner: &Arc<TransportInner>, push: &Push) {
    let handlers = inner.registry.lock().unwrap().handlers_for(push.event_name());
    if handlers.is_empty() {
        log::debug!("transport: no handler for '{}'", push.event_name());
        return;
    }
    for handler in handlers {
        handler(push);
    }
}

fn fire_disconnect(inner: &Arc<TransportInner>) {
    let callbacks = inner.registry.lock().unwrap().disconnect_callbacks();
    log::info!(
        "transport: disconnect confirmed after grace window ({} listeners)",
        callbacks.len()
    );
    for cb in callbacks {
        cb();
    }
}

/// Exponential backoff, capped, with jitter in [50%, 100%] of the
/// capped step. Jitter is derived from a fresh uuid hash.
fn backoff_delay(cfg: &TransportConfig, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.min(6);
    let capped = cfg.base_backoff.saturating_mul(factor).min(cfg.max_backoff);
    let ms = capped.as_millis() as u64;
    if ms < 2 {
        return capped;
    }
    let jitter = (Uuid::new_v4().as_u128() % u128::from(ms / 2 + 1)) as u64;
    Duration::from_millis(ms / 2 + jitter)
}

// ===================================================================
// Tests
// ===================================================================
