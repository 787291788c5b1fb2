// MIT License - Copyright (c) 2026 Peter Wright

//! Shared per-host bridge session.
//!
//! A [`BridgeSession`] owns one [`Connection`] and runs two background
//! loops once started: a read-dispatch loop that decodes notification
//! frames and fans them out to every registered subscriber in registration
//! order, and a keepalive loop that pings the bridge and reopens a dropped
//! connection. Any number of callers may issue `write`/`query` against the
//! same session concurrently; the connection's write lock keeps their lines
//! whole on the wire.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::connection::{Connection, ReadOutcome};
use crate::error::{LipError, Result};
use crate::protocol::{self, Argument, Frame};

/// Pause between read attempts while the connection is down, so a dead
/// bridge does not spin the read loop between keepalive ticks.
const IDLE_RETRY: Duration = Duration::from_secs(1);

/// Callback invoked with every decoded inbound frame.
///
/// Callbacks run on the read-dispatch loop; they should filter by the
/// frame's mode and integration ID and return quickly.
pub type FrameCallback = Arc<dyn Fn(&Frame) + Send + Sync>;

/// Handle returned by [`BridgeSession::register`]; pass it to
/// [`BridgeSession::unregister`] when the subscriber goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

struct Subscriber {
    token: SubscriptionToken,
    callback: FrameCallback,
}

/// One shared session per bridge host.
pub struct BridgeSession {
    host: String,
    config: BridgeConfig,
    connection: Connection,
    subscribers: Mutex<Vec<Subscriber>>,
    next_token: AtomicU64,
    opened: AtomicBool,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BridgeSession {
    /// Create an unopened session for the host in `config`.
    pub fn new(config: BridgeConfig) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            host: config.host.clone(),
            config,
            connection: Connection::new(),
            subscribers: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
            opened: AtomicBool::new(false),
            started: AtomicBool::new(false),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// The host this session talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether the underlying connection is open and authenticated.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Open the connection using the configured credentials.
    ///
    /// Idempotent. A connect or handshake failure is logged and swallowed;
    /// the keepalive loop retries on its next tick.
    pub async fn open(&self) {
        self.opened.store(true, Ordering::SeqCst);
        if let Err(e) = self
            .connection
            .open(
                &self.config.host,
                self.config.port,
                self.config.username.as_bytes(),
                self.config.password.as_bytes(),
            )
            .await
        {
            warn!("Could not open connection to bridge {}: {}", self.host, e);
        }
    }

    /// Send a `#MODE,ID,ACTION[,ARG]...` command line.
    ///
    /// Fails with [`LipError::NotOpen`] if the session has never been
    /// opened. Wire-level failures are swallowed by the connection; there
    /// is no acknowledgement to report back.
    pub async fn write(
        &self,
        mode: &str,
        integration_id: u32,
        action: u32,
        args: &[Argument],
    ) -> Result<()> {
        if !self.opened.load(Ordering::SeqCst) {
            return Err(LipError::NotOpen);
        }
        let line = protocol::command_line(mode, integration_id, action, args);
        debug!("Writing command to bridge {}: {}", self.host, line);
        self.connection.write_line(line.as_bytes()).await;
        Ok(())
    }

    /// Send a `?MODE,ID,ACTION` query line.
    ///
    /// The bridge answers asynchronously through the notification stream;
    /// correlate by mode/ID/action in a subscriber.
    pub async fn query(&self, mode: &str, integration_id: u32, action: u32) -> Result<()> {
        if !self.opened.load(Ordering::SeqCst) {
            return Err(LipError::NotOpen);
        }
        let line = protocol::query_line(mode, integration_id, action);
        debug!("Writing query to bridge {}: {}", self.host, line);
        self.connection.write_line(line.as_bytes()).await;
        Ok(())
    }

    /// Register a callback for every inbound frame.
    ///
    /// Subscribers are invoked in registration order. Duplicates are not
    /// checked for.
    pub fn register(
        &self,
        callback: impl Fn(&Frame) + Send + Sync + 'static,
    ) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        self.subscribers.lock().unwrap().push(Subscriber {
            token,
            callback: Arc::new(callback),
        });
        token
    }

    /// Remove a previously registered subscriber.
    ///
    /// Returns false when the token was already removed.
    pub fn unregister(&self, token: SubscriptionToken) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|s| s.token != token);
        subscribers.len() != before
    }

    /// Start the background read-dispatch and keepalive loops.
    ///
    /// Idempotent: a second call while started does nothing, so only one
    /// read loop ever consumes the connection.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Starting session loops for bridge {}", self.host);
        let _ = self.shutdown_tx.send(false);
        let mut tasks = self.tasks.lock().unwrap();
        tasks.push(tokio::spawn(Self::read_loop(Arc::clone(self))));
        tasks.push(tokio::spawn(Self::keepalive_loop(Arc::clone(self))));
    }

    /// Stop both background loops and close the connection.
    pub async fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        self.connection.close().await;
        info!("Stopped session for bridge {}", self.host);
    }

    async fn read_loop(session: Arc<Self>) {
        let mut shutdown_rx = session.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("Read loop for bridge {} shutting down", session.host);
                        break;
                    }
                }
                outcome = session.connection.read_frame() => match outcome {
                    ReadOutcome::Frame(frame) => session.dispatch(&frame),
                    ReadOutcome::Disconnected => {
                        info!("Reconnecting to bridge {}", session.host);
                        if let Err(e) = session.connection.reopen().await {
                            warn!("Reconnect to bridge {} failed: {}", session.host, e);
                        }
                    }
                    ReadOutcome::NotConnected => sleep(IDLE_RETRY).await,
                }
            }
        }
    }

    async fn keepalive_loop(session: Arc<Self>) {
        let period = Duration::from_millis(session.config.keepalive_interval_ms);
        let mut ticker = interval_at(Instant::now() + period, period);
        let mut shutdown_rx = session.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("Keepalive loop for bridge {} shutting down", session.host);
                        break;
                    }
                }
                _ = ticker.tick() => {
                    session.connection.write_line(protocol::PING_LINE.as_bytes()).await;
                    if !session.connection.is_connected()
                        && session.opened.load(Ordering::SeqCst)
                    {
                        debug!("Bridge {} not connected, attempting reconnect", session.host);
                        if let Err(e) = session.connection.reopen().await {
                            warn!("Reconnect to bridge {} failed: {}", session.host, e);
                        }
                    }
                }
            }
        }
    }

    /// Invoke every subscriber with the frame, in registration order.
    ///
    /// A panicking subscriber is caught and logged so the others still see
    /// the frame and the read loop survives.
    fn dispatch(&self, frame: &Frame) {
        debug!(
            "Read value from bridge {}: {} {} {} {}",
            self.host, frame.mode, frame.integration_id, frame.action, frame.value
        );
        let snapshot: Vec<FrameCallback> = self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .map(|s| Arc::clone(&s.callback))
            .collect();
        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(frame))).is_err() {
                error!(
                    "Subscriber for bridge {} panicked on frame dispatch, skipping",
                    self.host
                );
            }
        }
    }
}

impl Drop for BridgeSession {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}
