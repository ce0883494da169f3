//! The sync engine: owns the device state and reconciles it with the remote.
//!
//! Every reconciliation attempt takes a sequence number. Starting an attempt
//! cancels the previous in-flight one; when a remote call returns, its
//! result is applied only if its sequence number is still the latest. The
//! cancellation token is a courtesy to the remote, the sequence check is
//! what guarantees a superseded attempt never touches state or cache.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::error::SyncError;
use super::projection::StateProjection;
use super::state::{SyncState, SyncStatus};
use super::throttle::Throttle;
use super::trigger::{AttemptOutcome, LifecycleEvent, Trigger};
use crate::api::{FetchError, RemoteDataSource};
use crate::cache::CacheStore;
use crate::config::EngineConfig;
use crate::models::Device;
use crate::network::NetworkMonitor;

/// Handle to one sync engine. Clones share the same engine.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    remote: Arc<dyn RemoteDataSource>,
    cache: CacheStore,
    network: Arc<dyn NetworkMonitor>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    state_tx: watch::Sender<SyncState>,
    control: Mutex<Control>,
    /// Parent of every attempt token; cancelled on dispose.
    shutdown: CancellationToken,
}

/// Mutable bookkeeping. State publication happens while this is held so a
/// sequence check and the write it guards cannot interleave with another
/// attempt.
struct Control {
    active: bool,
    started: bool,
    latest_seq: u64,
    in_flight: Option<CancellationToken>,
    throttle: Throttle,
    focus_guard: Option<Throttle>,
    listeners: Vec<JoinHandle<()>>,
    /// Status and error of the last resolved attempt (or of the start
    /// state). A spurious cancellation of the latest attempt goes back here.
    settled: (SyncStatus, Option<String>),
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Inner {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SyncCoordinator {
    pub fn new(
        remote: Arc<dyn RemoteDataSource>,
        cache: CacheStore,
        network: Arc<dyn NetworkMonitor>,
        config: EngineConfig,
    ) -> Self {
        Self::with_clock(remote, cache, network, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        remote: Arc<dyn RemoteDataSource>,
        cache: CacheStore,
        network: Arc<dyn NetworkMonitor>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SyncState::idle());
        let control = Control {
            active: true,
            started: false,
            latest_seq: 0,
            in_flight: None,
            throttle: Throttle::new(config.throttle_window),
            focus_guard: config.focus_throttle.map(Throttle::new),
            listeners: Vec::new(),
            settled: (SyncStatus::Idle, None),
        };
        let cache = cache.with_key(config.cache_key.clone());

        Self {
            inner: Arc::new(Inner {
                remote,
                cache,
                network,
                clock,
                config,
                state_tx,
                control: Mutex::new(control),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Publish the cached snapshot (or the initial loading state), start
    /// listening for connectivity changes, then run the start attempt.
    ///
    /// The cached state is observable before this awaits anything.
    pub async fn start(&self) -> AttemptOutcome {
        {
            let mut control = self.inner.control();
            if !control.active {
                return AttemptOutcome::Disposed;
            }
            if control.started {
                debug!("Sync engine already started");
                return AttemptOutcome::AlreadyStarted;
            }
            control.started = true;

            let initial = match self.inner.cache.load() {
                Some(snapshot) => {
                    info!(
                        count = snapshot.devices.len(),
                        captured_at = %snapshot.captured_at,
                        "Loaded devices from cache"
                    );
                    SyncState::from_snapshot(snapshot)
                }
                None => {
                    info!("No usable device cache, waiting for first sync");
                    SyncState::loading_initial()
                }
            };
            control.settled = (initial.status, None);
            self.inner.state_tx.send_replace(initial);

            let listener = self.spawn_network_listener();
            control.listeners.push(listener);
        }

        // Subscribers get to see the initial state before it turns into Syncing
        tokio::task::yield_now().await;

        self.attempt(Trigger::Start).await
    }

    /// Tear down: no publication happens after this returns, the in-flight
    /// call is cancelled and all listeners stop. Idempotent.
    pub fn dispose(&self) {
        let listeners = {
            let mut control = self.inner.control();
            if !control.active {
                return;
            }
            control.active = false;
            if let Some(token) = control.in_flight.take() {
                token.cancel();
            }
            std::mem::take(&mut control.listeners)
        };
        self.inner.shutdown.cancel();
        for listener in listeners {
            listener.abort();
        }
        info!("Sync engine disposed");
    }

    pub fn is_active(&self) -> bool {
        self.inner.control().active
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn state(&self) -> SyncState {
        self.inner.state_tx.borrow().clone()
    }

    pub fn projection(&self) -> StateProjection {
        let state = self.inner.state_tx.borrow();
        StateProjection::from_state(&state, self.inner.clock.now(), self.inner.config.staleness_bound)
    }

    /// Receiver that wakes on each published state.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state_tx.subscribe()
    }

    pub fn device(&self, id: &str) -> Option<Device> {
        self.inner.state_tx.borrow().device(id).cloned()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Fetch one device for a detail view. Does not touch state or cache.
    pub async fn fetch_device(&self, id: &str) -> Result<Device, FetchError> {
        if !self.is_active() {
            return Err(FetchError::Cancelled);
        }
        let cancel = self.inner.shutdown.child_token();
        self.inner.remote.fetch_device(id, cancel).await
    }

    // =========================================================================
    // Triggers
    // =========================================================================

    /// User-requested refresh: ignores the throttle and supersedes any
    /// in-flight attempt. Returns `NotStarted` before [`start`](Self::start).
    pub async fn request_refresh(&self) -> AttemptOutcome {
        self.attempt(Trigger::UserRefresh).await
    }

    /// Foreground/focus notification from the host application.
    pub async fn notify(&self, event: LifecycleEvent) -> AttemptOutcome {
        if event == LifecycleEvent::Focus && !self.pass_focus_guard() {
            debug!("Focus event ignored by focus guard");
            return AttemptOutcome::Throttled;
        }
        self.attempt(event.into()).await
    }

    fn pass_focus_guard(&self) -> bool {
        let now = self.inner.clock.now();
        let mut control = self.inner.control();
        if !control.started {
            return true;
        }
        match control.focus_guard.as_mut() {
            Some(guard) => guard.try_acquire(now),
            None => true,
        }
    }

    /// Drive [`notify`](Self::notify) from a channel until it closes or the
    /// engine is disposed.
    pub fn attach_lifecycle(&self, mut events: mpsc::UnboundedReceiver<LifecycleEvent>) {
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        let Some(coordinator) = Self::upgrade(&weak) else { break };
                        tokio::spawn(async move {
                            coordinator.notify(event).await;
                        });
                    }
                }
            }
            debug!("Lifecycle listener stopped");
        });

        let mut control = self.inner.control();
        if control.active {
            control.listeners.push(handle);
        } else {
            handle.abort();
        }
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Attempt a reconciliation whenever connectivity goes from down to up.
    fn spawn_network_listener(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        let mut connectivity = self.inner.network.subscribe();
        let mut was_connected = *connectivity.borrow_and_update();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    changed = connectivity.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let connected = *connectivity.borrow_and_update();
                        let regained = connected && !was_connected;
                        was_connected = connected;
                        if !regained {
                            continue;
                        }
                        info!("Connectivity restored");
                        let Some(coordinator) = Self::upgrade(&weak) else { break };
                        tokio::spawn(async move {
                            coordinator.attempt(Trigger::ConnectivityRestored).await;
                        });
                    }
                }
            }
            debug!("Network listener stopped");
        })
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    async fn attempt(&self, trigger: Trigger) -> AttemptOutcome {
        let inner = &self.inner;

        let (seq, cancel) = {
            let mut control = inner.control();
            if !control.active {
                return AttemptOutcome::Disposed;
            }
            if !control.started {
                debug!(?trigger, "Sync engine not started, ignoring trigger");
                return AttemptOutcome::NotStarted;
            }

            let now = inner.clock.now();
            if !trigger.is_user_initiated() && !control.throttle.is_open(now) {
                debug!(?trigger, last = ?control.throttle.last(), "Sync attempt throttled");
                return AttemptOutcome::Throttled;
            }

            if let Some(previous) = control.in_flight.take() {
                debug!(superseded = control.latest_seq, "Cancelling in-flight sync");
                previous.cancel();
            }
            control.latest_seq += 1;
            let seq = control.latest_seq;

            if !inner.network.is_connected() {
                info!(seq, ?trigger, "Offline, skipping sync");
                self.resolve(&mut control, Err(SyncError::ConnectivityUnavailable));
                return AttemptOutcome::Offline;
            }

            control.throttle.record(now);
            let cancel = inner.shutdown.child_token();
            control.in_flight = Some(cancel.clone());

            inner.state_tx.send_modify(|state| {
                state.status = SyncStatus::Syncing;
                state.error = None;
            });
            (seq, cancel)
        };

        info!(seq, ?trigger, "Sync started");
        let result = inner.remote.fetch_all(cancel).await;

        let mut control = inner.control();
        if !control.active {
            debug!(seq, "Discarding sync result after dispose");
            return AttemptOutcome::Disposed;
        }
        if control.latest_seq != seq {
            debug!(seq, latest = control.latest_seq, "Discarding superseded sync result");
            return AttemptOutcome::Superseded;
        }
        control.in_flight = None;

        match result.map_err(SyncError::from) {
            Err(SyncError::Cancelled) => {
                // Nothing is in flight now; a cold start without any outcome
                // falls back to Idle rather than a blocking load
                let (status, error) = control.settled.clone();
                let status = match status {
                    SyncStatus::LoadingInitial => SyncStatus::Idle,
                    other => other,
                };
                debug!(seq, %status, "Sync cancelled, restoring last resolved status");
                inner.state_tx.send_modify(|state| {
                    state.status = status;
                    state.error = error;
                    state.initial_load = false;
                });
                AttemptOutcome::Cancelled
            }
            result => self.resolve(&mut control, result),
        }
    }

    /// Apply the outcome of the latest attempt. Caller holds the control
    /// lock and has checked the sequence number.
    fn resolve(&self, control: &mut Control, result: Result<Vec<Device>, SyncError>) -> AttemptOutcome {
        let inner = &self.inner;
        let outcome = match result {
            Ok(devices) => {
                let now = inner.clock.now();
                if let Err(e) = inner.cache.save(&devices, now) {
                    let e = SyncError::from(e);
                    warn!(error = %e, "Failed to cache devices");
                }
                info!(count = devices.len(), "Sync succeeded");
                inner.state_tx.send_modify(|state| {
                    state.status = SyncStatus::Synced;
                    state.devices = Arc::new(devices);
                    state.last_synced_at = Some(now);
                    state.error = None;
                    state.initial_load = false;
                });
                AttemptOutcome::Synced
            }
            Err(SyncError::ConnectivityUnavailable) => {
                inner.state_tx.send_modify(|state| {
                    state.status = SyncStatus::Offline;
                    state.error = None;
                    state.initial_load = false;
                });
                AttemptOutcome::Offline
            }
            Err(SyncError::Cancelled) => return AttemptOutcome::Cancelled,
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Sync failed");
                inner.state_tx.send_modify(|state| {
                    state.status = SyncStatus::Error;
                    state.error = Some(message);
                    state.initial_load = false;
                });
                AttemptOutcome::Failed
            }
        };

        let state = inner.state_tx.borrow();
        control.settled = (state.status, state.error.clone());
        outcome
    }
}
