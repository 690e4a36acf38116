//! Session manager and its inactivity timer.
//!
//! One timer task runs per unlocked session. It sleeps until the next
//! transition point (the start of the warning window, then once per second
//! until the lock deadline) and is woken early whenever the countdown or the
//! bounds change. Each unlock starts a new generation; a task whose
//! generation is stale exits without touching state.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use gptvault_core::SessionConfig;
use parking_lot::{Mutex, MutexGuard, ReentrantMutex};
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::state::{SessionConfigUpdate, SessionState, SessionStatus};

type Callback = Arc<dyn Fn(&SessionState) + Send + Sync>;

struct Subscriber {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Callback,
}

struct Core {
    config: SessionConfig,
    status: SessionStatus,
    last_activity: Instant,
    tracking: bool,
    generation: u64,
    /// Bumped on every published transition.
    seq: u64,
    timer: Option<JoinHandle<()>>,
}

impl Core {
    fn timeout(&self) -> Duration {
        minutes(self.config.timeout_minutes)
    }

    fn warn_after(&self) -> Duration {
        minutes(self.config.timeout_minutes - self.config.warning_minutes)
    }

    fn lock_deadline(&self) -> Instant {
        self.last_activity + self.timeout()
    }

    fn snapshot(&self, now: Instant) -> SessionState {
        let remaining_seconds = (self.status == SessionStatus::Warning)
            .then(|| ceil_secs(self.lock_deadline().saturating_duration_since(now)));
        SessionState {
            status: self.status,
            remaining_seconds,
        }
    }
}

struct Shared {
    core: Mutex<Core>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    wake: Arc<Notify>,
    tx: watch::Sender<SessionState>,
    /// Sequence number of the newest state handed to callbacks. Reentrant so
    /// a callback may drive the manager from inside a delivery.
    delivered: ReentrantMutex<Cell<u64>>,
}

impl Shared {
    /// Publish `state` as the newest transition.
    ///
    /// The watch value is replaced while `core` is still held, so it always
    /// ends at the latest state. Callbacks then run without `core`; a
    /// delivery overtaken by a newer one is dropped.
    fn publish(&self, mut core: MutexGuard<'_, Core>, state: SessionState) {
        core.seq += 1;
        let seq = core.seq;
        self.tx.send_replace(state);
        drop(core);

        let delivered = self.delivered.lock();
        if delivered.get() > seq {
            return;
        }
        delivered.set(seq);

        let callbacks: Vec<(Arc<AtomicBool>, Callback)> = self
            .subscribers
            .lock()
            .iter()
            .map(|s| (Arc::clone(&s.active), Arc::clone(&s.callback)))
            .collect();
        for (active, callback) in callbacks {
            if delivered.get() != seq {
                break;
            }
            if active.load(Ordering::Acquire) {
                callback(&state);
            }
        }
    }

    /// Re-evaluate the countdown. Returns the next wake-up, or `None` when
    /// the timer should stop.
    fn step(&self, generation: u64) -> Option<Instant> {
        let now = Instant::now();
        let mut core = self.core.lock();
        if core.generation != generation || core.status == SessionStatus::Locked {
            return None;
        }

        let elapsed = now.saturating_duration_since(core.last_activity);
        let (next, state) = if elapsed >= core.timeout() {
            core.status = SessionStatus::Locked;
            core.generation += 1;
            core.timer = None;
            info!(
                timeout_minutes = core.config.timeout_minutes,
                "session locked after inactivity"
            );
            (None, Some(core.snapshot(now)))
        } else if elapsed >= core.warn_after() {
            if core.status != SessionStatus::Warning {
                debug!("session entering warning window");
                core.status = SessionStatus::Warning;
            }
            let deadline = core.lock_deadline();
            let remaining = ceil_secs(deadline.saturating_duration_since(now));
            // Wake when the displayed second count drops.
            let next = deadline - Duration::from_secs(remaining.saturating_sub(1));
            (Some(next), Some(core.snapshot(now)))
        } else {
            let changed = core.status != SessionStatus::Unlocked;
            core.status = SessionStatus::Unlocked;
            let next = core.last_activity + core.warn_after();
            (Some(next), changed.then(|| core.snapshot(now)))
        };

        if let Some(state) = state {
            self.publish(core, state);
        }
        next
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(timer) = self.core.get_mut().timer.take() {
            timer.abort();
        }
    }
}

async fn run_timer(shared: Weak<Shared>, generation: u64) {
    loop {
        let (deadline, wake) = {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let Some(deadline) = shared.step(generation) else {
                return;
            };
            (deadline, Arc::clone(&shared.wake))
        };

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            _ = wake.notified() => {}
        }
    }
}

/// Handle to the process-wide session state machine.
///
/// Cheap to clone; all clones share one state. Construct one per process
/// and hand clones to whoever needs to observe or drive the session.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("config", &self.get_config())
            .finish()
    }
}

impl SessionManager {
    /// Create a manager in the `locked` state.
    pub fn new(config: SessionConfig) -> Result<Self> {
        validate(&config)?;
        let (tx, _) = watch::channel(SessionState::locked());
        Ok(Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    config,
                    status: SessionStatus::Locked,
                    last_activity: Instant::now(),
                    tracking: false,
                    generation: 0,
                    seq: 0,
                    timer: None,
                }),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                wake: Arc::new(Notify::new()),
                tx,
                delivered: ReentrantMutex::new(Cell::new(0)),
            }),
        })
    }

    /// Enter `unlocked` with a fresh countdown and start the timer.
    ///
    /// Call only after the passphrase has been verified.
    pub fn unlock(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        let mut core = self.shared.core.lock();
        let now = Instant::now();
        core.status = SessionStatus::Unlocked;
        core.last_activity = now;
        core.generation += 1;
        let timer = runtime.spawn(run_timer(Arc::downgrade(&self.shared), core.generation));
        let previous_timer = core.timer.replace(timer);
        let state = core.snapshot(now);

        info!("session unlocked");
        self.shared.publish(core, state);
        if let Some(timer) = previous_timer {
            timer.abort();
        }
        Ok(())
    }

    /// Enter `locked` and stop the timer. Idempotent.
    pub fn lock(&self) {
        let mut core = self.shared.core.lock();
        if core.status == SessionStatus::Locked {
            return;
        }
        core.status = SessionStatus::Locked;
        core.generation += 1;
        let timer = core.timer.take();

        info!("session locked");
        self.shared.publish(core, SessionState::locked());
        if let Some(timer) = timer {
            timer.abort();
        }
    }

    /// Begin honouring [`record_activity`](Self::record_activity).
    pub fn start_activity_tracking(&self) {
        self.shared.core.lock().tracking = true;
        debug!("activity tracking started");
    }

    pub fn stop_activity_tracking(&self) {
        self.shared.core.lock().tracking = false;
        debug!("activity tracking stopped");
    }

    pub fn is_tracking_activity(&self) -> bool {
        self.shared.core.lock().tracking
    }

    /// Report user activity.
    ///
    /// Restarts the countdown only while tracking is on and the session is
    /// `unlocked`. Once in `warning`, only [`extend_session`](Self::extend_session)
    /// restarts it. Returns whether the countdown was reset.
    pub fn record_activity(&self) -> bool {
        let mut core = self.shared.core.lock();
        if !core.tracking || core.status != SessionStatus::Unlocked {
            return false;
        }
        core.last_activity = Instant::now();
        true
    }

    /// Restart the countdown and return to `unlocked`.
    ///
    /// No effect while locked. Returns whether the session was extended.
    pub fn extend_session(&self) -> bool {
        let mut core = self.shared.core.lock();
        if core.status == SessionStatus::Locked {
            return false;
        }
        let now = Instant::now();
        let changed = core.status != SessionStatus::Unlocked;
        core.status = SessionStatus::Unlocked;
        core.last_activity = now;

        self.shared.wake.notify_one();
        debug!("session extended");
        if changed {
            let state = core.snapshot(now);
            self.shared.publish(core, state);
        }
        true
    }

    pub fn get_config(&self) -> SessionConfig {
        self.shared.core.lock().config
    }

    /// Merge `update` into the current bounds.
    ///
    /// The countdown is not restarted: time already spent inactive counts
    /// against the new bounds, so shrinking them can move the session
    /// straight to `warning` or `locked`.
    pub fn set_config(&self, update: SessionConfigUpdate) -> Result<SessionConfig> {
        let config = {
            let mut core = self.shared.core.lock();
            let merged = update.apply(core.config);
            validate(&merged)?;
            core.config = merged;
            merged
        };

        info!(
            timeout_minutes = config.timeout_minutes,
            warning_minutes = config.warning_minutes,
            "session config updated"
        );
        self.shared.wake.notify_one();
        Ok(config)
    }

    /// Register `callback` for every status or remaining-time change.
    ///
    /// Callbacks run in subscription order on whichever task caused the
    /// change, without the state lock held, so they may call back into the
    /// manager. A callback can miss a state that was superseded before it
    /// was delivered; the last state delivered is always the newest.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.shared.subscribers.lock().push(Subscriber {
            id,
            active: Arc::clone(&active),
            callback: Arc::new(callback),
        });

        Subscription {
            id,
            active,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Last-value view of the session for async consumers.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.shared.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    pub fn state(&self) -> SessionState {
        self.shared.core.lock().snapshot(Instant::now())
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.core.lock().status
    }

    pub fn remaining_seconds(&self) -> Option<u64> {
        self.state().remaining_seconds
    }
}

/// Registration returned by [`SessionManager::subscribe`].
///
/// Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Stop receiving updates. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.subscribers.lock().retain(|s| s.id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

fn validate(config: &SessionConfig) -> Result<()> {
    let problems = config.problems();
    if problems.is_empty() {
        Ok(())
    } else {
        Err(SessionError::InvalidConfig(problems.join("; ")))
    }
}

fn minutes(m: u32) -> Duration {
    Duration::from_secs(u64::from(m) * 60)
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
