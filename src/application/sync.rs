use crate::application::state_store::StateStore;
use crate::domain::models::Snapshot;
use crate::infrastructure::document_store::RemoteDocumentStore;
use crate::infrastructure::error::InfraError;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const DEFAULT_DEBOUNCE_MS: u64 = 2_000;
const DEFAULT_SYNCED_HOLD_MS: u64 = 2_000;

/// Receives "the snapshot changed" notifications from the managers.
pub trait SaveScheduler: Send + Sync {
    fn schedule_save(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub debounce: Duration,
    pub synced_hold: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            synced_hold: Duration::from_millis(DEFAULT_SYNCED_HOLD_MS),
        }
    }
}

/// Loads and replaces the remote document. Cloning shares the same timers and status.
pub struct SyncClient<R> {
    inner: Arc<SyncInner<R>>,
}

impl<R> Clone for SyncClient<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SyncInner<R> {
    remote: Arc<R>,
    state: Arc<StateStore>,
    options: SyncOptions,
    runtime: Option<Handle>,
    pending_save: Mutex<Option<JoinHandle<()>>>,
    in_flight_save: Mutex<Option<JoinHandle<Result<(), InfraError>>>>,
    status_reset: Mutex<Option<JoinHandle<()>>>,
    status: watch::Sender<SyncStatus>,
}

impl<R> SyncClient<R>
where
    R: RemoteDocumentStore + 'static,
{
    /// Remembers the ambient tokio runtime so saves can be scheduled from any thread.
    pub fn new(remote: Arc<R>, state: Arc<StateStore>, options: SyncOptions) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            inner: Arc::new(SyncInner {
                remote,
                state,
                options,
                runtime: Handle::try_current().ok(),
                pending_save: Mutex::new(None),
                in_flight_save: Mutex::new(None),
                status_reset: Mutex::new(None),
                status,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    /// Reads the remote document and installs it as the local snapshot.
    /// On error the local snapshot is left untouched.
    pub async fn load(&self) -> Result<Snapshot, InfraError> {
        self.inner.cancel_status_reset();
        self.inner.status.send_replace(SyncStatus::Syncing);
        let fetched = self.inner.remote.fetch().await;
        self.inner.status.send_replace(SyncStatus::Idle);

        let mut snapshot = fetched?;
        snapshot.timer_settings = snapshot.timer_settings.sanitized();
        for problem in snapshot.invalid_records() {
            tracing::warn!(%problem, "loaded record breaks a model invariant");
        }
        self.inner.state.replace(snapshot.clone())?;
        tracing::info!(
            tasks = snapshot.tasks.len(),
            ideas = snapshot.ideas.len(),
            "loaded remote snapshot"
        );
        Ok(snapshot)
    }

    /// Writes the current snapshot right away, bypassing the debounce.
    pub async fn save_now(&self) -> Result<(), InfraError> {
        self.inner.save_current().await
    }

    /// Cancels a pending debounced write and performs it immediately, after waiting
    /// for a write that is already in flight. Returns `false` when nothing was pending.
    pub async fn flush(&self) -> Result<bool, InfraError> {
        let pending = take_slot(&self.inner.pending_save, "pending save")?
            .filter(|handle| !handle.is_finished());
        if let Some(handle) = &pending {
            handle.abort();
        }

        let in_flight = take_slot(&self.inner.in_flight_save, "in-flight save")?
            .filter(|write| !write.is_finished());
        let mut flushed = false;
        if let Some(write) = in_flight {
            flushed = true;
            match write.await {
                Ok(result) => result?,
                Err(error) if error.is_cancelled() => {}
                Err(error) => tracing::warn!(%error, "in-flight save task failed"),
            }
        }

        if pending.is_some() {
            self.inner.save_current().await?;
            flushed = true;
        }
        Ok(flushed)
    }

    /// True while a debounced write is waiting or a write is still in flight.
    pub fn has_pending_save(&self) -> bool {
        is_busy(&self.inner.pending_save) || is_busy(&self.inner.in_flight_save)
    }
}

impl<R> SaveScheduler for SyncClient<R>
where
    R: RemoteDocumentStore + 'static,
{
    fn schedule_save(&self) {
        let Some(runtime) = self.inner.runtime_handle() else {
            tracing::warn!("save requested without a tokio runtime; skipping");
            return;
        };
        let Ok(mut slot) = self.inner.pending_save.lock() else {
            tracing::warn!("pending save lock poisoned; skipping save");
            return;
        };
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let inner = Arc::clone(&self.inner);
        let debounce = inner.options.debounce;
        *slot = Some(runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            // The write runs detached so a later mutation cannot abort it mid-flight.
            let writer = Arc::clone(&inner);
            let write = tokio::spawn(async move { writer.save_current().await });
            if let Ok(mut in_flight) = inner.in_flight_save.lock() {
                *in_flight = Some(write);
            }
        }));
        tracing::debug!(debounce_ms = debounce.as_millis() as u64, "debounced save armed");
    }
}

impl<R> SyncInner<R>
where
    R: RemoteDocumentStore + 'static,
{
    fn runtime_handle(&self) -> Option<Handle> {
        self.runtime.clone().or_else(|| Handle::try_current().ok())
    }

    async fn save_current(self: &Arc<Self>) -> Result<(), InfraError> {
        let snapshot = self.state.snapshot()?;
        self.cancel_status_reset();
        self.status.send_replace(SyncStatus::Syncing);

        match self.remote.replace(&snapshot).await {
            Ok(()) => {
                self.status.send_replace(SyncStatus::Synced);
                self.arm_status_reset();
                tracing::info!(
                    tasks = snapshot.tasks.len(),
                    ideas = snapshot.ideas.len(),
                    "saved remote snapshot"
                );
                Ok(())
            }
            Err(error) => {
                self.status.send_replace(SyncStatus::Error(error.to_string()));
                tracing::warn!(%error, "failed to save remote snapshot");
                Err(error)
            }
        }
    }

    fn arm_status_reset(self: &Arc<Self>) {
        let Ok(mut slot) = self.status_reset.lock() else {
            return;
        };
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let Some(runtime) = self.runtime_handle() else {
            return;
        };
        let inner = Arc::clone(self);
        let hold = self.options.synced_hold;
        *slot = Some(runtime.spawn(async move {
            tokio::time::sleep(hold).await;
            inner.status.send_if_modified(|status| {
                if *status == SyncStatus::Synced {
                    *status = SyncStatus::Idle;
                    return true;
                }
                false
            });
        }));
    }

    fn cancel_status_reset(&self) {
        if let Ok(mut slot) = self.status_reset.lock() {
            if let Some(previous) = slot.take() {
                previous.abort();
            }
        }
    }
}

fn is_busy<T>(slot: &Mutex<Option<JoinHandle<T>>>) -> bool {
    slot.lock()
        .map(|slot| slot.as_ref().is_some_and(|handle| !handle.is_finished()))
        .unwrap_or(false)
}

fn take_slot<T>(slot: &Mutex<Option<T>>, name: &str) -> Result<Option<T>, InfraError> {
    slot.lock()
        .map(|mut slot| slot.take())
        .map_err(|error| InfraError::StateLock(format!("{name} lock poisoned: {error}")))
}
