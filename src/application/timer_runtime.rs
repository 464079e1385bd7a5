use crate::application::error::AppError;
use crate::application::state_store::StateStore;
use crate::application::sync::SaveScheduler;
use crate::domain::error::{Field, ValidationError};
use crate::domain::timer::{TickOutcome, TimerEngine, TimerPhase, TimerView};
use crate::infrastructure::error::InfraError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};

const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    pub finished: TimerPhase,
    pub completed_sessions: u64,
}

/// Best-effort signal that a phase ended. Failures are logged and dropped.
pub trait SessionNotifier: Send + Sync {
    fn session_finished(&self, event: SessionEvent) -> Result<(), String>;
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl SessionNotifier for LogNotifier {
    fn session_finished(&self, event: SessionEvent) -> Result<(), String> {
        tracing::info!(
            finished = event.finished.as_str(),
            completed_sessions = event.completed_sessions,
            "pomodoro session finished"
        );
        Ok(())
    }
}

/// Drives a `TimerEngine` with a tokio tick task. Cloning shares the same engine.
#[derive(Clone)]
pub struct TimerRuntime {
    inner: Arc<TimerInner>,
}

struct TimerInner {
    engine: Mutex<TimerEngine>,
    store: Arc<StateStore>,
    saver: Arc<dyn SaveScheduler>,
    notifier: Arc<dyn SessionNotifier>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    tick_period: Duration,
    runtime: Option<Handle>,
}

impl TimerRuntime {
    pub fn new(
        store: Arc<StateStore>,
        saver: Arc<dyn SaveScheduler>,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Result<Self, InfraError> {
        let settings = store.read(|snapshot| snapshot.timer_settings.clone())?;
        Ok(Self {
            inner: Arc::new(TimerInner {
                engine: Mutex::new(TimerEngine::new(&settings)),
                store,
                saver,
                notifier,
                ticker: Mutex::new(None),
                tick_period: TICK_PERIOD,
                runtime: Handle::try_current().ok(),
            }),
        })
    }

    pub fn state(&self) -> Result<TimerView, InfraError> {
        let engine = self.inner.lock_engine()?;
        self.inner
            .store
            .read(|snapshot| engine.view(&snapshot.timer_settings))
    }

    /// No-op when already running; never schedules a second tick task.
    pub fn start(&self) -> Result<TimerView, InfraError> {
        {
            let mut ticker = self.inner.lock_ticker()?;
            let started = self.inner.lock_engine()?.start();
            if started {
                if let Err(error) = self.inner.spawn_ticker(&mut ticker) {
                    self.inner.lock_engine()?.pause();
                    return Err(error);
                }
                tracing::info!("pomodoro started");
            }
        }
        self.state()
    }

    pub fn pause(&self) -> Result<TimerView, InfraError> {
        {
            let mut ticker = self.inner.lock_ticker()?;
            self.inner.lock_engine()?.pause();
            stop_ticker(&mut ticker);
        }
        tracing::info!("pomodoro paused");
        self.state()
    }

    pub fn toggle(&self) -> Result<TimerView, InfraError> {
        if self.inner.lock_engine()?.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    pub fn reset(&self) -> Result<TimerView, InfraError> {
        {
            let mut ticker = self.inner.lock_ticker()?;
            let mut engine = self.inner.lock_engine()?;
            self.inner
                .store
                .read(|snapshot| engine.reset(&snapshot.timer_settings))?;
            stop_ticker(&mut ticker);
        }
        tracing::info!("pomodoro reset");
        self.state()
    }

    pub fn update_durations(
        &self,
        work_minutes: u32,
        break_minutes: u32,
    ) -> Result<TimerView, AppError> {
        if work_minutes == 0 {
            return Err(ValidationError::NotPositive(Field::WorkDuration).into());
        }
        if break_minutes == 0 {
            return Err(ValidationError::NotPositive(Field::BreakDuration).into());
        }
        {
            let mut engine = self.inner.lock_engine()?;
            self.inner.store.update(|snapshot| {
                snapshot.timer_settings.work_duration_minutes = work_minutes;
                snapshot.timer_settings.break_duration_minutes = break_minutes;
                engine.rearm(&snapshot.timer_settings);
            })?;
        }
        self.inner.saver.schedule_save();
        tracing::info!(work_minutes, break_minutes, "pomodoro durations updated");
        Ok(self.state()?)
    }
}

impl TimerInner {
    fn lock_engine(&self) -> Result<MutexGuard<'_, TimerEngine>, InfraError> {
        self.engine
            .lock()
            .map_err(|error| InfraError::StateLock(format!("timer engine lock poisoned: {error}")))
    }

    /// Ticker slot first, then the engine, then the state store.
    fn lock_ticker(&self) -> Result<MutexGuard<'_, Option<JoinHandle<()>>>, InfraError> {
        self.ticker
            .lock()
            .map_err(|error| InfraError::StateLock(format!("timer ticker lock poisoned: {error}")))
    }

    fn spawn_ticker(self: &Arc<Self>, slot: &mut Option<JoinHandle<()>>) -> Result<(), InfraError> {
        let runtime = self
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or_else(|| {
                InfraError::InvalidConfig("pomodoro timer needs a tokio runtime".to_string())
            })?;
        stop_ticker(slot);

        let inner = Arc::clone(self);
        *slot = Some(runtime.spawn(async move {
            let period = inner.tick_period;
            let mut ticks = interval_at(tokio::time::Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                ticks.tick().await;
                match inner.tick() {
                    Ok(TickOutcome::Counting { .. }) => {}
                    Ok(TickOutcome::Ignored) => break,
                    Ok(TickOutcome::SessionComplete { finished }) => {
                        inner.on_session_complete(finished);
                        break;
                    }
                    Err(error) => {
                        tracing::warn!(%error, "pomodoro tick failed");
                        break;
                    }
                }
            }
        }));
        Ok(())
    }

    fn tick(&self) -> Result<TickOutcome, InfraError> {
        let mut engine = self.lock_engine()?;
        self.store
            .update(|snapshot| engine.tick(&mut snapshot.timer_settings))
    }

    fn on_session_complete(&self, finished: TimerPhase) {
        if finished == TimerPhase::Work {
            self.saver.schedule_save();
        }
        let completed_sessions = self
            .store
            .read(|snapshot| snapshot.timer_settings.completed_sessions)
            .unwrap_or_default();
        let event = SessionEvent {
            finished,
            completed_sessions,
        };
        if let Err(error) = self.notifier.session_finished(event) {
            tracing::warn!(%error, "session notification failed");
        }
    }
}

fn stop_ticker(slot: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = slot.take() {
        handle.abort();
    }
}
