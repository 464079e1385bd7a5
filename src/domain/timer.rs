use crate::domain::display::{format_clock, progress_fraction};
use crate::domain::models::TimerSettings;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Work,
    Break,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
        }
    }

    pub fn total_seconds(self, settings: &TimerSettings) -> u32 {
        match self {
            Self::Work => settings.work_seconds(),
            Self::Break => settings.break_seconds(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The engine is paused; nothing changed.
    Ignored,
    Counting { remaining_seconds: u32 },
    SessionComplete { finished: TimerPhase },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimerView {
    pub phase: TimerPhase,
    pub running: bool,
    pub remaining_seconds: u32,
    pub clock: String,
    pub progress: f64,
    pub completed_sessions: u64,
}

/// Work/break countdown. Holds no clock of its own; a driver calls `tick` once a second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEngine {
    phase: TimerPhase,
    running: bool,
    remaining_seconds: u32,
}

impl TimerEngine {
    pub fn new(settings: &TimerSettings) -> Self {
        Self {
            phase: TimerPhase::Work,
            running: false,
            remaining_seconds: settings.work_seconds(),
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// Returns `false` when the engine was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self, settings: &TimerSettings) {
        self.running = false;
        self.phase = TimerPhase::Work;
        self.remaining_seconds = settings.work_seconds();
    }

    /// Re-arms the countdown for the current phase after a duration change.
    pub fn rearm(&mut self, settings: &TimerSettings) {
        if !self.running {
            self.remaining_seconds = self.phase.total_seconds(settings);
        }
    }

    pub fn tick(&mut self, settings: &mut TimerSettings) -> TickOutcome {
        if !self.running {
            return TickOutcome::Ignored;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Counting {
                remaining_seconds: self.remaining_seconds,
            };
        }
        let finished = self.phase;
        self.complete_session(settings);
        TickOutcome::SessionComplete { finished }
    }

    fn complete_session(&mut self, settings: &mut TimerSettings) {
        self.running = false;
        match self.phase {
            TimerPhase::Work => {
                settings.completed_sessions = settings.completed_sessions.saturating_add(1);
                self.phase = TimerPhase::Break;
                self.remaining_seconds = settings.break_seconds();
            }
            TimerPhase::Break => {
                self.phase = TimerPhase::Work;
                self.remaining_seconds = settings.work_seconds();
            }
        }
    }

    pub fn view(&self, settings: &TimerSettings) -> TimerView {
        TimerView {
            phase: self.phase,
            running: self.running,
            remaining_seconds: self.remaining_seconds,
            clock: format_clock(self.remaining_seconds),
            progress: progress_fraction(self.remaining_seconds, self.phase.total_seconds(settings)),
            completed_sessions: settings.completed_sessions,
        }
    }
}
