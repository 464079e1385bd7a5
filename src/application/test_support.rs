use crate::application::clock::Clock;
use crate::application::sync::SaveScheduler;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct RecordingScheduler {
    calls: AtomicUsize,
}

impl RecordingScheduler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SaveScheduler for RecordingScheduler {
    fn schedule_save(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// A clock whose instant the test moves by hand.
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(rfc3339: &str) -> Self {
        let now = DateTime::parse_from_rfc3339(rfc3339)
            .expect("parse instant")
            .with_timezone(&Utc);
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn clock(&self) -> Clock {
        let now = Arc::clone(&self.now);
        Clock::system(chrono_tz::UTC)
            .with_now_provider(Arc::new(move || *now.lock().expect("manual clock lock")))
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().expect("manual clock lock");
        *now += chrono::Duration::days(days);
    }
}
