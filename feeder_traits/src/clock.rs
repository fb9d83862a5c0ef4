use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Time source for the engine.
///
/// `now` drives the auto-tare cooldown and must be monotonic. `utc_now`
/// stamps history readings. `sleep` paces replays.
pub trait Clock {
    fn now(&self) -> Instant;

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}

/// OS time: `Instant::now` and `Utc::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Manually driven clock. Both timelines move together and `sleep`
    /// returns immediately after moving them.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        start: Instant,
        start_utc: DateTime<Utc>,
        elapsed: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                start: Instant::now(),
                start_utc: Utc::now(),
                elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        pub fn advance(&self, d: Duration) {
            let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
            *elapsed = elapsed.saturating_add(d);
        }

        fn elapsed(&self) -> Duration {
            *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.start + self.elapsed()
        }

        fn utc_now(&self) -> DateTime<Utc> {
            chrono::Duration::from_std(self.elapsed())
                .ok()
                .and_then(|e| self.start_utc.checked_add_signed(e))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }

}
