use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of the current time. Readings never go backwards.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used by simulations and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: std::time::Duration) {
        let mut now = self.now.lock();
        match chrono::Duration::from_std(by) {
            Ok(by) => *now += by,
            Err(e) => tracing::warn!("Ignoring clock advance of {:?}: {}", by, e),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock();
        if to < *now {
            tracing::warn!("Ignoring clock regression from {} to {}", *now, to);
            return;
        }
        *now = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_manual_clock_is_monotonic() {
        let start = Utc::now();
        let clock = ManualClock::new(start);

        clock.advance(Duration::from_secs(30));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(30));

        clock.set(start);
        assert_eq!(clock.now(), start + chrono::Duration::seconds(30));

        clock.set(start + chrono::Duration::seconds(90));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(90));
    }
}
