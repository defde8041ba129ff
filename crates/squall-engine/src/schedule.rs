use std::collections::HashMap;
use std::time::Instant;

/// Per-collection cadence bookkeeping.
///
/// The engine ticks coarsely (~5 s); finer cadence comes from these
/// interval checks, not from faster ticking. The first cycle forces every
/// collection so the dashboard fills immediately.
#[derive(Debug, Default)]
pub struct PollSchedule {
    last_poll: HashMap<String, Instant>,
}

impl PollSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a collection is due at `now`, given its interval in seconds.
    pub fn is_due(&self, collection: &str, interval_secs: u64, now: Instant, first_cycle: bool) -> bool {
        if first_cycle {
            return true;
        }
        match self.last_poll.get(collection) {
            Some(last) => now.duration_since(*last).as_secs() >= interval_secs,
            None => true,
        }
    }

    pub fn mark_polled(&mut self, collection: &str, at: Instant) {
        self.last_poll.insert(collection.to_string(), at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_cycle_forces_everything() {
        let mut schedule = PollSchedule::new();
        let now = Instant::now();
        schedule.mark_polled("cpu", now);
        assert!(schedule.is_due("cpu", 3600, now, true));
    }

    #[test]
    fn unpolled_collection_is_due() {
        let schedule = PollSchedule::new();
        assert!(schedule.is_due("cpu", 30, Instant::now(), false));
    }

    #[test]
    fn due_only_after_interval_elapses() {
        let mut schedule = PollSchedule::new();
        let start = Instant::now();
        schedule.mark_polled("cpu", start);

        assert!(!schedule.is_due("cpu", 30, start + Duration::from_secs(10), false));
        assert!(schedule.is_due("cpu", 30, start + Duration::from_secs(30), false));
    }

    #[test]
    fn collections_tracked_independently() {
        let mut schedule = PollSchedule::new();
        let start = Instant::now();
        schedule.mark_polled("cpu", start);

        let later = start + Duration::from_secs(45);
        assert!(schedule.is_due("cpu", 30, later, false));
        assert!(schedule.is_due("neighbors", 300, later, false));
    }
}
