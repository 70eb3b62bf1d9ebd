use std::time::{Duration, Instant};

/// Frame clock. Starts on the first call to [`Clock::get_delta`].
#[derive(Debug, Default, Clone)]
pub struct Clock {
    start_time: Option<Instant>,
    last_time: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }

    /// Seconds since the previous call. The first call returns zero.
    pub fn get_delta(&mut self) -> f32 {
        self.delta_at(Instant::now()).as_secs_f32()
    }

    /// Time since the clock started, zero if it never did.
    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|start_time| start_time.elapsed())
            .unwrap_or_default()
    }

    fn delta_at(&mut self, now: Instant) -> Duration {
        if self.start_time.is_none() {
            self.start_time = Some(now);
        }
        let delta = self
            .last_time
            .map(|last_time| now.saturating_duration_since(last_time))
            .unwrap_or_default();
        self.last_time = Some(now);
        delta
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_delta_is_zero() {
        let mut clock = Clock::new();
        assert!(!clock.is_running());
        assert_eq!(clock.delta_at(Instant::now()), Duration::ZERO);
        assert!(clock.is_running());
    }

    #[test]
    fn delta_measures_between_calls() {
        let mut clock = Clock::new();
        let start = Instant::now();
        clock.delta_at(start);
        let delta = clock.delta_at(start + Duration::from_millis(16));
        assert_eq!(delta, Duration::from_millis(16));
        let delta = clock.delta_at(start + Duration::from_millis(50));
        assert_eq!(delta, Duration::from_millis(34));
    }

    #[test]
    fn delta_never_goes_negative() {
        let mut clock = Clock::new();
        let start = Instant::now() + Duration::from_secs(1);
        clock.delta_at(start);
        assert_eq!(clock.delta_at(start - Duration::from_millis(5)), Duration::ZERO);
    }

    #[test]
    fn elapsed_is_zero_before_start() {
        let clock = Clock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }
}
