use std::{collections::VecDeque, time::Duration, time::Instant};

pub const FRAME_TIME_SAMPLES: usize = 60;

/// Rolling frame statistics over the last [`FRAME_TIME_SAMPLES`] frames.
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    frame_time: VecDeque<Duration>,
    frame_timestamp: VecDeque<Instant>,
}

impl PerformanceTracker {
    pub fn frame_time(&self) -> &VecDeque<Duration> {
        &self.frame_time
    }

    pub fn last_frame_time(&self) -> Option<&Duration> {
        self.frame_time.back()
    }

    pub fn avg_frame_time(&self) -> Option<Duration> {
        let samples = u32::try_from(self.frame_time.len()).ok()?;
        if samples == 0 {
            return None;
        }
        Some(self.frame_time.iter().sum::<Duration>() / samples)
    }

    pub fn add_sample(&mut self, frame_time: Duration, frame_timestamp: Instant) {
        self.frame_time.push_back(frame_time);
        while self.frame_time.len() > FRAME_TIME_SAMPLES {
            self.frame_time.pop_front();
        }

        self.frame_timestamp.push_back(frame_timestamp);
        while self.frame_timestamp.len() > FRAME_TIME_SAMPLES {
            self.frame_timestamp.pop_front();
        }
    }

    pub fn fps(&self) -> Option<f32> {
        let (first, last) = self.frame_timestamp.front().zip(self.frame_timestamp.back())?;
        if first == last {
            return None;
        }
        let intervals = self.frame_timestamp.len() - 1;
        let duration = *last - *first;
        let avg_duration = duration.as_nanos() as f32 / intervals as f32;
        let one_second = Duration::from_secs(1).as_nanos() as f32;
        Some(one_second / avg_duration)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_tracker_reports_nothing() {
        let tracker = PerformanceTracker::default();
        assert!(tracker.last_frame_time().is_none());
        assert!(tracker.avg_frame_time().is_none());
        assert!(tracker.fps().is_none());
    }

    #[test]
    fn single_sample_has_no_fps() {
        let mut tracker = PerformanceTracker::default();
        tracker.add_sample(Duration::from_millis(5), Instant::now());
        assert_eq!(tracker.last_frame_time(), Some(&Duration::from_millis(5)));
        assert!(tracker.fps().is_none());
    }

    #[test]
    fn averages_frame_times_and_rate() {
        let mut tracker = PerformanceTracker::default();
        let start = Instant::now();
        for index in 0..5u64 {
            tracker.add_sample(
                Duration::from_millis(2 + index * 2),
                start + Duration::from_millis(index * 20),
            );
        }
        assert_eq!(tracker.last_frame_time(), Some(&Duration::from_millis(10)));
        assert_eq!(tracker.avg_frame_time(), Some(Duration::from_millis(6)));
        let fps = tracker.fps().unwrap();
        assert!((fps - 50.0).abs() < 0.01);
    }

    #[test]
    fn keeps_only_the_latest_window() {
        let mut tracker = PerformanceTracker::default();
        let start = Instant::now();
        for index in 0..(FRAME_TIME_SAMPLES as u64 + 10) {
            tracker.add_sample(
                Duration::from_millis(index),
                start + Duration::from_millis(index),
            );
        }
        assert_eq!(tracker.frame_time().len(), FRAME_TIME_SAMPLES);
        assert_eq!(tracker.frame_time().front(), Some(&Duration::from_millis(10)));
    }
}
