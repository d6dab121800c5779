//! Per-item progress with freeze and resume

use std::time::Duration;

/// Linear progress over a fixed total duration.
///
/// Stores the time accumulated while running plus the start of the current
/// running stretch, so freezing and resuming only move a scalar and can be
/// repeated from any tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    total: Duration,
    accumulated: Duration,
    running_since: Option<Duration>,
}

impl Progress {
    /// Creates stopped progress at zero
    pub fn new(total: Duration) -> Self {
        Self {
            total,
            accumulated: Duration::ZERO,
            running_since: None,
        }
    }

    /// Resets to zero and starts running at `now`
    pub fn restart(&mut self, now: Duration) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(now);
    }

    /// Stops in place, keeping the value reached at `now`
    pub fn freeze(&mut self, now: Duration) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += now.saturating_sub(since);
        }
    }

    /// Continues from the frozen value
    pub fn resume(&mut self, now: Duration) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    /// Running time at `now`, capped at the total
    pub fn elapsed(&self, now: Duration) -> Duration {
        let running = self
            .running_since
            .map_or(Duration::ZERO, |since| now.saturating_sub(since));
        (self.accumulated + running).min(self.total)
    }

    /// `min(1, elapsed / total)`
    pub fn fraction(&self, now: Duration) -> f64 {
        if self.total.is_zero() {
            return 1.0;
        }
        (self.elapsed(now).as_secs_f64() / self.total.as_secs_f64()).min(1.0)
    }

    pub fn is_complete(&self, now: Duration) -> bool {
        self.elapsed(now) >= self.total
    }
}

/// Formats seconds into a human-readable duration string
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor() as u64;
        let remaining = secs - (mins as f64 * 60.0);
        format!("{}m {:.0}s", mins, remaining)
    } else {
        let hours = (secs / 3600.0).floor() as u64;
        let remaining = secs - (hours as f64 * 3600.0);
        let mins = (remaining / 60.0).floor() as u64;
        format!("{}h {}m", hours, mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_fraction_runs_linearly_and_caps() {
        let mut p = Progress::new(ms(5_000));
        assert_eq!(p.fraction(ms(1_000)), 0.0);

        p.restart(ms(1_000));
        assert_eq!(p.fraction(ms(2_000)), 0.2);
        assert_eq!(p.fraction(ms(6_000)), 1.0);
        assert_eq!(p.fraction(ms(60_000)), 1.0);
        assert!(p.is_complete(ms(6_000)));
    }

    #[test]
    fn test_freeze_and_resume_continue_from_frozen_value() {
        let mut p = Progress::new(ms(5_000));
        p.restart(ms(0));
        p.freeze(ms(2_000));
        assert_eq!(p.fraction(ms(9_000)), 0.4);

        // Repeated freeze/resume is harmless
        p.freeze(ms(9_500));
        p.resume(ms(10_000));
        p.resume(ms(10_500));
        assert_eq!(p.fraction(ms(10_000)), 0.4);
        assert_eq!(p.fraction(ms(11_000)), 0.6);
    }

    #[test]
    fn test_zero_total_is_immediately_complete() {
        let mut p = Progress::new(Duration::ZERO);
        p.restart(ms(0));
        assert_eq!(p.fraction(ms(0)), 1.0);
        assert!(p.is_complete(ms(0)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(4.34), "4.3s");
        assert_eq!(format_duration(75.0), "1m 15s");
        assert_eq!(format_duration(3_720.0), "1h 2m");
    }
}
