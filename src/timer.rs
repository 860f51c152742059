//! Monotonic stopwatch used for every phase measurement.

use std::time::{Duration, Instant};

/// Wall-clock stopwatch backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Render a duration as `H:MM:SS.ffffff`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!(
        "{}:{:02}:{:02}.{:06}",
        hours,
        minutes,
        seconds,
        d.subsec_micros()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_elapsed() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.elapsed();

        assert!(elapsed >= Duration::from_millis(10));
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0:00:00.000000");
        assert_eq!(
            format_duration(Duration::from_micros(3_723_000_042)),
            "1:02:03.000042"
        );
    }
}
