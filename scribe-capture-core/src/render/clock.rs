use std::thread;
use std::time::Duration;

use crate::traits::frame_clock::FrameClock;

/// Fixed-period production clock approximating the display refresh
/// cadence: one tick per refresh interval, 60 Hz by default.
#[derive(Debug, Clone)]
pub struct RefreshClock {
    period: Duration,
}

impl RefreshClock {
    pub fn standard() -> Self {
        Self::with_refresh_rate(60)
    }

    pub fn with_refresh_rate(hz: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / hz.max(1) as f64),
        }
    }
}

impl FrameClock for RefreshClock {
    fn wait_frame(&self) -> bool {
        thread::sleep(self.period);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn ticks_keep_coming() {
        let clock = RefreshClock::with_refresh_rate(1_000);
        assert!(clock.wait_frame());
        assert!(clock.wait_frame());
    }

    #[test]
    fn tick_takes_at_least_one_period() {
        let clock = RefreshClock::with_refresh_rate(200);
        let start = Instant::now();
        clock.wait_frame();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn zero_rate_is_clamped() {
        let clock = RefreshClock::with_refresh_rate(0);
        assert_eq!(clock.period, Duration::from_secs(1));
    }
}
