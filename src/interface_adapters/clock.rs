use crate::domain::ports::Clock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_read_twice_then_time_does_not_go_backwards() {
        let clock = SystemClock;
        let first = clock.now_millis();
        assert!(first > 0);
        assert!(clock.now_millis() >= first);
    }
}
