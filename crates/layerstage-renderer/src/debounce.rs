use std::time::{Duration, Instant};

/// Trailing-edge debouncer driven by caller-supplied timestamps.
///
/// Each [`trigger`](Self::trigger) pushes the deadline out by `delay`; the
/// debouncer fires once the caller polls at or after the deadline.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once per quiet period, clearing the pending call.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_quiet_period() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        assert!(!d.fire(start));

        d.trigger(start);
        assert!(!d.fire(start + Duration::from_millis(299)));
        assert!(d.fire(start + Duration::from_millis(300)));
        assert!(!d.fire(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_retrigger_extends_deadline() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(100));
        d.trigger(start);
        d.trigger(start + Duration::from_millis(80));
        assert!(!d.fire(start + Duration::from_millis(120)));
        assert!(d.fire(start + Duration::from_millis(180)));
    }

    #[test]
    fn test_pending_until_fired() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        assert!(!d.is_pending());
        d.trigger(start);
        assert!(d.is_pending());
        assert!(d.fire(start + Duration::from_millis(10)));
        assert!(!d.is_pending());
    }
}
