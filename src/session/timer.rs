use std::time::{Duration, Instant};

/// A one-shot deadline polled from the event loop. Arming or cancelling bumps
/// the generation, so a deadline can fire at most once and never after it was
/// replaced.
#[derive(Clone, Debug, Default)]
pub struct AdvanceTimer {
    generation: u64,
    pending: Option<(Instant, u64)>,
}

impl AdvanceTimer {
    pub fn arm(&mut self, now: Instant, delay: Duration) -> Instant {
        self.generation += 1;
        let deadline = now + delay;
        self.pending = Some((deadline, self.generation));
        deadline
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(deadline, _)| deadline)
    }

    /// True exactly once, on the first poll at or past the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some((deadline, generation)) if generation == self.generation && now >= deadline => {
                self.pending = None;
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
    fn fires_once_after_deadline() {
        let mut timer = AdvanceTimer::default();
        let start = Instant::now();
        timer.arm(start, Duration::from_millis(100));
        assert!(!timer.poll(start + Duration::from_millis(50)));
        assert!(timer.poll(start + Duration::from_millis(100)));
        assert!(!timer.poll(start + Duration::from_millis(200)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn cancel_prevents_firing() {
        let mut timer = AdvanceTimer::default();
        let start = Instant::now();
        timer.arm(start, Duration::from_millis(10));
        timer.cancel();
        assert!(!timer.poll(start + Duration::from_secs(1)));
    }

    #[test]
    fn rearm_replaces_deadline() {
        let mut timer = AdvanceTimer::default();
        let start = Instant::now();
        timer.arm(start, Duration::from_millis(10));
        timer.arm(start, Duration::from_millis(500));
        assert!(!timer.poll(start + Duration::from_millis(100)));
        assert!(timer.poll(start + Duration::from_millis(500)));
    }
}
