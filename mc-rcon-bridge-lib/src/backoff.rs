use std::time::Duration;

/// Reconnect delay for the connection supervisor
///
/// After `k` consecutive failures the delay is `min(floor * factor^k, ceiling)`.
/// A success resets the streak.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    factor: f64,
    current: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration, factor: f64) -> Self {
        Self {
            floor,
            ceiling,
            factor,
            current: floor,
            failures: 0,
        }
    }

    /// Records a failure and returns how long to wait before the next attempt
    pub fn failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.current = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.factor)
            .unwrap_or(self.ceiling)
            .min(self.ceiling);
        self.current
    }

    /// Records a success, resetting the delay to the floor
    pub fn reset(&mut self) {
        self.current = self.floor;
        self.failures = 0;
    }

    /// Number of failures since the last success
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn expected(floor: Duration, factor: f64, k: i32, ceiling: Duration) -> Duration {
        floor.mul_f64(factor.powi(k)).min(ceiling)
    }

    #[test]
    fn grows_geometrically_until_ceiling() {
        let floor = Duration::from_secs(1);
        let ceiling = Duration::from_secs(30);
        let mut backoff = Backoff::new(floor, ceiling, 2.0);

        for k in 1..=10 {
            let delay = backoff.failure();
            let want = expected(floor, 2.0, k, ceiling);
            let diff = if delay > want { delay - want } else { want - delay };
            assert!(diff < Duration::from_millis(1), "k = {}: {:?} vs {:?}", k, delay, want);
            assert!(delay <= ceiling);
        }

        assert_eq!(backoff.failures(), 10);
        assert_eq!(backoff.failure(), ceiling);
    }

    #[test]
    fn success_resets_the_streak() {
        let floor = Duration::from_millis(500);
        let mut backoff = Backoff::new(floor, Duration::from_secs(8), 1.7);

        for _ in 0..20 {
            backoff.failure();
        }
        assert_eq!(backoff.failure(), Duration::from_secs(8));

        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.failure(), floor.mul_f64(1.7));
    }
}
