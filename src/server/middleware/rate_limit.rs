use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::fmt;

/// Throttles tile changes for a single connection.
///
/// The quota is one change per cooldown with no burst, so a change is
/// accepted when none has been accepted yet or when the cooldown has fully
/// elapsed since the last accepted one. Rejected attempts do not move the
/// window.
pub struct ChangeRateLimiter<C: Clock = DefaultClock> {
    limiter: RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<C::Instant>>,
}

impl ChangeRateLimiter {
    /// Creates a limiter driven by the system clock.
    pub fn new(quota: Quota) -> Self {
        Self::with_clock(quota, &DefaultClock::default())
    }
}

impl<C: Clock> ChangeRateLimiter<C> {
    pub fn with_clock(quota: Quota, clock: &C) -> Self {
        Self {
            limiter: RateLimiter::direct_with_clock(quota, clock),
        }
    }

    /// Returns `true` and consumes the window if a change may go through now.
    pub fn try_accept(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl<C: Clock> fmt::Debug for ChangeRateLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;
    use std::time::Duration;

    fn limiter(clock: &FakeRelativeClock) -> ChangeRateLimiter<FakeRelativeClock> {
        let quota = Quota::with_period(Duration::from_millis(500)).unwrap();
        ChangeRateLimiter::with_clock(quota, clock)
    }

    #[test]
    fn first_change_is_always_accepted() {
        let clock = FakeRelativeClock::default();
        assert!(limiter(&clock).try_accept());
    }

    #[test]
    fn second_change_inside_window_is_dropped() {
        let clock = FakeRelativeClock::default();
        let limiter = limiter(&clock);

        assert!(limiter.try_accept());
        clock.advance(Duration::from_millis(100));
        assert!(!limiter.try_accept());
        clock.advance(Duration::from_millis(400));
        assert!(limiter.try_accept());
    }

    #[test]
    fn window_slides_from_last_accepted_change() {
        let clock = FakeRelativeClock::default();
        let limiter = limiter(&clock);

        clock.advance(Duration::from_millis(1_250));
        assert!(limiter.try_accept());
        // A rejection at +499ms must not push the next slot back.
        clock.advance(Duration::from_millis(499));
        assert!(!limiter.try_accept());
        clock.advance(Duration::from_millis(1));
        assert!(limiter.try_accept());
        assert!(!limiter.try_accept());
    }
}
