//! Monotonic time source for stack deadlines

use crate::time::{Duration, Instant};

/// Monotonic millisecond clock with a blocking delay
///
/// The stack busy-waits against [`Clock::now`] while polling the receive
/// buffer. [`Clock::relax`] is called once per empty poll iteration; the
/// default implementation does nothing, which is adequate for bare-metal
/// masters. Hosts with a scheduler should yield or sleep briefly there so the
/// poll loop does not monopolize a core.
pub trait Clock {
    /// Current instant. Wraps after about 49 days; deadline arithmetic uses
    /// wrapping comparisons and is unaffected as long as individual waits
    /// stay far below half the range.
    fn now(&self) -> Instant;

    /// Blocks for at least the given duration.
    fn delay(&mut self, duration: Duration);

    /// Hook invoked while busy-waiting on reception.
    fn relax(&mut self) {}
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn now(&self) -> Instant {
        T::now(self)
    }

    fn delay(&mut self, duration: Duration) {
        T::delay(self, duration)
    }

    fn relax(&mut self) {
        T::relax(self)
    }
}
