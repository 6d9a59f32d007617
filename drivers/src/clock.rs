/*++

Licensed under the Apache-2.0 license.

File Name:

    clock.rs

Abstract:

    File contains the monotonic millisecond time source used by the replay
    timer.

--*/

/// Free-running millisecond counter.
///
/// The counter is allowed to wrap; callers compare readings with
/// [`MonotonicClock::elapsed_ms`].
pub trait MonotonicClock {
    fn now_ms(&self) -> u32;

    /// Milliseconds since `since`, tolerant of one counter wrap.
    fn elapsed_ms(&self, since: u32) -> u32 {
        self.now_ms().wrapping_sub(since)
    }
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct Fixed(Cell<u32>);

    impl MonotonicClock for Fixed {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    #[test]
    fn test_elapsed_across_wrap() {
        let clock = Fixed(Cell::new(u32::MAX - 9));
        let start = clock.now_ms();
        clock.0.set(20);
        assert_eq!(clock.elapsed_ms(start), 30);
    }
}
