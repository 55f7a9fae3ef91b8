//! The breaker's time source.
//!
//! Recovery windows are measured with [`now`], which reads the system monotonic clock unless a
//! [`FrozenClock`] is installed on the current thread by [`freeze`]. Call timeouts always use real
//! time.

use std::cell::Cell;
use std::time::{Duration, Instant};

thread_local!(static CLOCK: Cell<Option<*const FrozenClock>> = Cell::new(None));

/// A manually advanced clock, see [`freeze`].
#[derive(Debug)]
pub struct FrozenClock(Instant);

impl FrozenClock {
    fn new() -> FrozenClock {
        FrozenClock(Instant::now())
    }

    /// Returns the frozen instant.
    pub fn now(&self) -> Instant {
        self.0
    }

    /// Moves the clock forward by `diff`.
    pub fn advance(&mut self, diff: Duration) {
        self.0 += diff
    }
}

/// Runs `f` with a frozen clock installed for the current thread.
///
/// # Panics
///
/// When a clock is already frozen on this thread.
pub fn freeze<F, R>(f: F) -> R
where
    F: FnOnce(&mut FrozenClock) -> R,
{
    CLOCK.with(|cell| {
        let mut clock = FrozenClock::new();

        assert!(
            cell.get().is_none(),
            "clock already frozen for this thread"
        );

        // Uninstall on scope exit, panics included.
        struct Reset<'a>(&'a Cell<Option<*const FrozenClock>>);

        impl<'a> Drop for Reset<'a> {
            fn drop(&mut self) {
                self.0.set(None);
            }
        }

        let _reset = Reset(cell);

        cell.set(Some(&clock as *const FrozenClock));

        f(&mut clock)
    })
}

/// Returns the current instant of this thread's clock.
pub fn now() -> Instant {
    CLOCK.with(|current| match current.get() {
        // The pointer is only set while `freeze` holds the clock on this stack.
        Some(ptr) => unsafe { (*ptr).now() },
        None => Instant::now(),
    })
}
