//! Bounded retry/poll combinator
//!
//! Converted files can lag behind the tool that wrote them (subprocess exit
//! vs. filesystem flush), so several call sites poll for readiness. All of
//! them go through this one combinator: a fixed attempt budget and a fixed
//! delay, parameterized per call site, never unbounded.

use std::thread;
use std::time::Duration;

/// Run `probe` up to `max_attempts` times, sleeping `delay` between attempts.
///
/// Returns the first `Some` the probe produces, or `None` once the budget is
/// exhausted. No sleep after the final attempt.
pub fn poll_until<T, F>(max_attempts: u32, delay: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    for attempt in 1..=max_attempts {
        if let Some(value) = probe() {
            return Some(value);
        }
        if attempt < max_attempts {
            thread::sleep(delay);
        }
    }
    None
}
