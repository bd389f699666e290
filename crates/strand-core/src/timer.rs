//! Logical timestamp sources
//!
//! A [`Timer`] issues the `created` tuple for events added without one.
//! Every value must be greater than all values previously issued by the
//! same source, and must not collide with another source's values.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::clock::{ClockPart, Created};

/// Source of `created` tuples
pub trait Timer: Send + Sync {
    /// Issue the next tuple
    fn next(&self) -> Created;
}

/// Deterministic timer issuing `[1]`, `[2]`, `[3]`, ...
///
/// Intended for tests and single-source logs.
#[derive(Debug, Default)]
pub struct TestTimer {
    last: AtomicI64,
}

impl TestTimer {
    /// Create a timer whose first tuple is `[1]`
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for TestTimer {
    fn next(&self) -> Created {
        let value = self.last.fetch_add(1, Ordering::SeqCst) + 1;
        Created::from([value])
    }
}

/// Timer issuing `[millis, node_id, sequence]` tuples
///
/// `sequence` separates tuples issued within the same millisecond. If the
/// wall clock steps backwards the last seen millisecond is reused, so the
/// output keeps increasing.
pub struct LocalTimer {
    node_id: String,
    clock: Box<dyn Fn() -> i64 + Send + Sync>,
    state: Mutex<(i64, i64)>,
}

impl LocalTimer {
    /// Create a timer for a node using the system clock
    pub fn new(node_id: impl Into<String>) -> Self {
        Self::with_clock(node_id, || chrono::Utc::now().timestamp_millis())
    }

    /// Create a timer with a custom millisecond clock
    pub fn with_clock(
        node_id: impl Into<String>,
        clock: impl Fn() -> i64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            clock: Box::new(clock),
            state: Mutex::new((i64::MIN, 0)),
        }
    }

    /// The node id embedded in every tuple
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

impl std::fmt::Debug for LocalTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTimer")
            .field("node_id", &self.node_id)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl Timer for LocalTimer {
    fn next(&self) -> Created {
        let now = (self.clock)();
        let mut state = self.state.lock();
        let (last_millis, sequence) = *state;

        *state = if now > last_millis {
            (now, 0)
        } else {
            if now < last_millis {
                trace!(now, last_millis, "Clock went backwards, keeping last time");
            }
            (last_millis, sequence + 1)
        };

        let (millis, sequence) = *state;
        Created::new(vec![
            ClockPart::Int(millis),
            ClockPart::Text(self.node_id.clone()),
            ClockPart::Int(sequence),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_test_timer_counts_from_one() {
        let timer = TestTimer::new();
        assert_eq!(timer.next(), Created::from([1]));
        assert_eq!(timer.next(), Created::from([2]));
        assert_eq!(timer.next(), Created::from([3]));
    }

    #[test]
    fn test_local_timer_shape() {
        let timer = LocalTimer::with_clock("node-a", || 1000);
        let created = timer.next();
        assert_eq!(
            created.parts(),
            &[ClockPart::Int(1000), ClockPart::from("node-a"), ClockPart::Int(0)]
        );
    }

    #[test]
    fn test_local_timer_same_millis_increments_sequence() {
        let timer = LocalTimer::with_clock("n", || 42);
        let first = timer.next();
        let second = timer.next();
        assert!(second > first);
        assert_eq!(second.parts()[2], ClockPart::Int(1));
    }

    #[test]
    fn test_local_timer_survives_clock_going_backwards() {
        let now = Arc::new(AtomicI64::new(500));
        let clock = now.clone();
        let timer = LocalTimer::with_clock("n", move || clock.load(Ordering::SeqCst));

        let before = timer.next();
        now.store(100, Ordering::SeqCst);
        let after = timer.next();

        assert!(after > before);
        assert_eq!(after.parts()[0], ClockPart::Int(500));
    }

    #[test]
    fn test_local_timer_orders_across_nodes() {
        let a = LocalTimer::with_clock("a", || 7).next();
        let b = LocalTimer::with_clock("b", || 7).next();
        assert_ne!(a, b);
        assert!(a < b);
    }
}
