//! Phase timing for evaluation runs
//!
//! Each (algorithm, dataset) pair is timed in up to three phases:
//! `pre` (reserved for a training/preprocessing step), `main` (the adapter
//! call) and `post` (metric evaluation).

use std::future::Future;
use std::time::{Duration, Instant};

/// Per-phase wall-clock durations for one evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Times {
    pub pre: Option<Duration>,
    pub main: Option<Duration>,
    pub post: Option<Duration>,
}

impl Times {
    /// Times with only the main phase measured
    pub fn main_only(main: Duration) -> Self {
        Self {
            pre: None,
            main: Some(main),
            post: None,
        }
    }

    pub fn with_post(mut self, post: Duration) -> Self {
        self.post = Some(post);
        self
    }

    /// Phase durations in seconds, in (pre, main, post) order, for table export
    pub fn to_secs(&self) -> [Option<f64>; 3] {
        [self.pre, self.main, self.post].map(|d| d.map(|d| d.as_secs_f64()))
    }
}

/// Await a future and measure its wall-clock duration
pub async fn timed<F: Future>(fut: F) -> (F::Output, Duration) {
    let start = Instant::now();
    let out = fut.await;
    (out, start.elapsed())
}

/// Run a closure and measure its wall-clock duration
pub fn timed_sync<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_only_leaves_other_phases_empty() {
        let times = Times::main_only(Duration::from_millis(500));
        assert_eq!(times.pre, None);
        assert_eq!(times.main, Some(Duration::from_millis(500)));
        assert_eq!(times.post, None);
    }

    #[test]
    fn to_secs_preserves_phase_order() {
        let times = Times::main_only(Duration::from_millis(1500)).with_post(Duration::from_secs(2));
        let [pre, main, post] = times.to_secs();
        assert_eq!(pre, None);
        assert_eq!(main, Some(1.5));
        assert_eq!(post, Some(2.0));
    }

    #[test]
    fn timed_sync_returns_closure_output() {
        let ((), elapsed) = timed_sync(|| std::thread::sleep(Duration::from_millis(10)));
        assert!(elapsed >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn timed_measures_future_duration() {
        let (value, elapsed) = timed(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            42
        })
        .await;
        assert_eq!(value, 42);
        assert!(elapsed >= Duration::from_millis(20));
    }
}
