//! # Distributed Task Submission
//!
//! A lazily provisioned worker pool with a submit/gather lifecycle:
//!
//! 1. [`Remote::submit`] hands a future to the pool without blocking the
//!    caller and returns a [`TaskHandle`] immediately. The pool is
//!    provisioned on the first submission, never at construction.
//! 2. [`Remote::gather_all`] awaits every handle once, in submission order,
//!    converting each task's outcome (including panics) into a `Result`.
//! 3. [`Remote::close`] releases the pool. Closing a pool that was never
//!    started is a no-op.
//!
//! At most `workers` tasks run concurrently; further submissions queue on
//! the pool's permits.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::DriftError;

/// Pending result of a submitted task
pub struct TaskHandle<T> {
    join: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    /// Await this task's completion. A panicked or cancelled task surfaces
    /// as an execution error instead of unwinding into the caller.
    pub async fn gather(self) -> Result<T, DriftError> {
        self.join
            .await
            .map_err(|e| DriftError::Execution(format!("remote task did not complete: {}", e)))
    }
}

/// Handle to a lazily started worker pool
pub struct Remote {
    workers: usize,
    pool: Option<Arc<Semaphore>>,
}

impl Remote {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            pool: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.pool.is_some()
    }

    fn ensure_started(&mut self) -> Result<Arc<Semaphore>, DriftError> {
        if let Some(pool) = &self.pool {
            return Ok(Arc::clone(pool));
        }
        if self.workers == 0 {
            return Err(DriftError::Configuration(
                "cannot start a worker pool with 0 workers".to_string(),
            ));
        }
        info!(workers = self.workers, "starting worker pool");
        let pool = Arc::new(Semaphore::new(self.workers));
        self.pool = Some(Arc::clone(&pool));
        Ok(pool)
    }

    /// Queue a task on the pool and return immediately. Starts the pool on
    /// first use; pool provisioning failure is fatal, task failures are not.
    pub fn submit<F>(&mut self, task: F) -> Result<TaskHandle<F::Output>, DriftError>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let pool = self.ensure_started()?;
        let join = tokio::spawn(async move {
            // acquire fails only when the pool is closed mid-run; the task
            // then runs unthrottled rather than being lost
            let _permit = pool.acquire_owned().await.ok();
            task.await
        });
        Ok(TaskHandle { join })
    }

    /// Await all handles, preserving submission order
    pub async fn gather_all<T>(handles: Vec<TaskHandle<T>>) -> Vec<Result<T, DriftError>> {
        futures::future::join_all(handles.into_iter().map(TaskHandle::gather)).await
    }

    /// Release the pool. Safe to call whether or not it was ever started.
    pub fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            debug!("closing worker pool");
            pool.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn pool_starts_on_first_submission() {
        let mut remote = Remote::new(2);
        assert!(!remote.is_started());

        let handle = remote.submit(async { 7 }).unwrap();
        assert!(remote.is_started());
        assert_eq!(handle.gather().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn gather_preserves_submission_order() {
        let mut remote = Remote::new(4);
        let mut handles = Vec::new();
        for i in 0..8u32 {
            // later submissions finish first
            let delay = Duration::from_millis(u64::from(8 - i) * 10);
            handles.push(
                remote
                    .submit(async move {
                        tokio::time::sleep(delay).await;
                        i
                    })
                    .unwrap(),
            );
        }

        let results = Remote::gather_all(handles).await;
        let values: Vec<u32> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn panicking_task_fails_only_its_own_handle() {
        let mut remote = Remote::new(2);
        let bad = remote.submit(async { panic!("worker crashed") }).unwrap();
        let good = remote.submit(async { "fine" }).unwrap();

        assert!(bad.gather().await.is_err());
        assert_eq!(good.gather().await.unwrap(), "fine");
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_worker_count() {
        let mut remote = Remote::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(
                remote
                    .submit(async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .unwrap(),
            );
        }
        Remote::gather_all(handles).await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn zero_workers_is_a_configuration_error() {
        let mut remote = Remote::new(0);
        assert!(remote.submit(async {}).is_err());
    }

    #[tokio::test]
    async fn close_without_start_is_noop() {
        let mut remote = Remote::new(3);
        remote.close();
        assert!(!remote.is_started());
    }

    #[tokio::test]
    async fn close_after_use_releases_pool() {
        let mut remote = Remote::new(1);
        let handle = remote.submit(async { 1 }).unwrap();
        handle.gather().await.unwrap();
        remote.close();
        assert!(!remote.is_started());
    }
}
