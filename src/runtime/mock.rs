//! Mock container runtime for testing
//!
//! Simulates container runs without a container backend: configurable exit
//! code, artificial run duration, and result files dropped into the
//! read-write mount. Records all invocations for assertions.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{ContainerHandle, ContainerRuntime, VolumeMount, WaitOutcome};
use crate::error::DriftError;

/// One recorded `run` call
#[derive(Debug, Clone)]
pub struct RunInvocation {
    pub image: String,
    pub command: Vec<String>,
    pub volumes: Vec<VolumeMount>,
    pub env: Vec<(String, String)>,
}

/// Mock runtime with configurable container behavior
pub struct MockRuntime {
    exit_code: i64,
    run_duration: Duration,
    /// Files written into the read-write mount when a container "runs"
    result_files: Vec<(String, String)>,
    invocations: Arc<Mutex<Vec<RunInvocation>>>,
    pulls: Arc<AtomicUsize>,
    prunes: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            exit_code: 0,
            run_duration: Duration::ZERO,
            result_files: Vec::new(),
            invocations: Arc::new(Mutex::new(Vec::new())),
            pulls: Arc::new(AtomicUsize::new(0)),
            prunes: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Exit code every container finishes with
    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    /// How long every container takes to finish
    pub fn with_run_duration(mut self, duration: Duration) -> Self {
        self.run_duration = duration;
        self
    }

    /// Drop a file with the given name into the read-write mount on each run
    pub fn with_result_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.result_files.push((name.into(), contents.into()));
        self
    }

    /// Convenience: a scores vector formatted one value per line
    pub fn with_scores_file(self, name: impl Into<String>, scores: &[f64]) -> Self {
        let contents = scores
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        self.with_result_file(name, contents)
    }

    pub fn invocations(&self) -> Vec<RunInvocation> {
        self.invocations.lock().expect("invocation log poisoned").clone()
    }

    pub fn pull_count(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    pub fn prune_count(&self) -> usize {
        self.prunes.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(
        &self,
        image: &str,
        command: &[String],
        volumes: &[VolumeMount],
        env: &[(String, String)],
    ) -> Result<Box<dyn ContainerHandle>, DriftError> {
        self.invocations
            .lock()
            .expect("invocation log poisoned")
            .push(RunInvocation {
                image: image.to_string(),
                command: command.to_vec(),
                volumes: volumes.to_vec(),
                env: env.to_vec(),
            });

        if let Some(results_mount) = volumes.iter().find(|mount| !mount.read_only) {
            for (name, contents) in &self.result_files {
                fs::write(results_mount.source.join(name), contents)?;
            }
        }

        Ok(Box::new(MockHandle {
            container_id: format!("mock-{}", self.invocations.lock().expect("invocation log poisoned").len()),
            exit_code: self.exit_code,
            run_duration: self.run_duration,
            stops: Arc::clone(&self.stops),
        }))
    }

    async fn pull(&self, _image: &str, _tag: &str) -> Result<(), DriftError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn prune_stopped(&self) -> Result<(), DriftError> {
        self.prunes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockHandle {
    container_id: String,
    exit_code: i64,
    run_duration: Duration,
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl ContainerHandle for MockHandle {
    fn id(&self) -> &str {
        &self.container_id
    }

    async fn wait(&mut self, deadline: Duration) -> Result<WaitOutcome, DriftError> {
        if self.run_duration > deadline {
            tokio::time::sleep(deadline).await;
            Ok(WaitOutcome::TimedOut)
        } else {
            tokio::time::sleep(self.run_duration).await;
            Ok(WaitOutcome::Exited(self.exit_code))
        }
    }

    async fn stop(&mut self) -> Result<(), DriftError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
