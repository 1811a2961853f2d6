//! # Container Runtime Abstraction
//!
//! Trait and implementations for the container backend used by the
//! containerized execution adapter.
//!
//! ## Overview
//!
//! - [`ContainerRuntime`] - core trait: run, pull, prune
//! - [`ContainerHandle`] - one running container: wait with deadline, stop
//! - [`DockerRuntime`] - production runtime shelling out to the `docker` CLI
//! - [`MockRuntime`] - test runtime with configurable exit code, delay and
//!   scores payload
//!
//! Use [`create_runtime`] to instantiate a runtime by name.

mod docker;
mod mock;

pub use docker::DockerRuntime;
pub use mock::{MockRuntime, RunInvocation};

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;

use crate::error::DriftError;

// ============================================================================
// VOLUMES AND WAIT OUTCOME
// ============================================================================

/// A host directory mounted into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn read_only(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: true,
        }
    }

    pub fn read_write(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }
}

/// Result of waiting on a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Container finished with the given exit code
    Exited(i64),
    /// Deadline elapsed before the container finished
    TimedOut,
}

// ============================================================================
// RUNTIME TRAITS
// ============================================================================

/// One detached container run
#[async_trait]
pub trait ContainerHandle: Send {
    /// Runtime-assigned container identifier
    fn id(&self) -> &str;

    /// Block until the container exits or the deadline elapses.
    /// Never hangs past the deadline.
    async fn wait(&mut self, deadline: Duration) -> Result<WaitOutcome, DriftError>;

    /// Forcibly stop the container
    async fn stop(&mut self) -> Result<(), DriftError>;
}

/// Core trait that all container runtimes must implement
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns the runtime name (e.g. "docker", "mock")
    fn name(&self) -> &str;

    /// Launch a container detached and return a handle to it
    async fn run(
        &self,
        image: &str,
        command: &[String],
        volumes: &[VolumeMount],
        env: &[(String, String)],
    ) -> Result<Box<dyn ContainerHandle>, DriftError>;

    /// Pull or refresh an image
    async fn pull(&self, image: &str, tag: &str) -> Result<(), DriftError>;

    /// Remove all stopped containers
    async fn prune_stopped(&self) -> Result<(), DriftError>;

    /// Check whether the runtime backend is reachable
    fn is_available(&self) -> bool {
        true
    }
}

/// Create a runtime instance by name
pub fn create_runtime(name: &str) -> Result<Arc<dyn ContainerRuntime>, DriftError> {
    match name.to_lowercase().as_str() {
        "docker" => Ok(Arc::new(DockerRuntime::new())),
        "mock" => Ok(Arc::new(MockRuntime::new())),
        _ => Err(DriftError::Configuration(format!(
            "Unknown container runtime: '{}'. Available: docker, mock",
            name
        ))),
    }
}

// ============================================================================
// HOST IDENTITY
// ============================================================================

static HOST_UID: OnceCell<String> = OnceCell::new();

/// Numeric uid of the current process owner, cached per process
pub fn host_uid() -> String {
    HOST_UID
        .get_or_init(|| {
            Command::new("id")
                .arg("-u")
                .output()
                .ok()
                .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
                .unwrap_or_default()
        })
        .clone()
}

/// Numeric gid of the given group name, empty when the group is unknown
pub fn host_gid(group: &str) -> String {
    let output = Command::new("getent").args(["group", group]).output();
    match output {
        Ok(out) => {
            let line = String::from_utf8_lossy(&out.stdout);
            line.trim().split(':').nth(2).unwrap_or("").to_string()
        }
        Err(_) => String::new(),
    }
}
