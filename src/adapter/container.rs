//! Containerized execution adapter
//!
//! Runs an algorithm in an isolated container, exchanging data through the
//! filesystem and a single JSON argument, enforcing a hard deadline, and
//! classifying the outcome.
//!
//! ## Wire contract
//!
//! The serialized [`AlgorithmInterface`] is the contract between the
//! orchestrator and the algorithm container. Field names, the lowercased
//! execution type and plain-string paths must round-trip exactly:
//!
//! ```text
//! { "dataInput": "/data/ts.csv", "dataOutput": "/results/docker-algorithm-scores.csv",
//!   "modelInput": "/results/model.pkl", "modelOutput": "/results/model.pkl",
//!   "customParameters": {...}, "executionType": "execute" }
//! ```
//!
//! The dataset's parent directory is mounted read-only at `/data`, the
//! results directory read-write at `/results`. Exit code 0 means success,
//! anything else is an algorithm failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Adapter, AlgorithmInput, RunConfig};
use crate::dataset;
use crate::error::DriftError;
use crate::runtime::{
    host_gid, host_uid, ContainerHandle, ContainerRuntime, VolumeMount, WaitOutcome,
};

// ============================================================================
// PROTOCOL CONSTANTS
// ============================================================================

/// In-container mount point of the dataset directory (read-only)
pub const DATASET_TARGET_PATH: &str = "/data";
/// In-container mount point of the results directory (read-write)
pub const RESULTS_TARGET_PATH: &str = "/results";
/// Scores artifact: flat numeric vector, one score per input row
pub const SCORES_FILE_NAME: &str = "docker-algorithm-scores.csv";
/// Opaque model artifact, only relevant to the train/execute split
pub const MODEL_FILE_NAME: &str = "model.pkl";
/// Default container deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);

const DEFAULT_TAG: &str = "latest";
const DEFAULT_GROUP: &str = "akita";
const ENTRYPOINT: &str = "execute-algorithm";

// ============================================================================
// WIRE MESSAGE
// ============================================================================

/// Whether the container trains a model or scores a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionType {
    Train,
    Execute,
}

/// Message passed to the container entrypoint as its single JSON argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmInterface {
    pub data_input: PathBuf,
    pub data_output: PathBuf,
    pub model_input: PathBuf,
    pub model_output: PathBuf,
    #[serde(default)]
    pub custom_parameters: serde_json::Map<String, serde_json::Value>,
    pub execution_type: ExecutionType,
}

impl AlgorithmInterface {
    /// Message for an EXECUTE run over the given dataset file.
    /// TRAIN is reserved for a separate training phase.
    pub fn for_execution(
        dataset_file: &Path,
        custom_parameters: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, DriftError> {
        let file_name = dataset_file.file_name().ok_or_else(|| {
            DriftError::Execution(format!(
                "dataset path '{}' has no file name",
                dataset_file.display()
            ))
        })?;

        Ok(Self {
            data_input: Path::new(DATASET_TARGET_PATH).join(file_name),
            data_output: Path::new(RESULTS_TARGET_PATH).join(SCORES_FILE_NAME),
            model_input: Path::new(RESULTS_TARGET_PATH).join(MODEL_FILE_NAME),
            model_output: Path::new(RESULTS_TARGET_PATH).join(MODEL_FILE_NAME),
            custom_parameters,
            execution_type: ExecutionType::Execute,
        })
    }

    /// Serialize to the wire format (v1, stable)
    pub fn to_json_string(&self) -> Result<String, DriftError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a wire message back into its structured form
    pub fn from_json_str(json: &str) -> Result<Self, DriftError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// RUN STATE MACHINE
// ============================================================================

/// Lifecycle of one container run.
///
/// `Created -> Running -> {ExitedOk, ExitedFailed, TimedOut}`; a timeout
/// forces a transition through `Stopping` before becoming terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRunState {
    Created,
    Running,
    Stopping,
    ExitedOk,
    ExitedFailed,
    TimedOut,
}

impl ContainerRunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ContainerRunState::ExitedOk
                | ContainerRunState::ExitedFailed
                | ContainerRunState::TimedOut
        )
    }
}

// ============================================================================
// CONTAINER ADAPTER
// ============================================================================

/// Adapter running algorithms as isolated containers
pub struct ContainerAdapter {
    image: String,
    tag: String,
    group_privileges: String,
    skip_pull: bool,
    timeout: Duration,
    hyper_params: serde_json::Map<String, serde_json::Value>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerAdapter {
    pub fn new(image: impl Into<String>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            image: image.into(),
            tag: DEFAULT_TAG.to_string(),
            group_privileges: DEFAULT_GROUP.to_string(),
            skip_pull: false,
            timeout: DEFAULT_TIMEOUT,
            hyper_params: serde_json::Map::new(),
            runtime,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Group whose gid is handed to the container for file ownership
    pub fn with_group_privileges(mut self, group: impl Into<String>) -> Self {
        self.group_privileges = group.into();
        self
    }

    /// Skip the image pull in the prepare hook
    pub fn skip_pull(mut self) -> Self {
        self.skip_pull = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Hyper-parameters forwarded to this algorithm on every run
    pub fn with_params(mut self, params: serde_json::Map<String, serde_json::Value>) -> Self {
        self.hyper_params = params;
        self
    }

    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    async fn launch(
        &self,
        dataset_file: &Path,
        config: &RunConfig,
    ) -> Result<Box<dyn ContainerHandle>, DriftError> {
        // Run-level parameters override the adapter's own
        let mut params = self.hyper_params.clone();
        params.extend(config.hyper_params.clone());
        let message = AlgorithmInterface::for_execution(dataset_file, params)?;
        let payload = message.to_json_string()?;

        let dataset_dir = dataset_file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| {
                DriftError::Execution(format!(
                    "dataset path '{}' has no parent directory to mount",
                    dataset_file.display()
                ))
            })?;
        std::fs::create_dir_all(&config.results_dir)?;

        let volumes = [
            VolumeMount::read_only(dataset_dir, DATASET_TARGET_PATH),
            VolumeMount::read_write(&config.results_dir, RESULTS_TARGET_PATH),
        ];

        let uid = host_uid();
        let gid = host_gid(&self.group_privileges);
        info!(image = %self.image_ref(), uid, gid, "running container");
        let env = [
            ("LOCAL_UID".to_string(), uid),
            ("LOCAL_GID".to_string(), gid),
        ];

        let command = [ENTRYPOINT.to_string(), payload];
        self.runtime
            .run(&self.image_ref(), &command, &volumes, &env)
            .await
    }

    /// Block until the container exits or the deadline elapses, classifying
    /// the outcome. A timed out container is force-stopped, never left
    /// running.
    async fn wait_for_exit(
        &self,
        handle: &mut Box<dyn ContainerHandle>,
        deadline: Duration,
        started: Instant,
        config: &RunConfig,
    ) -> Result<(), DriftError> {
        let mut state = ContainerRunState::Running;
        debug!(container_id = handle.id(), ?state, "waiting for container");

        match handle.wait(deadline).await? {
            WaitOutcome::Exited(0) => {
                state = ContainerRunState::ExitedOk;
                debug!(container_id = handle.id(), ?state, "container finished");
                Ok(())
            }
            WaitOutcome::Exited(code) => {
                state = ContainerRunState::ExitedFailed;
                debug!(container_id = handle.id(), ?state, code, "container failed");
                Err(DriftError::AlgorithmFailed {
                    code,
                    results_path: config.results_dir.clone(),
                })
            }
            WaitOutcome::TimedOut => {
                state = ContainerRunState::Stopping;
                debug!(container_id = handle.id(), ?state, "deadline elapsed");
                if let Err(e) = handle.stop().await {
                    warn!(container_id = handle.id(), error = %e, "failed to stop container");
                }
                state = ContainerRunState::TimedOut;
                debug!(container_id = handle.id(), ?state, "container stopped");
                Err(DriftError::Timeout {
                    algorithm: self.image_ref(),
                    elapsed: started.elapsed(),
                })
            }
        }
    }

    fn read_scores(&self, config: &RunConfig) -> Result<Vec<f64>, DriftError> {
        dataset::read_vector(&config.results_dir.join(SCORES_FILE_NAME))
    }
}

#[async_trait]
impl Adapter for ContainerAdapter {
    fn name(&self) -> &str {
        &self.image
    }

    async fn execute(
        &self,
        input: &AlgorithmInput,
        config: &RunConfig,
    ) -> Result<Vec<f64>, DriftError> {
        let dataset_file = input.as_file().ok_or_else(|| {
            DriftError::Execution(
                "container adapters cannot take in-memory data, provide the dataset path"
                    .to_string(),
            )
        })?;

        let deadline = config.timeout_override.unwrap_or(self.timeout);
        let started = Instant::now();
        let mut handle = self.launch(dataset_file, config).await?;
        self.wait_for_exit(&mut handle, deadline, started, config)
            .await?;
        self.read_scores(config)
    }

    async fn prepare(&self) -> Result<(), DriftError> {
        if self.skip_pull {
            debug!(image = %self.image_ref(), "skipping image pull");
            return Ok(());
        }
        self.runtime.pull(&self.image, &self.tag).await
    }

    async fn finalize(&self) -> Result<(), DriftError> {
        self.runtime.prune_stopped().await
    }
}
