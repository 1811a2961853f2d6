//! # Execution Adapters
//!
//! An adapter translates a generic "run algorithm on data" request into a
//! concrete execution mechanism. The engine depends only on the [`Adapter`]
//! trait, never on the concrete backend:
//!
//! | Adapter | Mechanism | Input |
//! |---------|-----------|-------|
//! | [`FunctionAdapter`] | direct call in-process | in-memory series |
//! | [`ContainerAdapter`] | detached container run | dataset file path |
//!
//! Adapters must not mutate their input and must produce one anomaly score
//! per input timestep, or fail.

mod container;
mod function;

pub use container::{
    AlgorithmInterface, ContainerAdapter, ContainerRunState, ExecutionType, DATASET_TARGET_PATH,
    DEFAULT_TIMEOUT, MODEL_FILE_NAME, RESULTS_TARGET_PATH, SCORES_FILE_NAME,
};
pub use function::FunctionAdapter;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::dataset::SeriesData;
use crate::error::DriftError;

// ============================================================================
// INPUT AND CONFIGURATION
// ============================================================================

/// How an algorithm wants its dataset delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    /// Materialized table, split into features and labels by the engine
    InMemory,
    /// Path to the dataset file; reading is deferred to the adapter
    FilePath,
}

/// Input to one adapter invocation
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmInput {
    Memory(SeriesData),
    File(PathBuf),
}

impl AlgorithmInput {
    pub fn as_file(&self) -> Option<&Path> {
        match self {
            AlgorithmInput::File(path) => Some(path),
            AlgorithmInput::Memory(_) => None,
        }
    }
}

/// Per-run configuration, passed by value into each adapter invocation
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Opaque hyper-parameters forwarded to the algorithm
    pub hyper_params: serde_json::Map<String, serde_json::Value>,
    /// Read-write directory for result artifacts and logs
    pub results_dir: PathBuf,
    /// Overrides the adapter's own deadline when set
    pub timeout_override: Option<Duration>,
}

impl RunConfig {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            hyper_params: serde_json::Map::new(),
            results_dir: results_dir.into(),
            timeout_override: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.hyper_params.insert(key.into(), value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new("./results")
    }
}

// ============================================================================
// ADAPTER TRAIT
// ============================================================================

/// Polymorphic unit of work: input data in, anomaly scores out
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Adapter identity for logs and error messages
    fn name(&self) -> &str;

    /// Run the algorithm and return one score per input timestep
    async fn execute(
        &self,
        input: &AlgorithmInput,
        config: &RunConfig,
    ) -> Result<Vec<f64>, DriftError>;

    /// Optional pre-run hook, called once per algorithm before its dataset
    /// loop (e.g. image pull)
    async fn prepare(&self) -> Result<(), DriftError> {
        Ok(())
    }

    /// Optional post-run hook, called once per engine lifetime (e.g. pruning
    /// stopped containers)
    async fn finalize(&self) -> Result<(), DriftError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_builder() {
        let config = RunConfig::new("/tmp/results")
            .with_param("window_size", serde_json::json!(64))
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.results_dir, PathBuf::from("/tmp/results"));
        assert_eq!(config.hyper_params["window_size"], 64);
        assert_eq!(config.timeout_override, Some(Duration::from_secs(30)));
    }

    #[test]
    fn input_as_file() {
        let file = AlgorithmInput::File(PathBuf::from("/data/ts.csv"));
        assert_eq!(file.as_file(), Some(Path::new("/data/ts.csv")));

        let memory = AlgorithmInput::Memory(SeriesData::Univariate(vec![1.0]));
        assert_eq!(memory.as_file(), None);
    }
}
