//! Error types with fix suggestions

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
///
/// Per-pair faults (dataset shape, timeout, algorithm failure, result read)
/// are swallowed by the engine and turned into result rows; only batch-level
/// preconditions and worker-pool provisioning failures abort a run.
#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dataset '{dataset}' has a shape that was not expected: {rows} rows x {columns} columns")]
    DatasetShape {
        dataset: String,
        rows: usize,
        columns: usize,
    },

    #[error("{algorithm} timed out after {elapsed:?}")]
    Timeout {
        algorithm: String,
        elapsed: Duration,
    },

    #[error("Algorithm exited non-zero (code {code}), please consider the log files in {}", results_path.display())]
    AlgorithmFailed { code: i64, results_path: PathBuf },

    #[error("Result file '{}' could not be read: {details}", path.display())]
    ResultRead { path: PathBuf, details: String },

    #[error("Scores and labels differ in length: {scores} vs {labels}")]
    ShapeMismatch { scores: usize, labels: usize },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FixSuggestion for DriftError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            DriftError::Configuration(_) => {
                Some("Register at least one algorithm and check the benchmark file")
            }
            DriftError::DatasetShape { .. } => {
                Some("Datasets need a timestamp column, feature column(s), and a trailing label column")
            }
            DriftError::Timeout { .. } => {
                Some("Raise the timeout for this algorithm or use a smaller dataset")
            }
            DriftError::AlgorithmFailed { .. } => {
                Some("Inspect the container logs in the results directory")
            }
            DriftError::ResultRead { .. } => {
                Some("The container must write one score per input row to the scores file")
            }
            DriftError::ShapeMismatch { .. } => {
                Some("The algorithm must emit exactly one score per input row")
            }
            DriftError::Execution(_) => {
                Some("Check that the container runtime is installed and running")
            }
            DriftError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            DriftError::Json(_) => {
                Some("Check the wire message against the algorithm interface contract")
            }
            DriftError::Io(_) => Some("Check file paths and permissions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_algorithm_and_elapsed() {
        let err = DriftError::Timeout {
            algorithm: "registry/subsequence-lof".to_string(),
            elapsed: Duration::from_secs(2),
        };
        let msg = err.to_string();
        assert!(msg.contains("registry/subsequence-lof"));
        assert!(msg.contains("2s"));
    }

    #[test]
    fn algorithm_failed_points_at_results_dir() {
        let err = DriftError::AlgorithmFailed {
            code: 137,
            results_path: PathBuf::from("/tmp/results/run-1"),
        };
        assert!(err.to_string().contains("/tmp/results/run-1"));
        assert!(err.to_string().contains("137"));
    }

    #[test]
    fn every_variant_has_a_suggestion() {
        let errors = [
            DriftError::Configuration("x".into()),
            DriftError::ShapeMismatch {
                scores: 1,
                labels: 2,
            },
            DriftError::Execution("x".into()),
        ];
        for err in errors {
            assert!(err.fix_suggestion().is_some());
        }
    }
}
