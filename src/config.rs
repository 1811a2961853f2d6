//! Benchmark configuration files
//!
//! A benchmark is described declaratively in YAML: which datasets, which
//! algorithm images, and how to run them. The `schema` field pins the file
//! format so stale configs fail loudly instead of half-parsing.
//!
//! ```yaml
//! schema: driftbench/benchmark@0.1
//! data_dir: ./datasets
//! results_dir: ./results
//! datasets:
//!   - collection: gutentag
//!     name: sinus
//! algorithms:
//!   - name: lof
//!     image: registry.example.com/lof
//!     tag: "0.3.1"
//!     timeout: 30m
//!     hyper_params:
//!       n_neighbors: 20
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetRef;
use crate::error::DriftError;

/// Expected value of the `schema` field
pub const CONFIG_SCHEMA: &str = "driftbench/benchmark@0.1";

const DEFAULT_RESULTS_DIR: &str = "./results";
const DEFAULT_TAG: &str = "latest";
const DEFAULT_WORKERS: usize = 4;

/// Top-level benchmark description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    pub schema: String,
    /// Root of the dataset registry
    pub data_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default)]
    pub distributed: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub datasets: Vec<DatasetEntry>,
    pub algorithms: Vec<AlgorithmEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub collection: String,
    pub name: String,
}

impl DatasetEntry {
    pub fn to_ref(&self) -> DatasetRef {
        DatasetRef::new(&self.collection, &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmEntry {
    pub name: String,
    pub image: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub skip_pull: bool,
    /// Container deadline, e.g. "500ms", "90s", "30m", "8h"
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub hyper_params: serde_json::Map<String, serde_json::Value>,
}

impl AlgorithmEntry {
    pub fn timeout(&self) -> Result<Option<Duration>, DriftError> {
        self.timeout.as_deref().map(parse_duration).transpose()
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_DIR)
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl BenchConfig {
    pub fn from_str(yaml: &str) -> Result<Self, DriftError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        if config.schema != CONFIG_SCHEMA {
            return Err(DriftError::Configuration(format!(
                "unsupported schema '{}', expected '{}'",
                config.schema, CONFIG_SCHEMA
            )));
        }
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, DriftError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }
}

/// Parse a duration with a `ms`, `s`, `m` or `h` suffix
pub fn parse_duration(text: &str) -> Result<Duration, DriftError> {
    let text = text.trim();
    let (number, scale) = if let Some(n) = text.strip_suffix("ms") {
        (n, Duration::from_millis(1))
    } else if let Some(n) = text.strip_suffix('s') {
        (n, Duration::from_secs(1))
    } else if let Some(n) = text.strip_suffix('m') {
        (n, Duration::from_secs(60))
    } else if let Some(n) = text.strip_suffix('h') {
        (n, Duration::from_secs(3600))
    } else {
        return Err(DriftError::Configuration(format!(
            "invalid duration '{}': expected a number with ms/s/m/h suffix",
            text
        )));
    };

    let value: u64 = number.trim().parse().map_err(|_| {
        DriftError::Configuration(format!("invalid duration '{}': not a whole number", text))
    })?;
    Ok(scale * u32::try_from(value).map_err(|_| {
        DriftError::Configuration(format!("invalid duration '{}': value too large", text))
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
schema: driftbench/benchmark@0.1
data_dir: ./datasets
datasets:
  - collection: gutentag
    name: sinus
  - collection: gutentag
    name: ecg
algorithms:
  - name: lof
    image: registry.example.com/lof
    tag: "0.3.1"
    timeout: 30m
    hyper_params:
      n_neighbors: 20
  - name: stomp
    image: registry.example.com/stomp
    skip_pull: true
"#;

    #[test]
    fn parses_sample_config() {
        let config = BenchConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./datasets"));
        assert_eq!(config.results_dir, PathBuf::from("./results"));
        assert!(!config.distributed);
        assert_eq!(config.workers, 4);
        assert_eq!(config.datasets.len(), 2);
        assert_eq!(
            config.datasets[0].to_ref(),
            DatasetRef::new("gutentag", "sinus")
        );

        let lof = &config.algorithms[0];
        assert_eq!(lof.tag, "0.3.1");
        assert_eq!(lof.timeout().unwrap(), Some(Duration::from_secs(30 * 60)));
        assert_eq!(lof.hyper_params["n_neighbors"], 20);

        let stomp = &config.algorithms[1];
        assert_eq!(stomp.tag, "latest");
        assert!(stomp.skip_pull);
        assert_eq!(stomp.timeout().unwrap(), None);
    }

    #[test]
    fn rejects_unknown_schema() {
        let yaml = SAMPLE.replace("driftbench/benchmark@0.1", "driftbench/benchmark@9.9");
        let err = BenchConfig::from_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("unsupported schema"));
    }

    #[test]
    fn rejects_invalid_yaml() {
        assert!(BenchConfig::from_str("schema: [").is_err());
    }

    #[test]
    fn duration_suffixes() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("8h").unwrap(), Duration::from_secs(8 * 3600));
    }

    #[test]
    fn duration_rejects_garbage() {
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("12").is_err());
        assert!(parse_duration("1.5h").is_err());
    }
}
