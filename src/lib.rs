//! # driftbench
//!
//! A benchmarking engine for time-series anomaly detectors: it runs every
//! configured algorithm on every configured dataset, scores the results
//! against ground-truth labels, and accumulates one record per pair.
//!
//! ## Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`engine`] | grid orchestration, result accumulation |
//! | [`adapter`] | execution backends (in-process function, container) |
//! | [`runtime`] | container backend abstraction (docker CLI, mock) |
//! | [`remote`] | lazily started worker pool for distributed runs |
//! | [`dataset`] | dataset registry, table loading and splitting |
//! | [`metric`] | quality metrics (ROC/AUC) |
//! | [`config`] | YAML benchmark descriptions |
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use driftbench::{Algorithm, DataMode, DatasetRef, DirRegistry, Engine, FunctionAdapter};
//!
//! # async fn run() -> Result<(), driftbench::DriftError> {
//! let registry = Arc::new(DirRegistry::new("./datasets"));
//! let baseline = FunctionAdapter::new("zero", |input| {
//!     let len = match input {
//!         driftbench::AlgorithmInput::Memory(series) => series.len(),
//!         driftbench::AlgorithmInput::File(_) => 0,
//!     };
//!     Ok(vec![0.0; len])
//! });
//!
//! let mut engine = Engine::new(registry)
//!     .with_algorithm(Algorithm::new("zero", Arc::new(baseline), DataMode::InMemory))
//!     .with_dataset(DatasetRef::new("gutentag", "sinus"));
//! let results = engine.run().await?;
//! println!("{}", results.to_csv_string());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod metric;
pub mod remote;
pub mod runtime;
pub mod timing;

pub use adapter::{
    Adapter, AlgorithmInput, ContainerAdapter, DataMode, FunctionAdapter, RunConfig,
};
pub use config::{BenchConfig, CONFIG_SCHEMA};
pub use dataset::{DatasetRef, DatasetRegistry, DirRegistry, SeriesData, Table};
pub use engine::{Algorithm, Engine, ExecutionRecord, ResultTable, RunStatus};
pub use error::{DriftError, FixSuggestion};
pub use metric::{Metric, RocAuc};
pub use remote::{Remote, TaskHandle};
pub use runtime::{create_runtime, ContainerRuntime, DockerRuntime, MockRuntime};
pub use timing::Times;
