//! # Execution Engine
//!
//! Orchestrates the evaluation of every configured algorithm on every
//! configured dataset and collects exactly one [`ExecutionRecord`] per pair.
//!
//! ## Guarantees
//!
//! - The result table is algorithm-major: all datasets of the first
//!   algorithm, then all datasets of the second, matching configuration
//!   order.
//! - A failing pair never aborts the run. Its record carries the failure,
//!   and every remaining pair still executes. Only infrastructure failures
//!   (worker pool provisioning) abort the whole run.
//! - In distributed mode, submission does not block. All pending outcomes
//!   are gathered once after the full grid has been submitted, then the
//!   pool is closed.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::adapter::{Adapter, AlgorithmInput, DataMode, RunConfig};
use crate::dataset::{self, DatasetRef, DatasetRegistry};
use crate::error::DriftError;
use crate::metric::{Metric, RocAuc};
use crate::remote::Remote;
use crate::timing::{timed, timed_sync, Times};

// ============================================================================
// RECORDS AND RESULT TABLE
// ============================================================================

/// Terminal state of one (algorithm, dataset) evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Error,
    Timeout,
    /// Submitted but not yet gathered; never present in a finished table
    Pending,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Ok => "ok",
            RunStatus::Error => "error",
            RunStatus::Timeout => "timeout",
            RunStatus::Pending => "pending",
        };
        f.write_str(s)
    }
}

fn classify(err: &DriftError) -> RunStatus {
    match err {
        DriftError::Timeout { .. } => RunStatus::Timeout,
        _ => RunStatus::Error,
    }
}

/// Successful evaluation outcome before it becomes a record
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Quality score; `None` when no ground-truth labels were available
    pub score: Option<f64>,
    pub times: Times,
}

/// One row of the result table
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    pub algorithm: String,
    pub dataset: String,
    pub status: RunStatus,
    pub score: Option<f64>,
    pub times: Times,
    pub error: Option<String>,
}

impl ExecutionRecord {
    fn pending(algorithm: &str, dataset: &DatasetRef) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            dataset: dataset.to_string(),
            status: RunStatus::Pending,
            score: None,
            times: Times::default(),
            error: None,
        }
    }

    fn from_outcome(
        algorithm: &str,
        dataset: &DatasetRef,
        outcome: Result<Evaluation, DriftError>,
    ) -> Self {
        let mut record = Self::pending(algorithm, dataset);
        record.apply(outcome);
        record
    }

    fn apply(&mut self, outcome: Result<Evaluation, DriftError>) {
        match outcome {
            Ok(evaluation) => {
                self.status = RunStatus::Ok;
                self.score = evaluation.score;
                self.times = evaluation.times;
                self.error = None;
            }
            Err(e) => {
                self.status = classify(&e);
                self.score = None;
                self.error = Some(e.to_string());
            }
        }
    }
}

/// Accumulated evaluation results, one record per (algorithm, dataset) pair
#[derive(Debug, Default)]
pub struct ResultTable {
    records: Vec<ExecutionRecord>,
}

impl ResultTable {
    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, status: RunStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    fn push(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    fn resolve(&mut self, index: usize, outcome: Result<Evaluation, DriftError>) {
        self.records[index].apply(outcome);
    }

    /// Render the table as CSV, one line per record
    pub fn to_csv_string(&self) -> String {
        let mut out =
            String::from("algorithm,dataset,status,score,pre_time,main_time,post_time,error\n");
        for record in &self.records {
            let [pre, main, post] = record.times.to_secs();
            let fields = [
                csv_field(&record.algorithm),
                csv_field(&record.dataset),
                record.status.to_string(),
                opt_f64(record.score),
                opt_f64(pre),
                opt_f64(main),
                opt_f64(post),
                csv_field(record.error.as_deref().unwrap_or("")),
            ];
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }
}

fn opt_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ============================================================================
// ALGORITHM
// ============================================================================

/// An algorithm under evaluation: an adapter plus how it wants its data
pub struct Algorithm {
    pub name: String,
    pub adapter: Arc<dyn Adapter>,
    pub data_mode: DataMode,
}

impl Algorithm {
    pub fn new(name: impl Into<String>, adapter: Arc<dyn Adapter>, data_mode: DataMode) -> Self {
        Self {
            name: name.into(),
            adapter,
            data_mode,
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Runs the full algorithm x dataset grid
pub struct Engine {
    algorithms: Vec<Algorithm>,
    datasets: Vec<DatasetRef>,
    registry: Arc<dyn DatasetRegistry>,
    metric: Arc<dyn Metric>,
    config: RunConfig,
    remote: Option<Remote>,
    results: ResultTable,
}

impl Engine {
    pub fn new(registry: Arc<dyn DatasetRegistry>) -> Self {
        Self {
            algorithms: Vec::new(),
            datasets: Vec::new(),
            registry,
            metric: Arc::new(RocAuc),
            config: RunConfig::default(),
            remote: None,
            results: ResultTable::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithms.push(algorithm);
        self
    }

    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms.extend(algorithms);
        self
    }

    pub fn with_dataset(mut self, dataset: DatasetRef) -> Self {
        self.datasets.push(dataset);
        self
    }

    pub fn with_datasets(mut self, datasets: impl IntoIterator<Item = DatasetRef>) -> Self {
        self.datasets.extend(datasets);
        self
    }

    pub fn with_metric(mut self, metric: Arc<dyn Metric>) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Run evaluations on a worker pool instead of sequentially
    pub fn distributed(mut self, workers: usize) -> Self {
        self.remote = Some(Remote::new(workers));
        self
    }

    pub fn results(&self) -> &ResultTable {
        &self.results
    }

    /// Evaluate the full grid. Per-pair failures land in the result table;
    /// only an empty grid or a pool provisioning failure is fatal.
    pub async fn run(&mut self) -> Result<&ResultTable, DriftError> {
        if self.algorithms.is_empty() {
            return Err(DriftError::Configuration(
                "no algorithms configured".to_string(),
            ));
        }
        if self.datasets.is_empty() {
            return Err(DriftError::Configuration(
                "no datasets configured".to_string(),
            ));
        }
        info!(
            algorithms = self.algorithms.len(),
            datasets = self.datasets.len(),
            distributed = self.remote.is_some(),
            "starting evaluation run"
        );

        for algorithm in &self.algorithms {
            if let Err(e) = algorithm.adapter.prepare().await {
                warn!(algorithm = %algorithm.name, error = %e, "prepare hook failed");
            }
        }

        let mut pending = Vec::new();
        for algorithm in &self.algorithms {
            for dataset in &self.datasets {
                let (input, labels) =
                    match resolve_input(self.registry.as_ref(), algorithm.data_mode, dataset) {
                        Ok(resolved) => resolved,
                        Err(e) => {
                            error!(algorithm = %algorithm.name, dataset = %dataset, error = %e,
                                "could not resolve dataset");
                            self.results.push(ExecutionRecord::from_outcome(
                                &algorithm.name,
                                dataset,
                                Err(e),
                            ));
                            continue;
                        }
                    };

                // Each pair gets its own results directory so concurrent
                // runs never clobber each other's artifacts
                let mut run_config = self.config.clone();
                run_config.results_dir = run_config
                    .results_dir
                    .join(&algorithm.name)
                    .join(&dataset.collection)
                    .join(&dataset.name);

                if let Some(remote) = &mut self.remote {
                    let future = evaluate(
                        Arc::clone(&algorithm.adapter),
                        input,
                        labels,
                        Arc::clone(&self.metric),
                        run_config,
                    );
                    let handle = remote.submit(future)?;
                    pending.push((self.results.len(), handle));
                    self.results
                        .push(ExecutionRecord::pending(&algorithm.name, dataset));
                } else {
                    let outcome = evaluate(
                        Arc::clone(&algorithm.adapter),
                        input,
                        labels,
                        Arc::clone(&self.metric),
                        run_config,
                    )
                    .await;
                    if let Err(e) = &outcome {
                        error!(algorithm = %algorithm.name, dataset = %dataset, error = %e,
                            "evaluation failed");
                    }
                    self.results
                        .push(ExecutionRecord::from_outcome(&algorithm.name, dataset, outcome));
                }
            }
        }

        if !pending.is_empty() {
            let (indices, handles): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
            let outcomes = Remote::gather_all(handles).await;
            for (index, joined) in indices.into_iter().zip(outcomes) {
                let outcome = joined.and_then(|inner| inner);
                if let Err(e) = &outcome {
                    let record = &self.results.records()[index];
                    error!(algorithm = %record.algorithm, dataset = %record.dataset, error = %e,
                        "evaluation failed");
                }
                self.results.resolve(index, outcome);
            }
        }
        if let Some(remote) = &mut self.remote {
            remote.close();
        }

        for algorithm in &self.algorithms {
            if let Err(e) = algorithm.adapter.finalize().await {
                warn!(algorithm = %algorithm.name, error = %e, "finalize hook failed");
            }
        }

        info!(
            total = self.results.len(),
            ok = self.results.count(RunStatus::Ok),
            failed = self.results.count(RunStatus::Error),
            timed_out = self.results.count(RunStatus::Timeout),
            "evaluation run finished"
        );
        Ok(&self.results)
    }
}

/// Resolve a dataset into adapter input plus optional ground-truth labels
fn resolve_input(
    registry: &dyn DatasetRegistry,
    data_mode: DataMode,
    dataset: &DatasetRef,
) -> Result<(AlgorithmInput, Option<Vec<f64>>), DriftError> {
    match data_mode {
        DataMode::FilePath => {
            let (data_path, label_path) = registry.paths(dataset)?;
            let labels = label_path.map(|p| dataset::read_vector(&p)).transpose()?;
            Ok((AlgorithmInput::File(data_path), labels))
        }
        DataMode::InMemory => {
            let table = registry.load(dataset)?;
            let (series, labels) = dataset::split_series(&table, dataset)?;
            Ok((AlgorithmInput::Memory(series), Some(labels)))
        }
    }
}

/// Execute one (algorithm, dataset) pair: timed adapter run, then timed
/// metric evaluation when labels exist. Owns its inputs so it can be shipped
/// to a worker.
async fn evaluate(
    adapter: Arc<dyn Adapter>,
    input: AlgorithmInput,
    labels: Option<Vec<f64>>,
    metric: Arc<dyn Metric>,
    config: RunConfig,
) -> Result<Evaluation, DriftError> {
    let (scores, main) = timed(adapter.execute(&input, &config)).await;
    let scores = scores?;
    let mut times = Times::main_only(main);

    let score = match labels {
        Some(labels) => {
            let (result, post) = timed_sync(|| metric.evaluate(&scores, &labels));
            times = times.with_post(post);
            Some(result?)
        }
        None => None,
    };

    Ok(Evaluation { score, times })
}
