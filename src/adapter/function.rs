//! In-process adapter for native algorithm functions
//!
//! Calls a user-supplied pure function directly in the caller's scheduling
//! context. Errors propagate to the engine, which isolates them per pair.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Adapter, AlgorithmInput, RunConfig};
use crate::error::DriftError;

/// Signature of an in-process algorithm
pub type AlgorithmFn = dyn Fn(&AlgorithmInput) -> Result<Vec<f64>, DriftError> + Send + Sync;

/// Adapter wrapping a native function
#[derive(Clone)]
pub struct FunctionAdapter {
    name: String,
    function: Arc<AlgorithmFn>,
}

impl FunctionAdapter {
    pub fn new(
        name: impl Into<String>,
        function: impl Fn(&AlgorithmInput) -> Result<Vec<f64>, DriftError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            function: Arc::new(function),
        }
    }
}

#[async_trait]
impl Adapter for FunctionAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        input: &AlgorithmInput,
        _config: &RunConfig,
    ) -> Result<Vec<f64>, DriftError> {
        (self.function)(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SeriesData;

    fn constant_scores(value: f64) -> FunctionAdapter {
        FunctionAdapter::new("constant", move |input| {
            let len = match input {
                AlgorithmInput::Memory(series) => series.len(),
                AlgorithmInput::File(_) => 0,
            };
            Ok(vec![value; len])
        })
    }

    #[tokio::test]
    async fn calls_function_with_input() {
        let adapter = constant_scores(0.5);
        let input = AlgorithmInput::Memory(SeriesData::Univariate(vec![1.0, 2.0, 3.0]));

        let scores = adapter.execute(&input, &RunConfig::default()).await.unwrap();
        assert_eq!(scores, vec![0.5, 0.5, 0.5]);
    }

    #[tokio::test]
    async fn function_errors_propagate() {
        let adapter = FunctionAdapter::new("broken", |_| {
            Err(DriftError::Execution("model diverged".to_string()))
        });
        let input = AlgorithmInput::Memory(SeriesData::Univariate(vec![1.0]));

        let err = adapter.execute(&input, &RunConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("model diverged"));
    }

    #[tokio::test]
    async fn hooks_default_to_noop() {
        let adapter = constant_scores(1.0);
        adapter.prepare().await.unwrap();
        adapter.finalize().await.unwrap();
    }
}
