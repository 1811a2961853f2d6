//! Container adapter tests against the mock runtime

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use driftbench::adapter::{
    Adapter, AlgorithmInput, ContainerAdapter, RunConfig, SCORES_FILE_NAME,
};
use driftbench::runtime::{ContainerRuntime, MockRuntime};
use driftbench::{
    Algorithm, DataMode, DatasetRef, DirRegistry, DriftError, Engine, RunStatus, SeriesData,
};

fn fixture() -> (tempfile::TempDir, PathBuf, RunConfig) {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("series.csv");
    std::fs::write(&dataset, "0,1.0,0\n1,2.0,1\n").unwrap();
    let config = RunConfig::new(dir.path().join("results"));
    (dir, dataset, config)
}

fn adapter_with(runtime: Arc<MockRuntime>) -> ContainerAdapter {
    ContainerAdapter::new("registry.example.com/lof", runtime as Arc<dyn ContainerRuntime>)
}

#[tokio::test]
async fn clean_run_returns_the_scores_vector() {
    let (_dir, dataset, config) = fixture();
    let runtime = Arc::new(
        MockRuntime::new().with_scores_file(SCORES_FILE_NAME, &[0.1, 0.9, 0.4]),
    );

    let adapter = adapter_with(Arc::clone(&runtime));
    let scores = adapter
        .execute(&AlgorithmInput::File(dataset), &config)
        .await
        .unwrap();

    assert_eq!(scores, vec![0.1, 0.9, 0.4]);
}

#[tokio::test]
async fn run_follows_the_container_contract() {
    let (dir, dataset, config) = fixture();
    let runtime = Arc::new(
        MockRuntime::new().with_scores_file(SCORES_FILE_NAME, &[0.5]),
    );

    let adapter = adapter_with(Arc::clone(&runtime))
        .with_tag("0.3.1")
        .with_params(serde_json::Map::from_iter([(
            "window_size".to_string(),
            serde_json::json!(64),
        )]));
    adapter
        .execute(&AlgorithmInput::File(dataset), &config)
        .await
        .unwrap();

    let invocations = runtime.invocations();
    assert_eq!(invocations.len(), 1);
    let run = &invocations[0];
    assert_eq!(run.image, "registry.example.com/lof:0.3.1");

    // entrypoint plus one JSON argument
    assert_eq!(run.command.len(), 2);
    assert_eq!(run.command[0], "execute-algorithm");
    let message: serde_json::Value = serde_json::from_str(&run.command[1]).unwrap();
    assert_eq!(message["dataInput"], "/data/series.csv");
    assert_eq!(message["dataOutput"], "/results/docker-algorithm-scores.csv");
    assert_eq!(message["executionType"], "execute");
    assert_eq!(message["customParameters"]["window_size"], 64);

    // dataset directory read-only, results directory read-write
    assert_eq!(run.volumes.len(), 2);
    assert_eq!(run.volumes[0].source, dir.path());
    assert_eq!(run.volumes[0].target, "/data");
    assert!(run.volumes[0].read_only);
    assert_eq!(run.volumes[1].source, dir.path().join("results"));
    assert_eq!(run.volumes[1].target, "/results");
    assert!(!run.volumes[1].read_only);

    // host identity for result file ownership
    let keys: Vec<&str> = run.env.iter().map(|(k, _)| k.as_str()).collect();
    assert!(keys.contains(&"LOCAL_UID"));
    assert!(keys.contains(&"LOCAL_GID"));
}

#[tokio::test]
async fn slow_container_is_stopped_at_the_deadline() {
    let (_dir, dataset, config) = fixture();
    let runtime = Arc::new(MockRuntime::new().with_run_duration(Duration::from_secs(60)));

    let adapter = adapter_with(Arc::clone(&runtime)).with_timeout(Duration::from_millis(100));
    let started = Instant::now();
    let err = adapter
        .execute(&AlgorithmInput::File(dataset), &config)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(err, DriftError::Timeout { .. }));
    assert_eq!(runtime.stop_count(), 1);
}

#[tokio::test]
async fn run_config_deadline_overrides_the_adapter_deadline() {
    let (_dir, dataset, config) = fixture();
    let runtime = Arc::new(MockRuntime::new().with_run_duration(Duration::from_secs(60)));

    // adapter would wait an hour, the run config cuts it short
    let adapter = adapter_with(Arc::clone(&runtime)).with_timeout(Duration::from_secs(3600));
    let config = config.with_timeout(Duration::from_millis(100));
    let err = adapter
        .execute(&AlgorithmInput::File(dataset), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, DriftError::Timeout { .. }));
}

#[tokio::test]
async fn failing_container_points_at_its_results_dir() {
    let (_dir, dataset, config) = fixture();
    let runtime = Arc::new(MockRuntime::new().with_exit_code(137));

    let adapter = adapter_with(runtime);
    let err = adapter
        .execute(&AlgorithmInput::File(dataset), &config)
        .await
        .unwrap_err();

    match err {
        DriftError::AlgorithmFailed { code, results_path } => {
            assert_eq!(code, 137);
            assert_eq!(results_path, config.results_dir);
        }
        other => panic!("expected AlgorithmFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn clean_exit_without_scores_is_a_read_error() {
    let (_dir, dataset, config) = fixture();
    let runtime = Arc::new(MockRuntime::new());

    let adapter = adapter_with(runtime);
    let err = adapter
        .execute(&AlgorithmInput::File(dataset), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, DriftError::ResultRead { .. }));
}

#[tokio::test]
async fn in_memory_input_is_rejected() {
    let (_dir, _dataset, config) = fixture();
    let adapter = adapter_with(Arc::new(MockRuntime::new()));

    let input = AlgorithmInput::Memory(SeriesData::Univariate(vec![1.0]));
    let err = adapter.execute(&input, &config).await.unwrap_err();
    assert!(err.to_string().contains("dataset path"));
}

#[tokio::test]
async fn prepare_pulls_the_image_unless_skipped() {
    let runtime = Arc::new(MockRuntime::new());

    let adapter = adapter_with(Arc::clone(&runtime));
    adapter.prepare().await.unwrap();
    assert_eq!(runtime.pull_count(), 1);

    let skipping = adapter_with(Arc::clone(&runtime)).skip_pull();
    skipping.prepare().await.unwrap();
    assert_eq!(runtime.pull_count(), 1);
}

#[tokio::test]
async fn engine_run_with_containers_prunes_once() {
    let dir = tempfile::tempdir().unwrap();
    let collection = dir.path().join("gutentag");
    std::fs::create_dir_all(&collection).unwrap();
    for name in ["sinus", "ecg"] {
        std::fs::write(
            collection.join(format!("{}.csv", name)),
            "0,1.0,0\n1,1.1,0\n2,9.0,1\n3,8.5,1\n",
        )
        .unwrap();
        std::fs::write(collection.join(format!("{}.labels.csv", name)), "0\n0\n1\n1\n").unwrap();
    }

    let runtime = Arc::new(
        MockRuntime::new().with_scores_file(SCORES_FILE_NAME, &[0.1, 0.2, 0.9, 0.8]),
    );
    let adapter = ContainerAdapter::new(
        "registry.example.com/lof",
        Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
    )
    .skip_pull();

    let mut engine = Engine::new(Arc::new(DirRegistry::new(dir.path())))
        .with_algorithm(Algorithm::new("lof", Arc::new(adapter), DataMode::FilePath))
        .with_datasets([
            DatasetRef::new("gutentag", "sinus"),
            DatasetRef::new("gutentag", "ecg"),
        ])
        .with_config(RunConfig::new(dir.path().join("results")));
    let results = engine.run().await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results.count(RunStatus::Ok), 2);
    for record in results.records() {
        assert!((record.score.unwrap() - 1.0).abs() < 1e-9);
    }

    // one container per pair, one prune per engine run, no pulls
    assert_eq!(runtime.invocations().len(), 2);
    assert_eq!(runtime.prune_count(), 1);
    assert_eq!(runtime.pull_count(), 0);
}
