//! driftbench CLI - anomaly detection benchmark runner

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use driftbench::{
    create_runtime, Algorithm, BenchConfig, ContainerAdapter, DataMode, DirRegistry, DriftError,
    Engine, FixSuggestion, RunConfig, RunStatus,
};

#[derive(Parser)]
#[command(name = "driftbench")]
#[command(about = "driftbench - benchmark time-series anomaly detectors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark file
    Run {
        /// Path to benchmark .yaml file
        file: String,

        /// Container runtime backend (docker, mock)
        #[arg(short, long, default_value = "docker")]
        runtime: String,

        /// Override the configured worker count for distributed runs
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Validate a benchmark file (parse only)
    Validate {
        /// Path to benchmark .yaml file
        file: String,
    },

    /// List datasets available under a registry root
    Datasets {
        /// Registry root directory
        data_dir: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            file,
            runtime,
            workers,
        } => run_benchmark(&file, &runtime, workers).await,
        Commands::Validate { file } => validate_benchmark(&file),
        Commands::Datasets { data_dir } => list_datasets(&data_dir),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn run_benchmark(
    file: &str,
    runtime_name: &str,
    workers_override: Option<usize>,
) -> Result<(), DriftError> {
    let config = BenchConfig::from_path(Path::new(file))?;

    let runtime = create_runtime(runtime_name)?;
    if !runtime.is_available() {
        return Err(DriftError::Configuration(format!(
            "container runtime '{}' is not available",
            runtime_name
        )));
    }

    println!(
        "{} Running {} algorithm(s) on {} dataset(s) | runtime: {}",
        "→".cyan(),
        config.algorithms.len().to_string().cyan().bold(),
        config.datasets.len().to_string().cyan().bold(),
        runtime_name.cyan()
    );

    let registry = Arc::new(DirRegistry::new(&config.data_dir));
    let mut engine =
        Engine::new(registry).with_config(RunConfig::new(&config.results_dir));

    for entry in &config.datasets {
        engine = engine.with_dataset(entry.to_ref());
    }
    for entry in &config.algorithms {
        let mut adapter = ContainerAdapter::new(&entry.image, Arc::clone(&runtime))
            .with_tag(&entry.tag)
            .with_params(entry.hyper_params.clone());
        if let Some(timeout) = entry.timeout()? {
            adapter = adapter.with_timeout(timeout);
        }
        if entry.skip_pull {
            adapter = adapter.skip_pull();
        }
        engine = engine.with_algorithm(Algorithm::new(
            &entry.name,
            Arc::new(adapter),
            DataMode::FilePath,
        ));
    }

    if config.distributed {
        let workers = workers_override.unwrap_or(config.workers);
        println!("{} Distributed mode with {} worker(s)", "→".cyan(), workers);
        engine = engine.distributed(workers);
    }

    let results = engine.run().await?;

    for record in results.records() {
        let status = match record.status {
            RunStatus::Ok => "ok".green(),
            RunStatus::Timeout => "timeout".yellow(),
            _ => record.status.to_string().red(),
        };
        let score = record
            .score
            .map(|s| format!("{:.4}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} on {} | score: {}",
            status,
            record.algorithm.bold(),
            record.dataset,
            score
        );
        if let Some(error) = &record.error {
            println!("    {}", error.dimmed());
        }
    }

    std::fs::create_dir_all(&config.results_dir)?;
    let csv_path = config.results_dir.join("results.csv");
    std::fs::write(&csv_path, results.to_csv_string())?;
    println!(
        "{} {} evaluation(s) done, results written to {}",
        "✓".green(),
        results.len(),
        csv_path.display()
    );

    Ok(())
}

fn validate_benchmark(file: &str) -> Result<(), DriftError> {
    let config = BenchConfig::from_path(Path::new(file))?;

    // Surface bad timeout strings at validation time, not mid-run
    for entry in &config.algorithms {
        entry.timeout()?;
    }

    println!("{} Benchmark '{}' is valid", "✓".green(), file);
    println!("  Data dir: {}", config.data_dir.display());
    println!("  Results dir: {}", config.results_dir.display());
    println!("  Datasets: {}", config.datasets.len());
    println!("  Algorithms: {}", config.algorithms.len());
    if config.distributed {
        println!("  Workers: {}", config.workers);
    }

    Ok(())
}

fn list_datasets(data_dir: &str) -> Result<(), DriftError> {
    let registry = DirRegistry::new(data_dir);
    let datasets = registry.list();

    if datasets.is_empty() {
        println!("{} No datasets found under {}", "!".yellow(), data_dir);
        return Ok(());
    }

    println!("{} {} dataset(s) under {}:", "→".cyan(), datasets.len(), data_dir);
    for dataset in datasets {
        println!("  {}", dataset);
    }
    Ok(())
}
