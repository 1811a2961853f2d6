//! Docker runtime using the `docker` CLI
//!
//! Launches containers detached via `docker run -d`, waits on them with
//! `docker wait` bounded by a deadline, and force-stops on timeout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{ContainerHandle, ContainerRuntime, VolumeMount, WaitOutcome};
use crate::error::DriftError;

/// Grace period `docker stop` gives a container before SIGKILL
const STOP_GRACE_SECS: u32 = 10;

/// Container runtime that shells out to the docker CLI
pub struct DockerRuntime {
    cli_path: String,
}

impl DockerRuntime {
    pub fn new() -> Self {
        Self {
            cli_path: "docker".to_string(),
        }
    }

    /// Set a custom CLI path
    pub fn with_cli_path(mut self, path: impl Into<String>) -> Self {
        self.cli_path = path.into();
        self
    }

    async fn docker(&self, args: &[String]) -> Result<String, DriftError> {
        let output = Command::new(&self.cli_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                DriftError::Execution(format!("failed to invoke '{} {}': {}", self.cli_path, args.join(" "), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DriftError::Execution(format!(
                "docker {} failed: {}",
                args.first().map(String::as_str).unwrap_or(""),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the argv for `docker run -d` (pure, for testability)
fn run_args(
    image: &str,
    command: &[String],
    volumes: &[VolumeMount],
    env: &[(String, String)],
) -> Vec<String> {
    let mut args = vec!["run".to_string(), "-d".to_string()];
    for mount in volumes {
        let mode = if mount.read_only { "ro" } else { "rw" };
        args.push("-v".to_string());
        args.push(format!("{}:{}:{}", mount.source.display(), mount.target, mode));
    }
    for (key, value) in env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push(image.to_string());
    args.extend(command.iter().cloned());
    args
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    fn name(&self) -> &str {
        "docker"
    }

    async fn run(
        &self,
        image: &str,
        command: &[String],
        volumes: &[VolumeMount],
        env: &[(String, String)],
    ) -> Result<Box<dyn ContainerHandle>, DriftError> {
        let args = run_args(image, command, volumes, env);
        let container_id = self.docker(&args).await?;
        debug!(image, container_id, "container started");
        Ok(Box::new(DockerHandle {
            cli_path: self.cli_path.clone(),
            container_id,
        }))
    }

    async fn pull(&self, image: &str, tag: &str) -> Result<(), DriftError> {
        debug!(image, tag, "pulling image");
        self.docker(&["pull".to_string(), format!("{}:{}", image, tag)])
            .await?;
        Ok(())
    }

    async fn prune_stopped(&self) -> Result<(), DriftError> {
        self.docker(&[
            "container".to_string(),
            "prune".to_string(),
            "-f".to_string(),
        ])
        .await?;
        Ok(())
    }

    fn is_available(&self) -> bool {
        std::process::Command::new(&self.cli_path)
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

struct DockerHandle {
    cli_path: String,
    container_id: String,
}

#[async_trait]
impl ContainerHandle for DockerHandle {
    fn id(&self) -> &str {
        &self.container_id
    }

    async fn wait(&mut self, deadline: Duration) -> Result<WaitOutcome, DriftError> {
        let wait = Command::new(&self.cli_path)
            .args(["wait", &self.container_id])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        match tokio::time::timeout(deadline, wait).await {
            Ok(Ok(output)) if output.status.success() => {
                let code = String::from_utf8_lossy(&output.stdout)
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| {
                        DriftError::Execution(format!("unparsable docker wait output: {}", e))
                    })?;
                Ok(WaitOutcome::Exited(code))
            }
            Ok(Ok(output)) => Err(DriftError::Execution(format!(
                "docker wait failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Ok(Err(e)) => Err(DriftError::Execution(format!(
                "failed to invoke docker wait: {}",
                e
            ))),
            Err(_) => Ok(WaitOutcome::TimedOut),
        }
    }

    async fn stop(&mut self) -> Result<(), DriftError> {
        debug!(container_id = %self.container_id, "stopping container");
        let output = Command::new(&self.cli_path)
            .args(["stop", "-t", &STOP_GRACE_SECS.to_string(), &self.container_id])
            .output()
            .await
            .map_err(|e| DriftError::Execution(format!("failed to invoke docker stop: {}", e)))?;
        if !output.status.success() {
            return Err(DriftError::Execution(format!(
                "docker stop failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
