use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ComposeConfig;

const COMPOSE_FILES: [&str; 2] = ["docker-compose.yaml", "docker-compose.yml"];

/// Where a backend's external process is defined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerSpec {
    /// Directory expected to hold a compose file
    Compose { dir: PathBuf },
    /// Process managed outside vbench; start and stop are no-ops
    External,
}

impl ContainerSpec {
    /// Resolve the concrete descriptor, or `None` if there is nothing to start
    pub fn locate(&self) -> Option<ContainerDescriptor> {
        match self {
            ContainerSpec::External => Some(ContainerDescriptor::External),
            ContainerSpec::Compose { dir } => COMPOSE_FILES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file())
                .map(|file| ContainerDescriptor::Compose {
                    dir: dir.clone(),
                    file,
                }),
        }
    }
}

/// A located, startable process definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerDescriptor {
    Compose { dir: PathBuf, file: PathBuf },
    External,
}

/// Starts and stops a backend's external process.
///
/// Neither operation returns an error: a failed start is a skip condition
/// for the backend, and a failed stop is only worth a warning.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    async fn start(&self, backend: &str, descriptor: &ContainerDescriptor) -> bool;

    async fn stop(&self, backend: &str, descriptor: &ContainerDescriptor);
}

/// Lifecycle backed by `docker compose up -d` / `docker compose down`
pub struct ComposeLifecycle {
    program: String,
    args: Vec<String>,
}

impl ComposeLifecycle {
    pub fn new(config: &ComposeConfig) -> Self {
        let mut command = config.command.iter().cloned();
        let program = command.next().unwrap_or_else(|| "docker".to_string());
        let args = if config.command.is_empty() {
            vec!["compose".to_string()]
        } else {
            command.collect()
        };
        Self { program, args }
    }

    /// Run a compose action from inside `dir`.
    ///
    /// `-f` is resolved against the working directory, so only the file name
    /// is passed; `file` itself may be relative to the caller's directory.
    async fn compose(&self, dir: &Path, file: &Path, action: &[&str]) -> std::io::Result<bool> {
        let file = file.file_name().map(Path::new).unwrap_or(file);
        debug!(program = %self.program, dir = %dir.display(), ?action, "Running compose");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("-f")
            .arg(file)
            .args(action)
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr.trim(), "Compose command failed");
        }
        Ok(output.status.success())
    }
}

impl Default for ComposeLifecycle {
    fn default() -> Self {
        Self::new(&ComposeConfig::default())
    }
}

#[async_trait]
impl Lifecycle for ComposeLifecycle {
    async fn start(&self, backend: &str, descriptor: &ContainerDescriptor) -> bool {
        let ContainerDescriptor::Compose { dir, file } = descriptor else {
            debug!(backend, "Externally managed, nothing to start");
            return true;
        };

        info!(backend, file = %file.display(), "Starting containers");
        match self.compose(dir, file, &["up", "-d"]).await {
            Ok(started) => started,
            Err(e) => {
                warn!(backend, error = %e, "Could not run compose");
                false
            }
        }
    }

    async fn stop(&self, backend: &str, descriptor: &ContainerDescriptor) {
        let ContainerDescriptor::Compose { dir, file } = descriptor else {
            return;
        };

        info!(backend, "Stopping containers");
        match self.compose(dir, file, &["down"]).await {
            Ok(true) => {}
            Ok(false) => warn!(backend, "Containers did not stop cleanly"),
            Err(e) => warn!(backend, error = %e, "Could not run compose"),
        }
    }
}

/// A started backend process that must be stopped exactly once.
///
/// `release` consumes the lease, so the stop command cannot be issued twice.
pub struct ContainerLease<'a> {
    lifecycle: &'a dyn Lifecycle,
    backend: String,
    descriptor: ContainerDescriptor,
    released: bool,
}

impl<'a> ContainerLease<'a> {
    /// Issue the start command and hand back a lease regardless of outcome,
    /// since a half-started compose project still needs bringing down.
    pub async fn acquire(
        lifecycle: &'a dyn Lifecycle,
        backend: &str,
        descriptor: ContainerDescriptor,
    ) -> (Self, bool) {
        let started = lifecycle.start(backend, &descriptor).await;
        let lease = Self {
            lifecycle,
            backend: backend.to_string(),
            descriptor,
            released: false,
        };
        (lease, started)
    }

    pub async fn release(mut self) {
        self.lifecycle.stop(&self.backend, &self.descriptor).await;
        self.released = true;
    }
}

impl Drop for ContainerLease<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!(backend = %self.backend, "Container lease dropped without stopping");
        }
    }
}
