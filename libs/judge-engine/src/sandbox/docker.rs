/// Docker Sandbox - One Throwaway Container Per Submission
///
/// **Container Rules:**
/// 1. Pulls the language image if not present
/// 2. Creates one container per submission with security constraints:
///    - Network disabled
///    - Memory (no swap), CPU and PID limits enforced
///    - All capabilities dropped, no privilege escalation
/// 3. Streams candidate code, harness and test input through exec stdin,
///    so payload size is never bound by the kernel's argv limit
/// 4. Compiles once, then executes every test case against the artifact
/// 5. An in-container `timeout -s KILL` backs up the host deadline
/// 6. The container is force-removed when the workspace is dropped,
///    including on cancellation
///
/// Production backend: this is the isolation boundary the classifier is paired with.

use super::{RunLimits, RunOutcome, RunOutput, Sandbox, MAX_OUTPUT_BYTES};
use crate::adapter::{self, LanguageAdapter, RESULT_MARKER_ENV};
use crate::config::LanguageConfigManager;
use crate::error::PrepareError;
use anyhow::{bail, Context, Result};
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, RemoveContainerOptions, StartContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use judge_common::types::Language;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Safety limits to prevent pathological inputs from reaching Docker
const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
const MAX_TEST_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB

const WORKDIR: &str = "/workspace";
const PIDS_LIMIT: i64 = 128;
const COMPILE_TIMEOUT: Duration = Duration::from_secs(120);

/// SIGKILL exit status as reported by the shell
const KILLED_EXIT_CODE: i64 = 137;

/// Container cleanup guard - guarantees container removal on drop
/// This ensures containers are cleaned up even if execution panics or is cancelled
struct ContainerGuard {
    docker: Docker,
    container_id: String,
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        // Best-effort cleanup - cannot be async in Drop
        let container_id = self.container_id.clone();
        let docker = self.docker.clone();

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(container_id = %container_id, "No runtime available, container left behind");
            return;
        };

        handle.spawn(async move {
            let remove_options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };

            if let Err(e) = docker.remove_container(&container_id, Some(remove_options)).await {
                warn!(container_id = %container_id, error = %e, "Failed to cleanup container");
            }
        });
    }
}

/// A running container holding the compiled submission
pub struct DockerWorkspace {
    guard: ContainerGuard,
    adapter: LanguageAdapter,
}

impl DockerWorkspace {
    pub fn container_id(&self) -> &str {
        &self.guard.container_id
    }
}

/// Output of one `docker exec`
struct ExecOutput {
    stdout: String,
    stderr: String,
    exit_code: Option<i64>,
}

/// Docker-based sandbox for real isolated code execution
pub struct DockerSandbox {
    docker: Docker,
    languages: LanguageConfigManager,
}

impl DockerSandbox {
    /// Connect to the local Docker daemon
    pub fn new(languages: LanguageConfigManager) -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().context("Failed to connect to Docker daemon")?;
        Ok(Self { docker, languages })
    }

    /// Ensure Docker image is available (pull if needed)
    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.docker.inspect_image(image).await.is_ok() {
            debug!(image = %image, "Image cache hit");
            return Ok(());
        }

        warn!(image = %image, "Image cache miss, pulling now");

        let options = Some(CreateImageOptions {
            from_image: image,
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(result) = stream.next().await {
            result.context("Failed to pull Docker image")?;
        }

        info!(image = %image, "Image pulled successfully");
        Ok(())
    }

    async fn create_container(
        &self,
        language: Language,
        memory_limit_bytes: u64,
    ) -> Result<ContainerGuard> {
        let image = self.languages.get_image(&language)?;
        self.ensure_image(&image)
            .await
            .with_context(|| format!("Failed to ensure Docker image '{}' is available", image))?;

        // The request's budget wins over the per-language default
        let memory_limit = if memory_limit_bytes > 0 {
            memory_limit_bytes as i64
        } else {
            self.languages.get_memory_limit_mb(&language)? as i64 * 1024 * 1024
        };
        let cpu_limit = (self.languages.get_cpu_limit(&language)? * 1_000_000_000.0) as i64;

        let config = Config {
            image: Some(image.clone()),
            // Keep the container alive; every step runs through exec
            cmd: Some(vec!["sleep".to_string(), "3600".to_string()]),
            entrypoint: Some(vec![]),
            network_disabled: Some(true),
            working_dir: Some(WORKDIR.to_string()),
            host_config: Some(bollard::models::HostConfig {
                memory: Some(memory_limit),
                memory_swap: Some(memory_limit),
                nano_cpus: Some(cpu_limit),
                pids_limit: Some(PIDS_LIMIT),
                network_mode: Some("none".to_string()),
                cap_drop: Some(vec!["ALL".to_string()]),
                security_opt: Some(vec!["no-new-privileges".to_string()]),
                readonly_rootfs: Some(false), // compilers write next to the sources
                ..Default::default()
            }),
            ..Default::default()
        };

        let container_name = format!("judge-{}", uuid::Uuid::new_v4());
        let create_options = CreateContainerOptions {
            name: container_name.as_str(),
            platform: None,
        };

        let container = self
            .docker
            .create_container(Some(create_options), config)
            .await
            .context("Failed to create Docker container")?;

        // Set up the guard immediately so every later failure still cleans up
        let guard = ContainerGuard {
            docker: self.docker.clone(),
            container_id: container.id,
        };

        self.docker
            .start_container(&guard.container_id, None::<StartContainerOptions<String>>)
            .await
            .context("Failed to start Docker container")?;

        debug!(container_id = %guard.container_id, language = %language, "Container started");
        Ok(guard)
    }

    /// Run a shell command inside the container and collect its output.
    /// `stdin`, when given, is written to the command and then closed.
    async fn exec(
        &self,
        container_id: &str,
        script: String,
        env: Vec<String>,
        stdin: Option<&[u8]>,
    ) -> Result<ExecOutput> {
        let exec_config = CreateExecOptions {
            cmd: Some(vec!["sh".to_string(), "-c".to_string(), script]),
            env: Some(env),
            working_dir: Some(WORKDIR.to_string()),
            attach_stdin: Some(stdin.is_some()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(container_id, exec_config)
            .await
            .context("Failed to create exec")?;

        let start_config = StartExecOptions {
            detach: false,
            ..Default::default()
        };

        let mut stdout = String::new();
        let mut stderr = String::new();

        match self.docker.start_exec(&exec.id, Some(start_config)).await? {
            StartExecResults::Attached { mut output, mut input } => {
                // Output is drained while input is written so neither side can stall the other
                let feed = async {
                    if let Some(bytes) = stdin {
                        input.write_all(bytes).await?;
                        input.shutdown().await?;
                    }
                    Ok::<(), std::io::Error>(())
                };

                let drain = async {
                    while let Some(msg) = output.next().await {
                        match msg {
                            Ok(LogOutput::StdOut { message }) => {
                                if stdout.len() < MAX_OUTPUT_BYTES {
                                    stdout.push_str(&String::from_utf8_lossy(&message));
                                }
                            }
                            Ok(LogOutput::StdErr { message }) => {
                                if stderr.len() < MAX_OUTPUT_BYTES {
                                    stderr.push_str(&String::from_utf8_lossy(&message));
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                stderr.push_str(&format!("\n[Execution error: {}]", e));
                                break;
                            }
                        }
                    }
                };

                let (fed, ()) = tokio::join!(feed, drain);
                if let Err(e) = fed {
                    // The command may exit before reading everything it was given
                    debug!(error = %e, "Exec stdin closed early");
                }
            }
            StartExecResults::Detached => bail!("Failed to attach to exec"),
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: inspect.exit_code,
        })
    }

    async fn write_files(&self, container_id: &str, adapter: &LanguageAdapter, code: &str) -> Result<()> {
        for file in adapter.source_files(code) {
            let script = format!("cat > {}/{}", WORKDIR, file.name);

            let output = self
                .exec(container_id, script, Vec::new(), Some(file.contents.as_bytes()))
                .await?;
            if output.exit_code != Some(0) {
                bail!("Failed to write {}: {}", file.name, output.stderr.trim());
            }
        }
        Ok(())
    }
}

impl Sandbox for DockerSandbox {
    type Workspace = DockerWorkspace;

    #[tracing::instrument(skip(self, code), fields(language = %language))]
    async fn prepare(
        &self,
        language: Language,
        code: &str,
        memory_limit_bytes: u64,
    ) -> Result<DockerWorkspace, PrepareError> {
        if code.len() > MAX_SOURCE_CODE_BYTES {
            return Err(PrepareError::Compilation(format!(
                "Source code exceeds maximum size of {} bytes",
                MAX_SOURCE_CODE_BYTES
            )));
        }

        let adapter = LanguageAdapter::new(language);
        let guard = self.create_container(language, memory_limit_bytes).await?;

        self.write_files(&guard.container_id, &adapter, code).await?;

        let start_time = Instant::now();
        let script = format!("{} 2>&1", adapter.check_command().join(" "));
        let output = tokio::time::timeout(
            COMPILE_TIMEOUT,
            self.exec(&guard.container_id, script, Vec::new(), None),
        )
        .await
        .map_err(|_| PrepareError::Compilation("Compilation timed out".to_string()))??;

        let compilation_time_ms = start_time.elapsed().as_millis() as u64;
        if output.exit_code != Some(0) {
            warn!(
                compilation_time_ms = compilation_time_ms,
                error_preview = output.stdout.lines().next().unwrap_or(""),
                "Compilation failed"
            );
            let message = output.stdout.replace(&format!("{}/", WORKDIR), "");
            return Err(PrepareError::Compilation(message.trim().to_string()));
        }

        info!(compilation_time_ms = compilation_time_ms, "Compilation succeeded");
        Ok(DockerWorkspace { guard, adapter })
    }

    #[tracing::instrument(skip(self, workspace, input), fields(timeout_ms = limits.time_limit_ms))]
    async fn run(
        &self,
        workspace: &DockerWorkspace,
        input: &Value,
        limits: RunLimits,
    ) -> Result<RunOutput> {
        let payload = serde_json::to_string(input).context("Failed to encode test input")?;
        if payload.len() > MAX_TEST_INPUT_BYTES {
            bail!("Test input exceeds maximum size of {} bytes", MAX_TEST_INPUT_BYTES);
        }

        let marker = adapter::new_marker();

        // Whole seconds, rounded up, plus one so the host deadline fires first
        let kill_after_secs = limits.time_limit_ms.div_ceil(1000) + 1;
        let script = format!(
            "timeout -s KILL {} {}",
            kill_after_secs,
            workspace.adapter.run_command().join(" ")
        );
        let env = vec![format!("{}={}", RESULT_MARKER_ENV, marker)];

        let start_time = Instant::now();
        let deadline = Duration::from_millis(limits.time_limit_ms);
        let result = tokio::time::timeout(
            deadline,
            self.exec(workspace.container_id(), script, env, Some(payload.as_bytes())),
        )
        .await;
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        let output = match result {
            Ok(output) => output?,
            Err(_) => {
                warn!(execution_time_ms = execution_time_ms, "Test execution timed out");
                return Ok(RunOutput {
                    outcome: RunOutcome::TimedOut,
                    console: String::new(),
                    execution_time_ms,
                    memory_used: None,
                });
            }
        };

        let (mut outcome, console) =
            adapter::interpret(&marker, &output.stdout, &output.stderr, output.exit_code);

        // Killed before reporting, inside the deadline: the cgroup OOM killer
        if output.exit_code == Some(KILLED_EXIT_CODE) && matches!(outcome, RunOutcome::Raised(_)) {
            outcome = RunOutcome::MemoryExceeded;
        }

        debug!(execution_time_ms = execution_time_ms, outcome = ?outcome, "Test execution completed");

        Ok(RunOutput {
            outcome,
            console,
            execution_time_ms,
            memory_used: None,
        })
    }
}
