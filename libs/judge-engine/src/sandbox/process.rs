/// Process Sandbox - Local Child Processes
///
/// Runs submissions with the interpreters and compilers installed on the
/// host. Each submission gets its own temp directory; each test case is a
/// fresh child process with a cleared environment.
///
/// **Limits:**
/// - Wall clock: the child is killed when the deadline passes
/// - Memory: resident size is sampled and the child is killed above the limit
/// - Output: stdout and stderr are read up to `MAX_OUTPUT_BYTES`, the rest is discarded
///
/// No OS-level isolation. Use `DockerSandbox` for untrusted traffic.

use super::{RunLimits, RunOutcome, RunOutput, Sandbox, MAX_OUTPUT_BYTES};
use crate::adapter::{self, LanguageAdapter, RESULT_MARKER_ENV};
use crate::error::PrepareError;
use anyhow::{anyhow, Context, Result};
use judge_common::types::Language;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Compilation is not bounded by the test-case budget
const COMPILE_TIMEOUT: Duration = Duration::from_secs(60);

const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Host variables the toolchains need to locate themselves
const TOOLCHAIN_ENV: &[&str] = &["JAVA_HOME", "GOROOT", "GOPATH", "GOCACHE"];

/// A submission written to disk and compiled. The directory is removed on drop.
pub struct ProcessWorkspace {
    dir: tempfile::TempDir,
    adapter: LanguageAdapter,
}

impl ProcessWorkspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessSandbox;

impl ProcessSandbox {
    pub fn new() -> Self {
        Self
    }

    fn command(&self, program: &str, args: &[&str], dir: &Path) -> Command {
        // Relative programs are resolved against the workspace, not our cwd
        let program: PathBuf = match program.strip_prefix("./") {
            Some(local) => dir.join(local),
            None => PathBuf::from(program),
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(dir)
            .env_clear()
            .env("PATH", std::env::var("PATH").unwrap_or_default())
            .env("HOME", dir)
            .env("LANG", "C.UTF-8")
            .kill_on_drop(true);

        for key in TOOLCHAIN_ENV {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }
        if std::env::var("GOCACHE").is_err() {
            cmd.env("GOCACHE", std::env::temp_dir().join("judge-go-cache"));
        }

        cmd
    }

    async fn check(&self, workspace: &ProcessWorkspace) -> Result<(), PrepareError> {
        let [program, args @ ..] = workspace.adapter.check_command() else {
            return Ok(());
        };

        let mut cmd = self.command(program, args, workspace.path());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| spawn_error(program, e))?;

        let output = match tokio::time::timeout(COMPILE_TIMEOUT, child.wait_with_output()).await {
            Ok(output) => output.context("Failed to wait for compiler")?,
            Err(_) => {
                return Err(PrepareError::Compilation(format!(
                    "Compilation timed out after {}s",
                    COMPILE_TIMEOUT.as_secs()
                )))
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let mut message = String::from_utf8_lossy(&output.stdout).into_owned();
        message.push_str(&String::from_utf8_lossy(&output.stderr));
        let workspace_prefix = format!("{}/", workspace.path().display());
        Err(PrepareError::Compilation(
            message.replace(&workspace_prefix, "").trim().to_string(),
        ))
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> PrepareError {
    if e.kind() == ErrorKind::NotFound {
        PrepareError::Infrastructure(anyhow!("Runtime '{}' is not installed", program))
    } else {
        PrepareError::Infrastructure(anyhow!(e).context(format!("Failed to start '{}'", program)))
    }
}

/// Read up to `limit` bytes, then drain so the child never blocks on a full pipe
async fn read_capped<R: AsyncRead + Unpin>(reader: Option<R>, limit: usize) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };

    let mut buf = Vec::new();
    if let Err(e) = (&mut reader).take(limit as u64).read_to_end(&mut buf).await {
        debug!(error = %e, "Output stream closed early");
    }
    let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;

    String::from_utf8_lossy(&buf).into_owned()
}

/// Sample resident memory until it exceeds `limit_bytes`; never returns otherwise
async fn watch_memory(pid: Option<u32>, limit_bytes: u64, peak: &AtomicU64) {
    let Some(pid) = pid else {
        return std::future::pending().await;
    };
    let pid = Pid::from_u32(pid);
    let mut system = System::new();

    loop {
        if system.refresh_process(pid) {
            if let Some(process) = system.process(pid) {
                let rss = process.memory();
                peak.fetch_max(rss, Ordering::Relaxed);
                if limit_bytes > 0 && rss > limit_bytes {
                    return;
                }
            }
        }
        tokio::time::sleep(MEMORY_SAMPLE_INTERVAL).await;
    }
}

impl Sandbox for ProcessSandbox {
    type Workspace = ProcessWorkspace;

    async fn prepare(
        &self,
        language: Language,
        code: &str,
        _memory_limit_bytes: u64,
    ) -> Result<ProcessWorkspace, PrepareError> {
        let adapter = LanguageAdapter::new(language);
        let dir = tempfile::Builder::new()
            .prefix("judge-")
            .tempdir()
            .context("Failed to create workspace directory")?;

        for file in adapter.source_files(code) {
            tokio::fs::write(dir.path().join(file.name), file.contents)
                .await
                .with_context(|| format!("Failed to write {}", file.name))?;
        }

        let workspace = ProcessWorkspace { dir, adapter };
        self.check(&workspace).await?;

        debug!(language = %language, path = %workspace.path().display(), "Workspace prepared");
        Ok(workspace)
    }

    async fn run(
        &self,
        workspace: &ProcessWorkspace,
        input: &Value,
        limits: RunLimits,
    ) -> Result<RunOutput> {
        let [program, args @ ..] = workspace.adapter.run_command() else {
            return Err(anyhow!("No run command for {}", workspace.adapter.language()));
        };

        let marker = adapter::new_marker();
        let payload = serde_json::to_vec(input).context("Failed to encode test input")?;

        let mut cmd = self.command(program, args, workspace.path());
        cmd.env(RESULT_MARKER_ENV, &marker)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to start '{}'", program))?;
        let start_time = Instant::now();

        let pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let peak = AtomicU64::new(0);

        let execution = async {
            let feed = async {
                if let Some(mut stdin) = stdin {
                    // The candidate may exit without reading its input
                    let _ = stdin.write_all(&payload).await;
                }
            };
            let (_, out, err, status) = tokio::join!(
                feed,
                read_capped(stdout, MAX_OUTPUT_BYTES),
                read_capped(stderr, MAX_OUTPUT_BYTES),
                child.wait()
            );
            (out, err, status)
        };

        let deadline = Duration::from_millis(limits.time_limit_ms);
        let finished = tokio::select! {
            result = tokio::time::timeout(deadline, execution) => result.ok(),
            _ = watch_memory(pid, limits.memory_limit_bytes, &peak) => {
                warn!(pid = ?pid, limit_bytes = limits.memory_limit_bytes, "Memory limit exceeded, killing process");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill process");
                }
                return Ok(RunOutput {
                    outcome: RunOutcome::MemoryExceeded,
                    console: String::new(),
                    execution_time_ms: start_time.elapsed().as_millis() as u64,
                    memory_used: Some(peak.load(Ordering::Relaxed)),
                });
            }
        };

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        let memory_used = Some(peak.load(Ordering::Relaxed)).filter(|bytes| *bytes > 0);

        let Some((stdout, stderr, status)) = finished else {
            debug!(timeout_ms = limits.time_limit_ms, "Execution timed out, killing process");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill timed-out process");
            }
            return Ok(RunOutput {
                outcome: RunOutcome::TimedOut,
                console: String::new(),
                execution_time_ms,
                memory_used,
            });
        };

        let status = status.context("Failed to wait for process")?;
        let (outcome, console) =
            adapter::interpret(&marker, &stdout, &stderr, status.code().map(i64::from));

        Ok(RunOutput {
            outcome,
            console,
            execution_time_ms,
            memory_used,
        })
    }
}
