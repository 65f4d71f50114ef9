/// Sandbox - Where Candidate Code Actually Runs
///
/// **Core Responsibility:**
/// Materialise a submission once (`prepare`), then run it once per test case
/// (`run`) under a time and memory budget.
///
/// **Critical Properties:**
/// - Every `run` is a fresh process: no globals or module cache survive between calls
/// - `run` never blocks past its time limit; overruns become `RunOutcome::TimedOut`
/// - Errors raised by candidate code are `RunOutcome::Raised`, never `Err`
/// - `Err` from `run` is reserved for infrastructure failures (runtime missing, daemon gone)
/// - Dropping a `run` future kills whatever it started
///
/// The sandbox knows how to execute. It does not compare outputs or score.

pub mod docker;
pub mod process;

pub use docker::DockerSandbox;
pub use process::ProcessSandbox;

use crate::error::PrepareError;
use judge_common::types::Language;
use serde_json::Value;
use std::future::Future;

pub const TIME_LIMIT_EXCEEDED: &str = "Time limit exceeded";
pub const MEMORY_LIMIT_EXCEEDED: &str = "Memory limit exceeded";

/// Upper bound on stdout/stderr bytes read from a single run
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Per-run budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub time_limit_ms: u64,
    pub memory_limit_bytes: u64,
}

/// How a single invocation ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The entry point returned. `None` means it returned nothing at all.
    Returned(Option<Value>),
    /// Candidate code raised or crashed
    Raised(String),
    TimedOut,
    MemoryExceeded,
}

impl RunOutcome {
    /// Message for `TestCaseResult.error`, if the run did not return
    pub fn error_message(&self) -> Option<String> {
        match self {
            RunOutcome::Returned(_) => None,
            RunOutcome::Raised(message) => Some(message.clone()),
            RunOutcome::TimedOut => Some(TIME_LIMIT_EXCEEDED.to_string()),
            RunOutcome::MemoryExceeded => Some(MEMORY_LIMIT_EXCEEDED.to_string()),
        }
    }
}

/// Everything observed about one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub outcome: RunOutcome,
    /// Text printed by the candidate, outside the result envelope
    pub console: String,
    pub execution_time_ms: u64,
    /// Peak resident memory in bytes, when the backend can observe it
    pub memory_used: Option<u64>,
}

/// Execution backend.
///
/// `Workspace` is whatever the backend needs to keep between `prepare` and
/// `run`: a temp directory, a container. It is released on drop.
pub trait Sandbox: Send + Sync {
    type Workspace: Send + Sync;

    /// Write the submission and compile or syntax-check it once.
    /// A `PrepareError::Compilation` is the candidate's fault; anything
    /// else is ours.
    fn prepare(
        &self,
        language: Language,
        code: &str,
        memory_limit_bytes: u64,
    ) -> impl Future<Output = Result<Self::Workspace, PrepareError>> + Send;

    /// Execute one test case against a prepared workspace
    fn run(
        &self,
        workspace: &Self::Workspace,
        input: &Value,
        limits: RunLimits,
    ) -> impl Future<Output = anyhow::Result<RunOutput>> + Send;
}
