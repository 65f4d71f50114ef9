/// Judging Engine - The Public Façade
///
/// **Core Responsibility:**
/// Turn an `ExecutionRequest` into an `ExecutionResult`, whatever happens.
///
/// **Pipeline:**
/// `Received → Validated → Classified → Executing → Aggregated → (Stored)`,
/// with `Rejected` reachable from validation and classification.
///
/// **Critical Properties:**
/// - `execute` never returns an error: every failure is a field on the result
/// - Request-level failures (`success = false`) produce no test results,
///   except compilation and infrastructure failures which fail every case
/// - `testResults` follows `testCases` order
/// - Console and error text is redacted before it leaves the engine
/// - Storing is fire-and-forget and never delays the caller

use crate::classifier::{self, Verdict};
use crate::error::{JudgeError, PrepareError};
use crate::executor::{self, CaseExecution};
use crate::redact;
use crate::sandbox::Sandbox;
use crate::scoring;
use crate::store::{self, ResultStore};
use judge_common::config::Config;
use judge_common::types::{ExecutionRequest, ExecutionResult, Language, TestCaseResult};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Engine-wide limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub default_time_limit_ms: u64,
    pub max_time_limit_ms: u64,
    pub default_memory_limit_mb: u64,
    pub max_parallel_tests: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_time_limit_ms: 5000,
            max_time_limit_ms: 30000,
            default_memory_limit_mb: 256,
            max_parallel_tests: 4,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_time_limit_ms: config.default_timeout_ms,
            max_time_limit_ms: config.max_timeout_ms,
            default_memory_limit_mb: config.default_memory_limit_mb,
            max_parallel_tests: config.max_parallel_tests.max(1),
        }
    }
}

/// Reject requests that must never reach a sandbox
pub fn validate(request: &ExecutionRequest) -> Result<Language, JudgeError> {
    if request.code.trim().is_empty() {
        return Err(JudgeError::EmptyCode);
    }
    let language = Language::from_str(&request.language)
        .ok_or_else(|| JudgeError::UnsupportedLanguage(request.language.clone()))?;

    // Results, scores and visibility are all keyed by test case id
    let mut seen = HashSet::with_capacity(request.test_cases.len());
    if let Some(duplicate) = request.test_cases.iter().find(|tc| !seen.insert(tc.id.as_str())) {
        return Err(JudgeError::DuplicateTestCaseId(duplicate.id.clone()));
    }

    Ok(language)
}

pub struct JudgeEngine<S: Sandbox> {
    sandbox: S,
    settings: EngineSettings,
    store: Option<Arc<dyn ResultStore>>,
}

impl<S: Sandbox> JudgeEngine<S> {
    pub fn new(sandbox: S, settings: EngineSettings) -> Self {
        Self {
            sandbox,
            settings,
            store: None,
        }
    }

    /// Attach a result store used by `store` and `execute_and_store`
    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn sandbox(&self) -> &S {
        &self.sandbox
    }

    /// Judge a request
    #[instrument(
        skip(self, request),
        fields(language = %request.language, test_count = request.test_cases.len())
    )]
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let start_time = Instant::now();
        let elapsed = || start_time.elapsed().as_millis() as u64;

        let language = match validate(request) {
            Ok(language) => language,
            Err(e) => {
                info!(reason = %e, "Request rejected");
                return ExecutionResult::rejected(e.to_string(), elapsed());
            }
        };

        if let Verdict::Unsafe { category, rule } = classifier::check(&request.code, language) {
            warn!(category = %category, rule = rule, "Unsafe code rejected");
            return ExecutionResult::rejected(JudgeError::UnsafeCode.to_string(), elapsed());
        }

        let memory_limit_bytes = request
            .memory_limit
            .unwrap_or(self.settings.default_memory_limit_mb)
            .saturating_mul(1024 * 1024);

        let workspace = match self
            .sandbox
            .prepare(language, &request.code, memory_limit_bytes)
            .await
        {
            Ok(workspace) => workspace,
            Err(PrepareError::Compilation(message)) => {
                info!("Compilation failed, all test cases marked as failed");
                let mut result = fail_every_case(request, JudgeError::CompilationFailed, elapsed());
                result.compilation_error = Some(redact::sanitize(&message, redact::MAX_CONSOLE_BYTES));
                return result;
            }
            Err(PrepareError::Infrastructure(e)) => {
                error!(error = %format!("{:#}", e), "Sandbox could not prepare the submission");
                return fail_every_case(
                    request,
                    JudgeError::Infrastructure(format!("{:#}", e)),
                    elapsed(),
                );
            }
        };

        let executions = executor::execute_all(
            &self.sandbox,
            &workspace,
            &request.test_cases,
            request.time_limit,
            memory_limit_bytes,
            &self.settings,
        )
        .await;
        drop(workspace);

        let result = aggregate(request, executions, elapsed());
        info!(
            score = result.score,
            total_passed = result.total_passed,
            total_tests = result.total_tests,
            execution_ms = result.execution_time,
            "Request judged"
        );
        result
    }

    /// Judge a request unless `cancel` resolves first.
    /// On cancellation every in-flight process is killed and `None` is returned.
    pub async fn execute_until<F>(&self, request: &ExecutionRequest, cancel: F) -> Option<ExecutionResult>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.execute(request) => Some(result),
            _ = cancel => {
                info!("Execution cancelled");
                None
            }
        }
    }

    /// Persist a result in the background. `None` when no store is attached.
    pub fn store(&self, attempt_id: &str, result: &ExecutionResult) -> Option<JoinHandle<()>> {
        let store = self.store.clone()?;
        Some(store::store_in_background(
            store,
            attempt_id.to_string(),
            result.clone(),
        ))
    }

    /// `execute` followed by a background `store`
    pub async fn execute_and_store(
        &self,
        attempt_id: &str,
        request: &ExecutionRequest,
    ) -> ExecutionResult {
        let result = self.execute(request).await;
        self.store(attempt_id, &result);
        result
    }
}

/// Every case failed without being run
fn fail_every_case(request: &ExecutionRequest, reason: JudgeError, execution_time: u64) -> ExecutionResult {
    let message = reason.to_string();
    let test_results: Vec<TestCaseResult> = request
        .test_cases
        .iter()
        .map(|tc| TestCaseResult::not_executed(&tc.id, &message))
        .collect();

    ExecutionResult {
        success: false,
        total_passed: 0,
        total_tests: test_results.len(),
        score: 0,
        test_results,
        execution_time,
        console_output: None,
        compilation_error: None,
        error: Some(message),
    }
}

fn aggregate(
    request: &ExecutionRequest,
    executions: Vec<CaseExecution>,
    execution_time: u64,
) -> ExecutionResult {
    let mut console = String::new();
    let mut test_results = Vec::with_capacity(executions.len());

    for CaseExecution { mut result, console: printed } in executions {
        if !printed.trim().is_empty() {
            console.push_str(printed.trim_end());
            console.push('\n');
        }
        result.error = result
            .error
            .map(|e| redact::sanitize(&e, redact::MAX_CONSOLE_BYTES));
        result.console_output = redact::console_output(&printed);
        test_results.push(result);
    }

    ExecutionResult {
        success: true,
        total_passed: scoring::total_passed(&test_results),
        total_tests: request.test_cases.len(),
        score: scoring::score(&test_results, &request.test_cases),
        test_results,
        execution_time,
        console_output: redact::console_output(&console),
        compilation_error: None,
        error: None,
    }
}
