/// Test Case Executor - Sandbox + Comparator, One Case at a Time
///
/// **Responsibility:**
/// Run every test case of a request against a prepared workspace and turn
/// each raw `RunOutput` into a `TestCaseResult`.
///
/// **Rules:**
/// - Time limit: the case's own, else the request's, else the default; clamped to the maximum
/// - A failure, crash or timeout in one case never cancels another
/// - Cases may run concurrently; results always come back in test-case order
/// - Every sandbox call is wrapped in its own deadline (limit + grace) so a
///   misbehaving backend cannot stall the request
///
/// The executor knows nothing about validation, classification or scoring.

use crate::comparator;
use crate::engine::EngineSettings;
use crate::error::JudgeError;
use crate::sandbox::{RunLimits, RunOutcome, RunOutput, Sandbox};
use futures_util::stream::{self, StreamExt};
use judge_common::types::{TestCase, TestCaseResult};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Slack given to a sandbox beyond the case's own limit before the executor gives up on it
pub const BACKSTOP_GRACE: Duration = Duration::from_secs(2);

/// A judged case plus whatever the candidate printed while it ran
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExecution {
    pub result: TestCaseResult,
    pub console: String,
}

/// Effective per-case time limit in milliseconds
pub fn resolve_time_limit(
    case_limit: Option<u64>,
    request_limit: Option<u64>,
    settings: &EngineSettings,
) -> u64 {
    case_limit
        .or(request_limit)
        .unwrap_or(settings.default_time_limit_ms)
        .clamp(1, settings.max_time_limit_ms.max(1))
}

/// Run a single test case and judge its output
pub async fn execute_case<S: Sandbox>(
    sandbox: &S,
    workspace: &S::Workspace,
    test_case: &TestCase,
    limits: RunLimits,
) -> CaseExecution {
    let start_time = Instant::now();
    let backstop = Duration::from_millis(limits.time_limit_ms) + BACKSTOP_GRACE;

    let output = match tokio::time::timeout(
        backstop,
        sandbox.run(workspace, &test_case.input, limits),
    )
    .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(test_case_id = %test_case.id, error = %e, "Sandbox failed to execute test case");
            let mut result = TestCaseResult::not_executed(
                &test_case.id,
                &JudgeError::Infrastructure(format!("{:#}", e)).to_string(),
            );
            result.execution_time = start_time.elapsed().as_millis() as u64;
            return CaseExecution {
                result,
                console: String::new(),
            };
        }
        Err(_) => {
            warn!(
                test_case_id = %test_case.id,
                backstop_ms = backstop.as_millis() as u64,
                "Sandbox overran its deadline"
            );
            RunOutput {
                outcome: RunOutcome::TimedOut,
                console: String::new(),
                execution_time_ms: start_time.elapsed().as_millis() as u64,
                memory_used: None,
            }
        }
    };

    let error = output.outcome.error_message();
    let (passed, actual_output) = match output.outcome {
        RunOutcome::Returned(value) => (
            comparator::outputs_match(value.as_ref(), &test_case.expected_output),
            value,
        ),
        _ => (false, None),
    };

    debug!(
        test_case_id = %test_case.id,
        passed = passed,
        execution_ms = output.execution_time_ms,
        error = ?error,
        "Test case judged"
    );

    CaseExecution {
        result: TestCaseResult {
            test_case_id: test_case.id.clone(),
            passed,
            actual_output,
            execution_time: output.execution_time_ms,
            memory_used: output.memory_used,
            error,
            console_output: None,
        },
        console: output.console,
    }
}

/// Run every test case, at most `settings.max_parallel_tests` at a time,
/// returning results in the order of `test_cases`
pub async fn execute_all<S: Sandbox>(
    sandbox: &S,
    workspace: &S::Workspace,
    test_cases: &[TestCase],
    request_time_limit: Option<u64>,
    memory_limit_bytes: u64,
    settings: &EngineSettings,
) -> Vec<CaseExecution> {
    stream::iter(test_cases)
        .map(|test_case| {
            let limits = RunLimits {
                time_limit_ms: resolve_time_limit(test_case.time_limit, request_time_limit, settings),
                memory_limit_bytes,
            };
            execute_case(sandbox, workspace, test_case, limits)
        })
        .buffered(settings.max_parallel_tests.max(1))
        .collect()
        .await
}
