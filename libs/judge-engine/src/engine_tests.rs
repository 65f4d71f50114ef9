/// End-to-end tests for the judging engine
///
/// `scripted_sandbox_tests` drive the façade through a sandbox whose
/// behaviour is chosen by the test input, so every pipeline branch is
/// covered without any runtime installed:
/// 1. Validation and classification reject before anything runs
/// 2. Passing, failing, crashing and timed-out cases are judged independently
/// 3. Compilation and infrastructure failures short-circuit every case
/// 4. Results keep test-case order under parallel execution
/// 5. Console output is redacted, results are stored once
///
/// `runtime_tests` run real interpreters and skip when one is missing.

#[cfg(test)]
mod scripted_sandbox_tests {
    use crate::classifier;
    use crate::engine::{EngineSettings, JudgeEngine};
    use crate::error::PrepareError;
    use crate::sandbox::{RunLimits, RunOutcome, RunOutput, Sandbox};
    use crate::store::{MemoryResultStore, ResultStore};
    use anyhow::anyhow;
    use judge_common::types::{ExecutionRequest, Language, TestCase};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Sandbox whose behaviour is scripted by the test input:
    /// - number `n`: returns `2n`
    /// - `{"sleep": ms, "value": v}`: returns `v` after `ms`
    /// - `{"print": text, "value": v}`: prints `text`, returns `v`
    /// - `"boom"`: raises, `"nothing"`: returns no value, `"oom"`: exceeds memory
    /// - `"spin"`: runs until its time limit, `"hang"`: ignores its time limit
    /// - `"infra"`: the sandbox itself fails
    ///
    /// Source containing `compile_error` or `infra_down` fails `prepare`.
    #[derive(Default)]
    struct ScriptedSandbox {
        prepares: AtomicUsize,
        runs: AtomicUsize,
    }

    struct ScriptedWorkspace;

    impl Sandbox for ScriptedSandbox {
        type Workspace = ScriptedWorkspace;

        async fn prepare(
            &self,
            _language: Language,
            code: &str,
            _memory_limit_bytes: u64,
        ) -> Result<ScriptedWorkspace, PrepareError> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            if code.contains("compile_error") {
                return Err(PrepareError::Compilation(
                    "SyntaxError: unexpected token near api_key=abc123".to_string(),
                ));
            }
            if code.contains("infra_down") {
                return Err(PrepareError::Infrastructure(anyhow!("Runtime 'node' is not installed")));
            }
            Ok(ScriptedWorkspace)
        }

        async fn run(
            &self,
            _workspace: &ScriptedWorkspace,
            input: &Value,
            limits: RunLimits,
        ) -> anyhow::Result<RunOutput> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let start = Instant::now();
            let mut console = String::new();

            let outcome = match input {
                Value::Number(n) => RunOutcome::Returned(Some(json!(n.as_i64().unwrap_or(0) * 2))),
                Value::String(s) if s == "boom" => RunOutcome::Raised("Error: boom".to_string()),
                Value::String(s) if s == "nothing" => RunOutcome::Returned(None),
                Value::String(s) if s == "oom" => RunOutcome::MemoryExceeded,
                Value::String(s) if s == "spin" => {
                    tokio::time::sleep(Duration::from_millis(limits.time_limit_ms)).await;
                    RunOutcome::TimedOut
                }
                Value::String(s) if s == "hang" => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Value::String(s) if s == "infra" => return Err(anyhow!("container vanished")),
                Value::Object(map) => {
                    if let Some(ms) = map.get("sleep").and_then(Value::as_u64) {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                    if let Some(text) = map.get("print").and_then(Value::as_str) {
                        console.push_str(text);
                    }
                    RunOutcome::Returned(map.get("value").cloned())
                }
                other => RunOutcome::Returned(Some(other.clone())),
            };

            Ok(RunOutput {
                outcome,
                console,
                execution_time_ms: start.elapsed().as_millis() as u64,
                memory_used: Some(1024),
            })
        }
    }

    /// Helper to create a test case
    fn make_test_case(id: &str, input: Value, expected: Value, weight: f64) -> TestCase {
        TestCase {
            id: id.to_string(),
            name: format!("case {}", id),
            input,
            expected_output: expected,
            is_visible: true,
            weight,
            time_limit: None,
        }
    }

    fn make_request(code: &str, language: &str, test_cases: Vec<TestCase>) -> ExecutionRequest {
        ExecutionRequest {
            code: code.to_string(),
            language: language.to_string(),
            test_cases,
            time_limit: None,
            memory_limit: None,
        }
    }

    fn engine() -> JudgeEngine<ScriptedSandbox> {
        JudgeEngine::new(ScriptedSandbox::default(), EngineSettings::default())
    }

    const SOLUTION: &str = "function solution(x) { return x * 2; }";

    #[tokio::test]
    async fn test_doubling_passes() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "javascript",
            vec![make_test_case("1", json!(5), json!(10), 1.0)],
        );

        let result = engine.execute(&request).await;

        assert!(result.success);
        assert_eq!(result.test_results.len(), 1);
        assert!(result.test_results[0].passed);
        assert_eq!(result.test_results[0].actual_output, Some(json!(10)));
        assert_eq!(result.test_results[0].memory_used, Some(1024));
        assert_eq!(result.score, 100);
        assert_eq!(result.total_passed, 1);
        assert_eq!(result.total_tests, 1);
    }

    #[tokio::test]
    async fn test_weighted_score() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "python",
            vec![
                make_test_case("1", json!(1), json!(2), 30.0),
                make_test_case("2", json!(2), json!(5), 40.0),
                make_test_case("3", json!(3), json!(6), 30.0),
            ],
        );

        let result = engine.execute(&request).await;

        assert!(result.success);
        assert_eq!(result.score, 60);
        assert_eq!(result.total_passed, 2);
        assert!(!result.test_results[1].passed);
        assert_eq!(result.test_results[1].error, None);
    }

    #[tokio::test]
    async fn test_empty_test_cases_score_zero() {
        let engine = engine();
        let result = engine.execute(&make_request(SOLUTION, "javascript", Vec::new())).await;

        assert!(result.success);
        assert_eq!(result.score, 0);
        assert!(result.test_results.is_empty());
        assert_eq!(result.total_tests, 0);
    }

    #[tokio::test]
    async fn test_empty_code_rejected() {
        let engine = engine();
        for code in ["", "   ", "\n\t  \n"] {
            let request = make_request(code, "javascript", vec![make_test_case("1", json!(1), json!(2), 1.0)]);
            let result = engine.execute(&request).await;

            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("Code cannot be empty"));
            assert!(result.test_results.is_empty());
        }
        assert_eq!(engine.sandbox().prepares.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_language_rejected() {
        let engine = engine();
        let request = make_request(SOLUTION, "cobol", vec![make_test_case("1", json!(1), json!(2), 1.0)]);

        let result = engine.execute(&request).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unsupported language: cobol"));
        assert!(result.test_results.is_empty());
        assert_eq!(engine.sandbox().prepares.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicate_test_case_ids_rejected() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "javascript",
            vec![
                make_test_case("1", json!(1), json!(2), 30.0),
                make_test_case("1", json!(2), json!(4), 70.0),
            ],
        );

        let result = engine.execute(&request).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Duplicate test case id: 1"));
        assert!(result.test_results.is_empty());
        assert_eq!(result.score, 0);
        assert_eq!(engine.sandbox().prepares.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malicious_samples_rejected_quickly() {
        let samples = [
            ("javascript", "const fs = require('fs'); function solution() { return fs.readFileSync('/etc/passwd', 'utf8'); }"),
            ("javascript", "function solution() { return require('child_process').execSync('ls').toString(); }"),
            ("javascript", "async function solution() { return await fetch('http://evil.example'); }"),
            ("javascript", "function solution(x) { return eval(x); }"),
            ("python", "def solution(x):\n    return open('/etc/passwd').read()\n"),
            ("python", "import subprocess\ndef solution(x):\n    return subprocess.check_output(['ls'])\n"),
            ("python", "import socket\ndef solution(x):\n    return socket.gethostname()\n"),
            ("python", "def solution(x):\n    return eval(x)\n"),
        ];

        // Rules are compiled on first use; keep that out of the measurement
        let _ = classifier::check("warm up", Language::Python);

        let engine = engine();
        for (language, code) in samples {
            let request = make_request(code, language, vec![make_test_case("1", json!(1), json!(1), 1.0)]);

            let start = Instant::now();
            let result = engine.execute(&request).await;
            let elapsed = start.elapsed();

            assert!(!result.success, "{} sample was accepted: {}", language, code);
            assert_eq!(
                result.error.as_deref(),
                Some("Code contains potentially unsafe operations")
            );
            assert!(result.test_results.is_empty());
            assert!(elapsed < Duration::from_millis(100), "took {:?}", elapsed);
        }
        assert_eq!(engine.sandbox().prepares.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_runtime_error_does_not_affect_siblings() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "javascript",
            vec![
                make_test_case("1", json!(1), json!(2), 1.0),
                make_test_case("2", json!("boom"), json!(0), 1.0),
                make_test_case("3", json!(3), json!(6), 1.0),
            ],
        );

        let result = engine.execute(&request).await;

        assert!(result.success);
        assert!(result.test_results[0].passed);
        assert!(!result.test_results[1].passed);
        assert_eq!(result.test_results[1].error.as_deref(), Some("Error: boom"));
        assert_eq!(result.test_results[1].actual_output, None);
        assert!(result.test_results[2].passed);
        assert_eq!(result.score, 67);
    }

    #[tokio::test]
    async fn test_infinite_loop_times_out_within_bound() {
        let engine = engine();
        let mut request = make_request(
            "function solution() { while (true) {} }",
            "javascript",
            vec![
                make_test_case("loop", json!("spin"), json!(1), 1.0),
                make_test_case("fine", json!(4), json!(8), 1.0),
            ],
        );
        request.time_limit = Some(1000);

        let start = Instant::now();
        let result = engine.execute(&request).await;

        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(result.success);
        assert!(!result.test_results[0].passed);
        assert_eq!(result.test_results[0].error.as_deref(), Some("Time limit exceeded"));
        assert!(result.test_results[1].passed);
    }

    #[tokio::test]
    async fn test_backstop_catches_hung_sandbox() {
        let engine = engine();
        let mut request = make_request(
            SOLUTION,
            "javascript",
            vec![make_test_case("hung", json!("hang"), json!(1), 1.0)],
        );
        request.time_limit = Some(100);

        let start = Instant::now();
        let result = engine.execute(&request).await;

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(result.test_results[0].error.as_deref(), Some("Time limit exceeded"));
    }

    #[tokio::test]
    async fn test_per_case_time_limit_overrides_request() {
        let engine = engine();
        let mut slow = make_test_case("slow", json!("spin"), json!(1), 1.0);
        slow.time_limit = Some(50);
        let mut request = make_request(SOLUTION, "javascript", vec![slow]);
        request.time_limit = Some(10_000);

        let start = Instant::now();
        let result = engine.execute(&request).await;

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(result.test_results[0].error.as_deref(), Some("Time limit exceeded"));
    }

    #[tokio::test]
    async fn test_memory_limit_exceeded() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "python",
            vec![make_test_case("1", json!("oom"), json!(1), 1.0)],
        );

        let result = engine.execute(&request).await;

        assert!(result.success);
        assert_eq!(result.test_results[0].error.as_deref(), Some("Memory limit exceeded"));
    }

    #[tokio::test]
    async fn test_compilation_failure_short_circuits() {
        let engine = engine();
        let request = make_request(
            "public class Solution { compile_error }",
            "java",
            vec![
                make_test_case("1", json!(1), json!(2), 1.0),
                make_test_case("2", json!(2), json!(4), 1.0),
            ],
        );

        let result = engine.execute(&request).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Compilation failed"));
        let compilation_error = result.compilation_error.unwrap();
        assert!(compilation_error.contains("SyntaxError"));
        assert!(!compilation_error.contains("abc123"));
        assert_eq!(result.total_tests, 2);
        assert_eq!(result.test_results.len(), 2);
        assert!(result.test_results.iter().all(|r| !r.passed));
        assert!(result
            .test_results
            .iter()
            .all(|r| r.error.as_deref() == Some("Compilation failed")));
        assert_eq!(result.score, 0);
        assert_eq!(engine.sandbox().runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_infrastructure_failure_fails_every_case() {
        let engine = engine();
        let request = make_request(
            "// infra_down\nfunction solution(x) { return x; }",
            "javascript",
            vec![make_test_case("1", json!(1), json!(1), 1.0)],
        );

        let result = engine.execute(&request).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Execution failed: Runtime 'node' is not installed")
        );
        assert_eq!(result.test_results.len(), 1);
        assert!(!result.test_results[0].passed);
        assert_eq!(engine.sandbox().runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sandbox_error_is_confined_to_its_case() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "go",
            vec![
                make_test_case("1", json!("infra"), json!(1), 1.0),
                make_test_case("2", json!(2), json!(4), 1.0),
            ],
        );

        let result = engine.execute(&request).await;

        assert!(result.success);
        assert_eq!(
            result.test_results[0].error.as_deref(),
            Some("Execution failed: container vanished")
        );
        assert!(result.test_results[1].passed);
    }

    #[tokio::test]
    async fn test_results_follow_test_case_order() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "javascript",
            vec![
                make_test_case("a", json!({"sleep": 300, "value": "a"}), json!("a"), 1.0),
                make_test_case("b", json!({"sleep": 10, "value": "b"}), json!("b"), 1.0),
                make_test_case("c", json!({"sleep": 100, "value": "c"}), json!("c"), 1.0),
            ],
        );

        let start = Instant::now();
        let result = engine.execute(&request).await;

        let ids: Vec<&str> = result.test_results.iter().map(|r| r.test_case_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(result.test_results.iter().all(|r| r.passed));
        // Ran side by side, not one after another
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_undefined_never_matches_null() {
        let engine = engine();
        let request = make_request(
            "function solution() {}",
            "javascript",
            vec![make_test_case("1", json!("nothing"), json!(null), 1.0)],
        );

        let result = engine.execute(&request).await;

        assert!(!result.test_results[0].passed);
        assert_eq!(result.test_results[0].actual_output, None);
        assert_eq!(result.test_results[0].error, None);
    }

    #[tokio::test]
    async fn test_console_output_is_redacted() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "javascript",
            vec![
                make_test_case(
                    "1",
                    json!({"print": "password=hunter2 my secret is safe", "value": 1}),
                    json!(1),
                    1.0,
                ),
                make_test_case(
                    "2",
                    json!({"print": "TOKEN: abc\nprivate_key = xyz\nhello", "value": 2}),
                    json!(2),
                    1.0,
                ),
            ],
        );

        let result = engine.execute(&request).await;
        let console = result.console_output.unwrap().to_lowercase();

        for word in ["password", "secret", "key", "token", "hunter2"] {
            assert!(!console.contains(word), "{} leaked: {}", word, console);
        }
        assert!(console.contains("hello"));
    }

    #[tokio::test]
    async fn test_console_is_kept_per_case_and_hidden_from_candidates() {
        let engine = engine();
        let mut hidden = make_test_case(
            "2",
            json!({"print": "input was hidden_input_42", "value": 2}),
            json!(2),
            1.0,
        );
        hidden.is_visible = false;
        let request = make_request(
            SOLUTION,
            "javascript",
            vec![
                make_test_case("1", json!({"print": "visible says hi", "value": 1}), json!(1), 1.0),
                hidden,
            ],
        );

        let result = engine.execute(&request).await;

        assert_eq!(result.test_results[0].console_output.as_deref(), Some("visible says hi"));
        assert_eq!(
            result.test_results[1].console_output.as_deref(),
            Some("input was hidden_input_42")
        );
        assert!(result.console_output.as_deref().unwrap().contains("hidden_input_42"));

        let view = result.candidate_view(&request.test_cases);
        assert_eq!(view.console_output.as_deref(), Some("visible says hi"));
        assert_eq!(view.test_results[1].console_output, None);
        assert!(view.test_results[1].passed);
    }

    #[tokio::test]
    async fn test_ten_concurrent_requests_do_not_interfere() {
        let engine = engine();
        let requests: Vec<ExecutionRequest> = (0..10)
            .map(|i| {
                make_request(
                    SOLUTION,
                    "python",
                    vec![
                        make_test_case("x", json!(i), json!(i * 2), 1.0),
                        make_test_case(
                            "y",
                            json!({"sleep": 20 * (10 - i), "value": i}),
                            json!(i),
                            1.0,
                        ),
                    ],
                )
            })
            .collect();

        let results =
            futures_util::future::join_all(requests.iter().map(|r| engine.execute(r))).await;

        for (i, result) in results.iter().enumerate() {
            assert!(result.success);
            assert_eq!(result.score, 100, "request {} was corrupted", i);
            assert_eq!(result.test_results[0].actual_output, Some(json!(i * 2)));
            assert_eq!(result.test_results[1].actual_output, Some(json!(i)));
        }
    }

    #[tokio::test]
    async fn test_execute_until_cancellation() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "javascript",
            vec![make_test_case("1", json!("hang"), json!(1), 1.0)],
        );

        let start = Instant::now();
        let outcome = engine
            .execute_until(&request, tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert!(outcome.is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_execute_until_completes() {
        let engine = engine();
        let request = make_request(
            SOLUTION,
            "javascript",
            vec![make_test_case("1", json!(2), json!(4), 1.0)],
        );

        let outcome = engine
            .execute_until(&request, std::future::pending::<()>())
            .await;

        assert_eq!(outcome.map(|r| r.score), Some(100));
    }

    #[tokio::test]
    async fn test_execute_and_store_is_write_once() {
        let store = MemoryResultStore::new();
        let engine = engine().with_store(Arc::new(store.clone()));
        let request = make_request(
            SOLUTION,
            "javascript",
            vec![make_test_case("1", json!(2), json!(4), 1.0)],
        );

        let first = engine.execute(&request).await;
        engine.store("attempt-7", &first).unwrap().await.unwrap();

        let mut second = first.clone();
        second.score = 0;
        engine.store("attempt-7", &second).unwrap().await.unwrap();

        let stored = store.get("attempt-7").await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_store_without_backend_is_noop() {
        let engine = engine();
        let result = engine.execute(&make_request(SOLUTION, "javascript", Vec::new())).await;
        assert!(engine.store("attempt-1", &result).is_none());
    }
}

#[cfg(test)]
mod runtime_tests {
    use crate::engine::{EngineSettings, JudgeEngine};
    use crate::sandbox::ProcessSandbox;
    use judge_common::types::{ExecutionRequest, TestCase};
    use serde_json::{json, Value};
    use std::process::{Command, Stdio};
    use std::time::{Duration, Instant};

    fn installed(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    /// Helper to create a test case
    fn make_test_case(id: &str, input: Value, expected: Value) -> TestCase {
        TestCase {
            id: id.to_string(),
            name: String::new(),
            input,
            expected_output: expected,
            is_visible: true,
            weight: 1.0,
            time_limit: None,
        }
    }

    fn doubling_request(language: &str, code: &str) -> ExecutionRequest {
        ExecutionRequest {
            code: code.to_string(),
            language: language.to_string(),
            test_cases: vec![
                make_test_case("1", json!(5), json!(10)),
                make_test_case("2", json!(-4), json!(-8)),
            ],
            time_limit: Some(10_000),
            memory_limit: None,
        }
    }

    fn engine() -> JudgeEngine<ProcessSandbox> {
        JudgeEngine::new(ProcessSandbox::new(), EngineSettings::default())
    }

    async fn assert_doubles(language: &str, code: &str) {
        let result = engine().execute(&doubling_request(language, code)).await;

        assert!(result.success, "{}: {:?}", language, result);
        assert_eq!(result.test_results[0].actual_output, Some(json!(10)), "{}", language);
        assert!(result.test_results.iter().all(|r| r.passed), "{}: {:?}", language, result);
        assert_eq!(result.score, 100);
    }

    #[tokio::test]
    async fn test_python_doubling() {
        if !installed("python3") {
            eprintln!("python3 not installed, skipping");
            return;
        }
        assert_doubles("python", "def solution(x):\n    return x * 2\n").await;
    }

    #[tokio::test]
    async fn test_javascript_doubling() {
        if !installed("node") {
            eprintln!("node not installed, skipping");
            return;
        }
        assert_doubles("javascript", "function solution(x) { return x * 2; }").await;
        assert_doubles("javascript", "module.exports = (x) => x * 2;").await;
    }

    #[tokio::test]
    async fn test_java_doubling() {
        if !installed("javac") {
            eprintln!("javac not installed, skipping");
            return;
        }
        assert_doubles(
            "java",
            "public class Solution {\n    public static Object solution(Object input) {\n        return ((Long) input) * 2;\n    }\n}\n",
        )
        .await;
        assert_doubles(
            "java",
            "public class Solution {\n    public static int solution(int x) { return x * 2; }\n}\n",
        )
        .await;
    }

    #[tokio::test]
    async fn test_go_doubling() {
        if !installed("go") {
            eprintln!("go not installed, skipping");
            return;
        }
        assert_doubles(
            "go",
            "package main\n\nfunc Solution(input interface{}) interface{} {\n\treturn input.(float64) * 2\n}\n",
        )
        .await;
    }

    #[tokio::test]
    async fn test_python_global_state_does_not_leak() {
        if !installed("python3") {
            return;
        }
        let code = "def solution(x):\n    global hits\n    try:\n        hits += 1\n    except NameError:\n        hits = 1\n    return hits\n";
        let engine = engine();

        for _ in 0..10 {
            let request = ExecutionRequest {
                code: code.to_string(),
                language: "python".to_string(),
                test_cases: vec![make_test_case("1", json!(null), json!(1))],
                time_limit: None,
                memory_limit: None,
            };
            let result = engine.execute(&request).await;
            assert!(result.test_results[0].passed, "state leaked: {:?}", result);
        }
    }

    #[tokio::test]
    async fn test_javascript_global_state_does_not_leak() {
        if !installed("node") {
            return;
        }
        let code = "var hits = 0;\nfunction solution(x) { hits += 1; return hits; }";
        let engine = engine();

        let request = ExecutionRequest {
            code: code.to_string(),
            language: "javascript".to_string(),
            test_cases: (0..10).map(|i| make_test_case(&i.to_string(), json!(i), json!(1))).collect(),
            time_limit: None,
            memory_limit: None,
        };

        for _ in 0..10 {
            let result = engine.execute(&request).await;
            assert_eq!(result.total_passed, 10, "state leaked: {:?}", result);
        }
    }

    #[tokio::test]
    async fn test_python_infinite_loop_is_bounded() {
        if !installed("python3") {
            return;
        }
        let request = ExecutionRequest {
            code: "def solution(x):\n    while True:\n        pass\n".to_string(),
            language: "python".to_string(),
            test_cases: vec![make_test_case("1", json!(1), json!(1))],
            time_limit: Some(1000),
            memory_limit: None,
        };

        let start = Instant::now();
        let result = engine().execute(&request).await;

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(result.test_results[0].error.as_deref(), Some("Time limit exceeded"));
    }

    #[tokio::test]
    async fn test_python_runtime_error_is_captured() {
        if !installed("python3") {
            return;
        }
        let request = ExecutionRequest {
            code: "def solution(x):\n    return 1 // x\n".to_string(),
            language: "python".to_string(),
            test_cases: vec![
                make_test_case("zero", json!(0), json!(0)),
                make_test_case("one", json!(1), json!(1)),
            ],
            time_limit: None,
            memory_limit: None,
        };

        let result = engine().execute(&request).await;

        assert!(result.success);
        let error = result.test_results[0].error.as_deref().unwrap();
        assert!(error.starts_with("ZeroDivisionError"), "{}", error);
        assert!(result.test_results[1].passed);
    }

    #[tokio::test]
    async fn test_python_syntax_error_is_compilation_failure() {
        if !installed("python3") {
            return;
        }
        let request = ExecutionRequest {
            code: "def solution(x)\n    return x\n".to_string(),
            language: "python".to_string(),
            test_cases: vec![make_test_case("1", json!(1), json!(1))],
            time_limit: None,
            memory_limit: None,
        };

        let result = engine().execute(&request).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Compilation failed"));
        assert!(result.compilation_error.is_some());
    }

    #[tokio::test]
    async fn test_python_none_is_null() {
        if !installed("python3") {
            return;
        }
        let request = ExecutionRequest {
            code: "def solution(x):\n    print('hello from candidate')\n    return None\n".to_string(),
            language: "python".to_string(),
            test_cases: vec![make_test_case("1", json!(1), json!(null))],
            time_limit: None,
            memory_limit: None,
        };

        let result = engine().execute(&request).await;

        assert!(result.test_results[0].passed);
        assert_eq!(result.console_output.as_deref(), Some("hello from candidate"));
    }

    #[tokio::test]
    #[ignore] // Requires Docker
    async fn test_docker_engine_python() {
        use crate::config::LanguageConfigManager;
        use crate::sandbox::DockerSandbox;

        let sandbox = DockerSandbox::new(LanguageConfigManager::builtin()).unwrap();
        let engine = JudgeEngine::new(sandbox, EngineSettings::default());

        let result = engine
            .execute(&doubling_request("python", "def solution(x):\n    return x * 2\n"))
            .await;

        assert!(result.success, "{:?}", result);
        assert_eq!(result.score, 100);
    }
}
