use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Closed set of languages the judge can execute.
/// Adding a variant forces every adapter `match` to be extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    Java,
    Go,
}

impl Language {
    /// Returns all language variants
    /// This is the single source of truth for available languages
    pub fn all_variants() -> &'static [Language] {
        &[Language::JavaScript, Language::Python, Language::Java, Language::Go]
    }

    /// Parse a language from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Language> {
        match s.trim().to_lowercase().as_str() {
            "javascript" => Some(Language::JavaScript),
            "python" => Some(Language::Python),
            "java" => Some(Language::Java),
            "go" => Some(Language::Go),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::JavaScript => write!(f, "javascript"),
            Language::Python => write!(f, "python"),
            Language::Java => write!(f, "java"),
            Language::Go => write!(f, "go"),
        }
    }
}

fn default_visible() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

/// Test Case Definition (Immutable Input)
/// `input` and `expected_output` are arbitrary JSON values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub input: Value,
    pub expected_output: Value,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u64>,
}

/// Submission to be judged (Immutable)
///
/// `language` stays textual so that unknown values reach the engine
/// and are rejected there with a readable message instead of failing
/// deserialization at the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    /// Global per-case budget in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u64>,
    /// Memory budget in megabytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u64>,
}

/// Queue payload: a request plus the attempt it belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub attempt_id: String,
    pub request: ExecutionRequest,
}

/// Per-Test Result
/// `actual_output: None` means the candidate produced no value at all,
/// which is not the same thing as producing `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub test_case_id: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<Value>,
    pub execution_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// What this case printed outside its return value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_output: Option<String>,
}

impl TestCaseResult {
    /// A result for a case that never reached the runtime
    pub fn not_executed(test_case_id: &str, error: &str) -> Self {
        Self {
            test_case_id: test_case_id.to_string(),
            passed: false,
            actual_output: None,
            execution_time: 0,
            memory_used: None,
            error: Some(error.to_string()),
            console_output: None,
        }
    }
}

/// Execution Output
/// Written by the engine, persisted by attempt id, read by the API
///
/// ## Scoring Semantics:
/// - score: percentage (0-100) of total test-case weight earned by passed cases
/// - success: false only for request-level failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub test_results: Vec<TestCaseResult>,
    pub total_passed: usize,
    pub total_tests: usize,
    pub score: u32,
    pub execution_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compilation_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Request-level rejection: no test results were produced
    pub fn rejected(message: impl Into<String>, execution_time: u64) -> Self {
        Self {
            success: false,
            test_results: Vec::new(),
            total_passed: 0,
            total_tests: 0,
            score: 0,
            execution_time,
            console_output: None,
            compilation_error: None,
            error: Some(message.into()),
        }
    }

    /// Copy of this result safe to show the candidate: hidden test cases
    /// keep their pass/fail verdict but lose actual output, error text and
    /// console output. A case missing from `test_cases` counts as hidden.
    pub fn candidate_view(&self, test_cases: &[TestCase]) -> ExecutionResult {
        let visible: HashSet<&str> = test_cases
            .iter()
            .filter(|tc| tc.is_visible)
            .map(|tc| tc.id.as_str())
            .collect();

        let mut view = self.clone();
        let mut any_hidden = false;
        for result in &mut view.test_results {
            if !visible.contains(result.test_case_id.as_str()) {
                any_hidden = true;
                result.actual_output = None;
                result.error = None;
                result.console_output = None;
            }
        }

        // The combined console mixes every case, so rebuild it from visible ones
        if any_hidden {
            let console: Vec<&str> = view
                .test_results
                .iter()
                .filter_map(|r| r.console_output.as_deref())
                .collect();
            view.console_output = if console.is_empty() {
                None
            } else {
                Some(console.join("\n"))
            };
        }
        view
    }
}
