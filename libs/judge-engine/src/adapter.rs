/// Language Runtime Adapter - One Description Per Language
///
/// **Core Responsibility:**
/// Describe, for each supported language, which files a submission becomes,
/// how it is compiled or syntax-checked, how it is run, and how the raw
/// process output is turned back into a `RunOutcome`.
///
/// The adapter is pure data and parsing. Sandboxes own the processes.

use crate::harness;
use crate::sandbox::RunOutcome;
use judge_common::types::Language;
use serde::Deserialize;
use serde_json::Value;

/// Environment variable through which a harness learns its result marker
pub const RESULT_MARKER_ENV: &str = "JUDGE_RESULT_MARKER";

/// A file to materialise in the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: &'static str,
    pub contents: String,
}

/// Per-language execution recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageAdapter {
    language: Language,
}

impl LanguageAdapter {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Candidate code plus harness, as files relative to the workspace root
    pub fn source_files(&self, code: &str) -> Vec<SourceFile> {
        match self.language {
            Language::JavaScript => vec![SourceFile {
                name: "main.js",
                contents: format!("{}\n{}", code, harness::JAVASCRIPT),
            }],
            Language::Python => vec![SourceFile {
                name: "main.py",
                contents: format!("{}\n{}", code, harness::PYTHON),
            }],
            Language::Java => vec![
                SourceFile {
                    name: "Solution.java",
                    contents: code.to_string(),
                },
                SourceFile {
                    name: "Main.java",
                    contents: harness::JAVA_MAIN.to_string(),
                },
            ],
            Language::Go => vec![
                SourceFile {
                    name: "solution.go",
                    contents: code.to_string(),
                },
                SourceFile {
                    name: "main.go",
                    contents: harness::GO_MAIN.to_string(),
                },
                SourceFile {
                    name: "go.mod",
                    contents: harness::GO_MOD.to_string(),
                },
            ],
        }
    }

    /// Compile or syntax-check command, run once per submission in the workspace
    pub fn check_command(&self) -> &'static [&'static str] {
        match self.language {
            Language::JavaScript => &["node", "--check", "main.js"],
            Language::Python => &["python3", "-m", "py_compile", "main.py"],
            Language::Java => &["javac", "-d", ".", "Solution.java", "Main.java"],
            Language::Go => &["go", "build", "-o", "solution_bin", "."],
        }
    }

    /// Command running one test case; input arrives on stdin
    pub fn run_command(&self) -> &'static [&'static str] {
        match self.language {
            Language::JavaScript => &["node", "main.js"],
            Language::Python => &["python3", "-B", "main.py"],
            Language::Java => &["java", "-Xss64m", "-cp", ".", "Main"],
            Language::Go => &["./solution_bin"],
        }
    }
}

/// Fresh per-invocation marker
pub fn new_marker() -> String {
    format!("__JUDGE_RESULT_{}__", uuid::Uuid::new_v4().simple())
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    undefined: bool,
    #[serde(default)]
    error: Option<String>,
}

impl Envelope {
    fn into_outcome(self) -> RunOutcome {
        if !self.ok {
            RunOutcome::Raised(self.error.unwrap_or_else(|| "Unknown error".to_string()))
        } else if self.undefined {
            RunOutcome::Returned(None)
        } else {
            RunOutcome::Returned(Some(self.value))
        }
    }
}

/// Split raw stdout into the envelope outcome (if one was printed) and the
/// remaining console text. The last marker wins.
pub fn split_envelope(stdout: &str, marker: &str) -> (Option<RunOutcome>, String) {
    let Some(start) = stdout.rfind(marker) else {
        return (None, stdout.to_string());
    };

    let rest = &stdout[start + marker.len()..];
    let (line, after) = match rest.find('\n') {
        Some(end) => (&rest[..end], &rest[end + 1..]),
        None => (rest, ""),
    };

    let before = stdout[..start].strip_suffix('\n').unwrap_or(&stdout[..start]);
    let mut console = before.to_string();
    console.push_str(after);

    match serde_json::from_str::<Envelope>(line.trim()) {
        Ok(envelope) => (Some(envelope.into_outcome()), console),
        Err(e) => (
            Some(RunOutcome::Raised(format!("Malformed result: {}", e))),
            console,
        ),
    }
}

/// Turn a finished process into an outcome plus console text.
///
/// Without an envelope the process died before the harness could report:
/// the last line of stderr is the best description available.
pub fn interpret(
    marker: &str,
    stdout: &str,
    stderr: &str,
    exit_code: Option<i64>,
) -> (RunOutcome, String) {
    let (outcome, mut console) = split_envelope(stdout, marker);
    if !stderr.is_empty() {
        if !console.is_empty() && !console.ends_with('\n') {
            console.push('\n');
        }
        console.push_str(stderr);
    }

    let outcome = outcome.unwrap_or_else(|| {
        let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty());
        match (last_line, exit_code) {
            (Some(line), _) => RunOutcome::Raised(line.trim().to_string()),
            (None, Some(0)) => RunOutcome::Raised("No result was produced".to_string()),
            (None, Some(code)) => RunOutcome::Raised(format!("Process exited with code {}", code)),
            (None, None) => RunOutcome::Raised("Process was terminated".to_string()),
        }
    });

    (outcome, console)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MARKER: &str = "__JUDGE_RESULT_test__";

    #[test]
    fn test_every_language_has_files_and_commands() {
        for language in Language::all_variants() {
            let adapter = LanguageAdapter::new(*language);
            let files = adapter.source_files("code");
            assert!(!files.is_empty());
            assert!(files.iter().any(|f| f.contents.contains("code")));
            assert!(!adapter.check_command().is_empty());
            assert!(!adapter.run_command().is_empty());
        }
    }

    #[test]
    fn test_markers_are_unique() {
        assert_ne!(new_marker(), new_marker());
    }

    #[test]
    fn test_value_envelope_and_console() {
        let stdout = format!("hello\nworld\n\n{}{{\"ok\":true,\"value\":[1,2]}}\n", MARKER);
        let (outcome, console) = interpret(MARKER, &stdout, "", Some(0));

        assert_eq!(outcome, RunOutcome::Returned(Some(json!([1, 2]))));
        assert_eq!(console, "hello\nworld\n");
    }

    #[test]
    fn test_undefined_and_null_are_distinct() {
        let undefined = format!("\n{}{{\"ok\":true,\"undefined\":true}}\n", MARKER);
        let null = format!("\n{}{{\"ok\":true,\"value\":null}}\n", MARKER);

        assert_eq!(interpret(MARKER, &undefined, "", Some(0)).0, RunOutcome::Returned(None));
        assert_eq!(
            interpret(MARKER, &null, "", Some(0)).0,
            RunOutcome::Returned(Some(Value::Null))
        );
    }

    #[test]
    fn test_error_envelope() {
        let stdout = format!("\n{}{{\"ok\":false,\"error\":\"ValueError: boom\"}}\n", MARKER);
        let (outcome, _) = interpret(MARKER, &stdout, "", Some(0));
        assert_eq!(outcome, RunOutcome::Raised("ValueError: boom".to_string()));
    }

    #[test]
    fn test_forged_marker_is_not_trusted() {
        let stdout = "__JUDGE_RESULT_other__{\"ok\":true,\"value\":1}\n";
        let (outcome, console) = interpret(MARKER, stdout, "", Some(0));
        assert_eq!(outcome, RunOutcome::Raised("No result was produced".to_string()));
        assert!(console.contains("__JUDGE_RESULT_other__"));
    }

    #[test]
    fn test_crash_without_envelope_uses_stderr() {
        let stderr = "Traceback (most recent call last):\n  File \"main.py\"\nZeroDivisionError: division by zero\n";
        let (outcome, console) = interpret(MARKER, "partial\n", stderr, Some(1));

        assert_eq!(
            outcome,
            RunOutcome::Raised("ZeroDivisionError: division by zero".to_string())
        );
        assert!(console.starts_with("partial\n"));
        assert!(console.contains("Traceback"));
    }

    #[test]
    fn test_silent_exit_code() {
        let (outcome, _) = interpret(MARKER, "", "", Some(3));
        assert_eq!(outcome, RunOutcome::Raised("Process exited with code 3".to_string()));
    }

    #[test]
    fn test_malformed_envelope() {
        let stdout = format!("\n{}{{not json\n", MARKER);
        let (outcome, _) = interpret(MARKER, &stdout, "", Some(0));
        assert!(matches!(outcome, RunOutcome::Raised(m) if m.starts_with("Malformed result")));
    }
}
