use thiserror::Error;

/// Request-level failures. The `Display` text of each variant is the exact
/// message placed on `ExecutionResult.error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JudgeError {
    #[error("Code cannot be empty")]
    EmptyCode,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Duplicate test case id: {0}")]
    DuplicateTestCaseId(String),

    #[error("Code contains potentially unsafe operations")]
    UnsafeCode,

    #[error("Compilation failed")]
    CompilationFailed,

    #[error("Execution failed: {0}")]
    Infrastructure(String),
}

/// Failure to get the submission into a runnable state
#[derive(Debug, Error)]
pub enum PrepareError {
    /// The candidate's code does not load or compile
    #[error("{0}")]
    Compilation(String),

    /// The judge itself could not provide the runtime
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

/// Result store failures. Always logged, never shown to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a result is already stored for attempt {0}")]
    AlreadyStored(String),

    #[error("result store backend error: {0}")]
    Backend(#[from] redis::RedisError),
}
