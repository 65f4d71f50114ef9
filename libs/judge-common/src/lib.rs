pub mod config;
pub mod redis;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{Config, SandboxBackend};
pub use types::{ExecutionRequest, ExecutionResult, Language, Submission, TestCase, TestCaseResult};
