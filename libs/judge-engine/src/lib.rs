pub mod adapter;
pub mod classifier;
pub mod comparator;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod harness;
pub mod redact;
pub mod sandbox;
pub mod scoring;
pub mod store;

#[cfg(test)]
mod engine_tests;

// Re-export the façade and its collaborators
pub use config::LanguageConfigManager;
pub use engine::{EngineSettings, JudgeEngine};
pub use error::{JudgeError, PrepareError, StoreError};
pub use sandbox::{DockerSandbox, ProcessSandbox, RunLimits, RunOutcome, RunOutput, Sandbox};
pub use store::{MemoryResultStore, RedisResultStore, ResultStore};
