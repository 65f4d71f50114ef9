use std::env;
use std::fmt;

/// Which sandbox implementation executes candidate code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxBackend {
    /// Local child processes in throwaway directories
    Process,
    /// Network-less, resource-capped Docker containers
    Docker,
}

impl SandboxBackend {
    pub fn from_str(s: &str) -> Option<SandboxBackend> {
        match s.trim().to_lowercase().as_str() {
            "process" => Some(SandboxBackend::Process),
            "docker" => Some(SandboxBackend::Docker),
            _ => None,
        }
    }

    /// Whether candidate code is kept off the host kernel's view of the machine
    pub fn is_isolated(&self) -> bool {
        matches!(self, SandboxBackend::Docker)
    }
}

impl fmt::Display for SandboxBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxBackend::Process => write!(f, "process"),
            SandboxBackend::Docker => write!(f, "docker"),
        }
    }
}

/// Application configuration
/// Provides defaults with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub api_addr: String,
    pub default_timeout_ms: u64,
    pub max_timeout_ms: u64,
    pub default_memory_limit_mb: u64,
    pub max_parallel_tests: usize,
    pub result_ttl_seconds: u64,
    pub sandbox_backend: SandboxBackend,
    /// Opt-in for running untrusted submissions on the process backend
    pub allow_process_sandbox: bool,
    pub languages_config: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Docker unless the value names another backend
fn parse_backend(value: Option<&str>) -> SandboxBackend {
    value
        .and_then(SandboxBackend::from_str)
        .unwrap_or(SandboxBackend::Docker)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            api_addr: env::var("API_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            default_timeout_ms: env_or("DEFAULT_TIMEOUT_MS", 5000),
            max_timeout_ms: env_or("MAX_TIMEOUT_MS", 30000),
            default_memory_limit_mb: env_or("DEFAULT_MEMORY_LIMIT_MB", 256),
            max_parallel_tests: env_or("MAX_PARALLEL_TESTS", 4usize).max(1),
            result_ttl_seconds: env_or("RESULT_TTL_SECONDS", 86400),
            sandbox_backend: parse_backend(env::var("SANDBOX_BACKEND").ok().as_deref()),
            allow_process_sandbox: env_flag("ALLOW_PROCESS_SANDBOX"),
            languages_config: env::var("LANGUAGES_CONFIG")
                .unwrap_or_else(|_| "config/languages.json".to_string()),
        }
    }

    pub fn new() -> Self {
        Self::from_env()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
