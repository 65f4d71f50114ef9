// CLI commands for running and inspecting judge submissions
use anyhow::{anyhow, bail, Context, Result};
use judge_common::config::{Config, SandboxBackend};
use judge_common::types::{ExecutionRequest, Language};
use judge_engine::classifier::{self, Verdict};
use judge_engine::{
    DockerSandbox, EngineSettings, JudgeEngine, LanguageConfigManager, ProcessSandbox,
    RedisResultStore, ResultStore, StoreError,
};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Read an ExecutionRequest from a JSON file
pub fn load_request(path: &Path) -> Result<ExecutionRequest> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid execution request", path.display()))
}

/// Judge a request file with a local engine
pub async fn run_request(
    path: &Path,
    backend: Option<SandboxBackend>,
    attempt_id: Option<&str>,
) -> Result<()> {
    let request = load_request(path)?;
    let config = Config::from_env();
    let settings = EngineSettings::from(&config);
    let backend = backend.unwrap_or(config.sandbox_backend);

    info!(backend = %backend, language = %request.language, "Judging request file");
    if !backend.is_isolated() {
        warn!(backend = %backend, "Process sandbox: the submission runs on this machine without container isolation");
    }

    let result = match backend {
        SandboxBackend::Process => {
            JudgeEngine::new(ProcessSandbox::new(), settings)
                .execute(&request)
                .await
        }
        SandboxBackend::Docker => {
            let languages =
                LanguageConfigManager::load_or_builtin(Path::new(&config.languages_config));
            let sandbox = DockerSandbox::new(languages).context("Failed to connect to Docker")?;
            JudgeEngine::new(sandbox, settings).execute(&request).await
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    // The process is about to exit, so the write is awaited rather than backgrounded
    if let Some(attempt_id) = attempt_id {
        let store = RedisResultStore::connect(&config.redis_url, config.result_ttl_seconds)
            .await
            .context("Failed to connect to Redis")?;

        match store.put(attempt_id, &result).await {
            Ok(()) => eprintln!("✅ Stored result for attempt {}", attempt_id),
            Err(StoreError::AlreadyStored(_)) => {
                bail!("A result is already stored for attempt {}", attempt_id)
            }
            Err(e) => return Err(e).context("Failed to store result"),
        }
    }

    Ok(())
}

/// Classifier verdict as JSON
pub fn classify_source(language: &str, code: &str) -> Result<Value> {
    let language = Language::from_str(language)
        .ok_or_else(|| anyhow!("Unsupported language: {}", language))?;

    Ok(match classifier::check(code, language) {
        Verdict::Safe => json!({ "language": language.to_string(), "safe": true }),
        Verdict::Unsafe { category, rule } => json!({
            "language": language.to_string(),
            "safe": false,
            "category": category.to_string(),
            "rule": rule,
        }),
    })
}

pub fn classify_file(language: &str, path: &Path) -> Result<()> {
    let code = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let verdict = classify_source(language, &code)?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

pub async fn show_result(attempt_id: &str) -> Result<()> {
    let config = Config::from_env();
    let store = RedisResultStore::connect(&config.redis_url, config.result_ttl_seconds)
        .await
        .context("Failed to connect to Redis")?;

    match store.get(attempt_id).await.context("Failed to fetch result")? {
        Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        None => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "attemptId": attempt_id, "status": "pending" }))?
        ),
    }
    Ok(())
}

pub fn list_languages() -> Result<()> {
    let config = Config::from_env();
    let languages = LanguageConfigManager::load_or_builtin(Path::new(&config.languages_config));

    println!("{:<12} {:<28} {:>8} {:>6}", "LANGUAGE", "IMAGE", "MEMORY", "CPU");
    for name in languages.list_languages() {
        let Some(language) = Language::from_str(&name) else {
            continue;
        };
        let lang_config = languages.get_config(&language)?;
        println!(
            "{:<12} {:<28} {:>6}MB {:>6}",
            name, lang_config.image, lang_config.memory_limit_mb, lang_config.cpu_limit
        );
    }
    Ok(())
}
