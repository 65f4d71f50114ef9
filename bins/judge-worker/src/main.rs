//! Judge Worker: pops submissions from the Redis queue and judges them.
//!
//! Concurrency model: each worker process handles ONE submission at a time.
//! Within that submission, test cases run in parallel up to
//! `MAX_PARALLEL_TESTS`. Throughput across submissions comes only from running
//! more worker replicas against the same queue, so size the replica count to
//! the number of submissions expected to be in flight at once.
//!
//! The process sandbox runs candidate code on the host and is refused unless
//! `ALLOW_PROCESS_SANDBOX` is set. Docker is the default backend.

use anyhow::Context;
use judge_common::config::{Config, SandboxBackend};
use judge_common::redis;
use judge_common::types::{ExecutionResult, Submission};
use judge_engine::{
    DockerSandbox, EngineSettings, JudgeEngine, LanguageConfigManager, ProcessSandbox,
    RedisResultStore, ResultStore, Sandbox,
};
use ::redis::aio::ConnectionManager;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{debug, error, info, instrument, warn};

/// How often a running attempt checks its cancellation flag
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Error recorded for attempts cancelled before they produced a result
const CANCELLED_MESSAGE: &str = "Execution cancelled";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Judge Worker booting...");

    let config = Config::from_env();
    let backend = select_backend(&config)?;
    let settings = EngineSettings::from(&config);
    info!(
        backend = %backend,
        default_timeout_ms = settings.default_time_limit_ms,
        max_timeout_ms = settings.max_time_limit_ms,
        max_parallel_tests = settings.max_parallel_tests,
        "Worker configured"
    );

    // Connect to Redis
    let client = ::redis::Client::open(config.redis_url.as_str())
        .context("Invalid REDIS_URL")?;
    let redis_conn = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    info!("Connected to Redis: {}", config.redis_url);

    let store: Arc<dyn ResultStore> = Arc::new(RedisResultStore::new(
        redis_conn.clone(),
        config.result_ttl_seconds,
    ));

    match backend {
        SandboxBackend::Process => {
            let engine = JudgeEngine::new(ProcessSandbox::new(), settings).with_store(store);
            run(engine, redis_conn).await;
        }
        SandboxBackend::Docker => {
            let languages =
                LanguageConfigManager::load_or_builtin(Path::new(&config.languages_config));
            info!("Loaded language configurations for: {:?}", languages.list_languages());

            let sandbox = DockerSandbox::new(languages).context("Failed to connect to Docker")?;
            let engine = JudgeEngine::new(sandbox, settings).with_store(store);
            run(engine, redis_conn).await;
        }
    }

    info!("Worker shutdown complete");
    Ok(())
}

/// The process backend shares the host with candidate code, so a worker
/// only uses it when ALLOW_PROCESS_SANDBOX is set.
fn select_backend(config: &Config) -> anyhow::Result<SandboxBackend> {
    let backend = config.sandbox_backend;
    if !backend.is_isolated() {
        if !config.allow_process_sandbox {
            anyhow::bail!(
                "SANDBOX_BACKEND={} runs submissions directly on this host; set ALLOW_PROCESS_SANDBOX=1 to allow it",
                backend
            );
        }
        warn!(backend = %backend, "Process sandbox enabled: submissions run on this host without container isolation");
    }
    Ok(backend)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_line_number(true)
            .init();
    }
}

async fn run<S: Sandbox>(engine: JudgeEngine<S>, mut redis_conn: ConnectionManager) {
    // Setup graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install CTRL+C signal handler");
        }
        warn!("Received shutdown signal, stopping...");
    };

    tokio::select! {
        _ = worker_loop(&mut redis_conn, &engine) => {},
        _ = shutdown => {},
    }
}

/// One BLPOP, one submission judged to completion, then back to the queue
#[instrument(skip(redis_conn, engine))]
async fn worker_loop<S: Sandbox>(redis_conn: &mut ConnectionManager, engine: &JudgeEngine<S>) {
    loop {
        // BLPOP with 5 second timeout for graceful shutdown
        match redis::pop_submission(redis_conn, 5.0).await {
            Ok(Some(submission)) => process_submission(redis_conn, engine, submission).await,
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "Redis error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

async fn process_submission<S: Sandbox>(
    redis_conn: &ConnectionManager,
    engine: &JudgeEngine<S>,
    submission: Submission,
) {
    let Submission { attempt_id, request } = submission;
    info!(
        attempt_id = %attempt_id,
        language = %request.language,
        test_cases = request.test_cases.len(),
        source_size = request.code.len(),
        "Received submission"
    );

    let start = Instant::now();
    let mut conn = redis_conn.clone();
    let already_cancelled = match redis::is_cancelled(&mut conn, &attempt_id).await {
        Ok(cancelled) => cancelled,
        Err(e) => {
            warn!(attempt_id = %attempt_id, error = %e, "Could not read cancellation flag");
            false
        }
    };

    let result = if already_cancelled {
        warn!(attempt_id = %attempt_id, "Attempt cancelled before execution");
        cancelled_result(start)
    } else {
        let cancel = wait_for_cancellation(redis_conn.clone(), &attempt_id);
        match engine.execute_until(&request, cancel).await {
            Some(result) => result,
            None => {
                warn!(attempt_id = %attempt_id, "Attempt cancelled during execution");
                cancelled_result(start)
            }
        }
    };

    info!(
        attempt_id = %attempt_id,
        success = result.success,
        score = result.score,
        total_passed = result.total_passed,
        total_tests = result.total_tests,
        execution_ms = start.elapsed().as_millis() as u64,
        "Execution completed"
    );

    for test_result in &result.test_results {
        debug!(
            attempt_id = %attempt_id,
            test_case_id = %test_result.test_case_id,
            passed = test_result.passed,
            execution_ms = test_result.execution_time,
            "Test result"
        );
    }

    // Persist result; failures are logged by the store and never stop the worker
    if let Some(handle) = engine.store(&attempt_id, &result) {
        if let Err(e) = handle.await {
            error!(attempt_id = %attempt_id, error = %e, "Result store task failed");
        }
    }
}

/// Resolves once the attempt's cancellation flag is raised
async fn wait_for_cancellation(mut conn: ConnectionManager, attempt_id: &str) {
    let mut interval = tokio::time::interval(CANCEL_POLL_INTERVAL);
    loop {
        interval.tick().await;
        match redis::is_cancelled(&mut conn, attempt_id).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => debug!(attempt_id = %attempt_id, error = %e, "Cancellation poll failed"),
        }
    }
}

fn cancelled_result(start: Instant) -> ExecutionResult {
    ExecutionResult::rejected(CANCELLED_MESSAGE, start.elapsed().as_millis() as u64)
}
