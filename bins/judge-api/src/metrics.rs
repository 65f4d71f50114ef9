// Prometheus metrics for the Judge API

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, IntGauge, Opts, Registry, TextEncoder};
use redis::AsyncCommands;

lazy_static! {
    // Global registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Attempts queued (counter with language label)
    pub static ref ATTEMPTS_SUBMITTED: CounterVec = CounterVec::new(
        Opts::new("judge_attempts_submitted_total", "Total number of attempts queued"),
        &["language"]
    )
    .expect("metric can be created");

    // Cancellation requests
    pub static ref ATTEMPTS_CANCELLED: CounterVec = CounterVec::new(
        Opts::new("judge_attempts_cancelled_total", "Total cancellation requests"),
        &["source"]
    )
    .expect("metric can be created");

    // API request counter
    pub static ref API_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("judge_api_requests_total", "Total API requests"),
        &["route", "status"]
    )
    .expect("metric can be created");

    // Submissions waiting for a worker
    pub static ref QUEUE_DEPTH: IntGauge = IntGauge::new(
        "judge_queue_depth",
        "Current number of queued submissions"
    )
    .expect("metric can be created");
}

/// Register every collector. Safe to call more than once.
pub fn init_metrics() -> prometheus::Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ATTEMPTS_SUBMITTED.clone()),
        Box::new(ATTEMPTS_CANCELLED.clone()),
        Box::new(API_REQUESTS.clone()),
        Box::new(QUEUE_DEPTH.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

pub fn record_request(route: &str, status: u16) {
    API_REQUESTS
        .with_label_values(&[route, &status.to_string()])
        .inc();
}

pub fn record_attempt_submitted(language: &str) {
    ATTEMPTS_SUBMITTED.with_label_values(&[language]).inc();
}

pub fn record_attempt_cancelled(source: &str) {
    ATTEMPTS_CANCELLED.with_label_values(&[source]).inc();
}

/// Refresh the queue depth gauge; errors leave the previous value in place
pub async fn update_queue_depth(redis_conn: &mut redis::aio::ConnectionManager) {
    if let Ok(depth) = redis_conn
        .llen::<_, i64>(judge_common::redis::QUEUE_KEY)
        .await
    {
        QUEUE_DEPTH.set(depth);
    }
}
