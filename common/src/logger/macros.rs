use std::time::Duration;

use tracing::{Level, Span};

use super::TraceId;

/// Create a root span for a recorder run.
pub fn root_span(mode: &'static str, trace_id: &TraceId) -> Span {
    tracing::span!(
        Level::INFO,
        "run",
        mode = %mode,
        trace_id = %trace_id
    )
}

/// Create a child span (inherits trace_id automatically)
pub fn child_span(name: &'static str) -> Span {
    tracing::span!(Level::INFO, "step", name = %name)
}

/// Awaits `fut` and warns on the `performance` target when it exceeds `max`.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = std::time::Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
