//! Metrics implementation using Prometheus.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use planview_core::{Error, Result};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .map_err(|e| Error::internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Helper to track HTTP request metrics (latency, count).
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}

/// Count an `/analyze` upload by outcome (`ok` or an error kind).
pub fn track_upload(outcome: &str) {
    metrics::counter!("planview_uploads_total", "outcome" => outcome.to_string()).increment(1);
}

/// Count a 3D view by the path that produced it (`inline`, `local`, `degraded`).
pub fn track_render(path: &str) {
    metrics::counter!("planview_renders_total", "path" => path.to_string()).increment(1);
}

/// Count a classified upstream failure.
pub fn track_upstream_error(kind: &str) {
    metrics::counter!("planview_upstream_errors_total", "kind" => kind.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_exported() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            track_request("POST", "/analyze", 200, 0.25);
            track_upload("ok");
            track_render("local");
            track_upstream_error("quota");
            track_upstream_error("quota");
        });

        let rendered = handle.render();
        assert!(rendered.contains("planview_uploads_total{outcome=\"ok\"} 1"), "{rendered}");
        assert!(rendered.contains("planview_renders_total{path=\"local\"} 1"), "{rendered}");
        assert!(rendered.contains("planview_upstream_errors_total{kind=\"quota\"} 2"), "{rendered}");
        assert!(rendered.contains("http_requests_total{"), "{rendered}");
        assert!(rendered.contains("status=\"200\""), "{rendered}");
    }
}
