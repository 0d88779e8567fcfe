use metrics::{counter, describe_counter, describe_histogram, histogram};

// ---------------------------------------------------------------------------
// Metrics catalog
// ---------------------------------------------------------------------------

/// Register all metric descriptors at startup.
///
/// Descriptors provide human-readable descriptions for Prometheus.
pub fn describe_all_metrics() {
    describe_counter!("vidrelay_uploads_total", "Upload requests by result");
    describe_histogram!("vidrelay_upload_size_bytes", "Size of stored uploads");
    describe_histogram!(
        "vidrelay_upload_duration_seconds",
        "Time from request start to slot commit"
    );
    describe_counter!("vidrelay_retrievals_total", "Latest-video requests by result");
    describe_counter!(
        "vidrelay_delivery_bytes_sent_total",
        "Bytes of video body served"
    );
    describe_counter!(
        "vidrelay_storage_errors_total",
        "Slot I/O failures by operation"
    );
    describe_counter!("vidrelay_panic_total", "Panics caught by the panic hook");
}

// ---------------------------------------------------------------------------
// Metric recording helpers
// ---------------------------------------------------------------------------

pub fn inc_upload(result: &str) {
    counter!("vidrelay_uploads_total", "result" => result.to_string()).increment(1);
}

pub fn record_upload_size(bytes: f64) {
    histogram!("vidrelay_upload_size_bytes").record(bytes);
}

pub fn record_upload_duration(seconds: f64) {
    histogram!("vidrelay_upload_duration_seconds").record(seconds);
}

pub fn inc_retrieval(result: &str) {
    counter!("vidrelay_retrievals_total", "result" => result.to_string()).increment(1);
}

pub fn add_delivery_bytes_sent(bytes: u64) {
    counter!("vidrelay_delivery_bytes_sent_total").increment(bytes);
}

pub fn inc_storage_error(operation: &str) {
    counter!("vidrelay_storage_errors_total", "operation" => operation.to_string()).increment(1);
}

pub fn inc_panic_total() {
    counter!("vidrelay_panic_total").increment(1);
}

// ---------------------------------------------------------------------------
// Prometheus recorder installation
// ---------------------------------------------------------------------------

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install_prometheus_recorder(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, metrics_exporter_prometheus::BuildError>
{
    metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_metrics_render() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            inc_upload("success");
            inc_upload("success");
            inc_retrieval("not_found");
        });

        let rendered = handle.render();
        assert!(rendered.contains("vidrelay_uploads_total{result=\"success\"} 2"));
        assert!(rendered.contains("vidrelay_retrievals_total{result=\"not_found\"} 1"));
    }
}
