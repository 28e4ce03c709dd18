//! Prometheus metrics for the validation endpoints
//!
//! Labels carry the endpoint and outcome only, never request bodies.

use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{Result, ServerError};

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";

pub fn outcome_for_status(status: u16) -> &'static str {
    match status {
        500.. => OUTCOME_SERVER_ERROR,
        400.. => OUTCOME_CLIENT_ERROR,
        _ => OUTCOME_OK,
    }
}

pub fn record_api_request(endpoint: &str, outcome: &str, duration: Duration) {
    counter!("fhevm_api_requests_total", "endpoint" => endpoint.to_string(), "outcome" => outcome.to_string())
        .increment(1);
    histogram!("fhevm_api_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_rate_limited(endpoint: &str) {
    counter!("fhevm_api_rate_limited_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn init_prometheus_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install Prometheus recorder: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_for_status() {
        assert_eq!(outcome_for_status(200), OUTCOME_OK);
        assert_eq!(outcome_for_status(400), OUTCOME_CLIENT_ERROR);
        assert_eq!(outcome_for_status(429), OUTCOME_CLIENT_ERROR);
        assert_eq!(outcome_for_status(503), OUTCOME_SERVER_ERROR);
    }
}
