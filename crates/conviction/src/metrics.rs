use anyhow::Result;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

pub fn describe() {
    describe_counter!(
        "conviction_cache_hits_total",
        "Cache lookups served from a live entry."
    );
    describe_counter!(
        "conviction_cache_misses_total",
        "Cache lookups that triggered a compute."
    );
    describe_counter!(
        "conviction_cache_waits_total",
        "Cache lookups that waited on an in-flight compute."
    );
    describe_counter!(
        "conviction_cache_invalidations_total",
        "Cache entries removed by explicit invalidation."
    );
    describe_counter!(
        "conviction_api_requests_total",
        "Outbound provider requests made."
    );
    describe_counter!(
        "conviction_api_errors_total",
        "Outbound provider requests that failed, by error kind."
    );
    describe_histogram!(
        "conviction_api_latency_ms",
        "Outbound provider request latency in milliseconds."
    );
    describe_counter!(
        "conviction_provider_fallbacks_total",
        "Lookups that fell back from the primary market-data provider."
    );
    describe_counter!(
        "tracing_error_events",
        "Error-level tracing events emitted."
    );
}

pub fn install_prometheus(port: u16) -> Result<PrometheusHandle> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    Ok(PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()?)
}
