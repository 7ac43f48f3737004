//! Prometheus metrics for the HTTP layer and the ingestion pipeline

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,

    pub http_requests_total: IntCounter,
    pub http_requests_in_flight: IntGauge,
    pub http_request_duration_seconds: Histogram,

    /// Fetch outcomes labelled `fetched`, `no_new_data`, `failed`
    pub fetch_results_total: IntCounterVec,
    pub fetch_duration_seconds: HistogramVec,

    /// Pipeline runs labelled by terminal stage
    pub pipeline_runs_total: IntCounterVec,
    pub pipeline_run_duration_seconds: Histogram,
    pub candles_appended_total: IntCounter,
    pub screen_entries: IntGauge,

    pub database_connected: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_requests_in_flight = IntGauge::new(
            "http_requests_in_flight",
            "Number of HTTP requests currently being served",
        )?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;

        let fetch_results_total = IntCounterVec::new(
            Opts::new("fetch_results_total", "Quote fetch results by outcome"),
            &["outcome"],
        )?;
        let fetch_duration_seconds = HistogramVec::new(
            HistogramOpts::new("fetch_duration_seconds", "Quote fetch latency in seconds")
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["source"],
        )?;

        let pipeline_runs_total = IntCounterVec::new(
            Opts::new("pipeline_runs_total", "Pipeline runs by terminal stage"),
            &["status"],
        )?;
        let pipeline_run_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("pipeline_run_duration_seconds", "Pipeline run duration")
                .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
        )?;
        let candles_appended_total =
            IntCounter::new("candles_appended_total", "Candles appended to storage")?;
        let screen_entries =
            IntGauge::new("screen_entries", "Securities in the current screen set")?;

        let database_connected =
            Gauge::new("database_connected", "1 when the database is connected")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(fetch_results_total.clone()))?;
        registry.register(Box::new(fetch_duration_seconds.clone()))?;
        registry.register(Box::new(pipeline_runs_total.clone()))?;
        registry.register(Box::new(pipeline_run_duration_seconds.clone()))?;
        registry.register(Box::new(candles_appended_total.clone()))?;
        registry.register(Box::new(screen_entries.clone()))?;
        registry.register(Box::new(database_connected.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_requests_in_flight,
            http_request_duration_seconds,
            fetch_results_total,
            fetch_duration_seconds,
            pipeline_runs_total,
            pipeline_run_duration_seconds,
            candles_appended_total,
            screen_entries,
            database_connected,
        })
    }

    /// Render all registered metrics in the Prometheus text format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
