//! Prometheus metrics (feature `metrics`) and tracing spans (feature `tracing`).

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics::SdkMeterProvider;
#[cfg(feature = "metrics")]
use prometheus::{Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::time::Duration;

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<MergeMetrics> = Lazy::new(MergeMetrics::init);

#[cfg(feature = "metrics")]
pub struct MergeMetrics {
    pub registry: Registry,
    // Holds the Prometheus reader
    _provider: SdkMeterProvider,
    pub views_compiled: Counter<u64>,
    pub rows_decoded: Counter<u64>,
    pub queries_total: Counter<u64>,
    pub query_errors: Counter<u64>,
    pub query_duration: Histogram<f64>,
    pub connection_wait: Histogram<f64>,
}

#[cfg(feature = "metrics")]
impl MergeMetrics {
    pub fn init() -> Self {
        let registry = Registry::new();
        let provider = match opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
        {
            Ok(exporter) => SdkMeterProvider::builder().with_reader(exporter).build(),
            Err(e) => {
                log::warn!("Failed to build prometheus exporter, metrics will not be exported: {e}");
                SdkMeterProvider::builder().build()
            }
        };
        let meter = provider.meter("merged_relations");

        let views_compiled = meter
            .u64_counter("merged_relations_views_compiled_total")
            .with_description("Merged views compiled")
            .build();

        let rows_decoded = meter
            .u64_counter("merged_relations_rows_decoded_total")
            .with_description("Merged-view rows decoded into models")
            .build();

        let queries_total = meter
            .u64_counter("merged_relations_queries_total")
            .with_description("Total queries executed")
            .build();

        let query_errors = meter
            .u64_counter("merged_relations_query_errors_total")
            .with_description("Queries that returned an engine error")
            .build();

        let query_duration = meter
            .f64_histogram("merged_relations_query_duration_seconds")
            .with_description("Duration of queries")
            .build();

        let connection_wait = meter
            .f64_histogram("merged_relations_connection_wait_seconds")
            .with_description("Time spent establishing connections")
            .build();

        Self {
            registry,
            _provider: provider,
            views_compiled,
            rows_decoded,
            queries_total,
            query_errors,
            query_duration,
            connection_wait,
        }
    }

    pub fn record_view_compiled(&self) {
        self.views_compiled.add(1, &[]);
    }

    pub fn record_rows_decoded(&self, rows: u64) {
        self.rows_decoded.add(rows, &[]);
    }

    pub fn record_query_duration(&self, elapsed: Duration) {
        self.queries_total.add(1, &[]);
        self.query_duration.record(elapsed.as_secs_f64(), &[]);
    }

    pub fn record_query_error(&self) {
        self.query_errors.add(1, &[]);
    }

    pub fn record_connection_wait(&self, elapsed: Duration) {
        self.connection_wait.record(elapsed.as_secs_f64(), &[]);
    }

    /// Current metrics in the Prometheus text format
    pub fn render(&self) -> String {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap_or_else(|e| {
                log::warn!("Failed to encode metrics: {e}");
                String::new()
            })
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{debug_span, info_span, Span};

    pub fn compile_view_span(view: &str, branches: usize) -> Span {
        info_span!("merged_relations.compile_view", view = %view, branches = branches)
    }

    pub fn execute_query_span(sql: &str) -> Span {
        debug_span!("merged_relations.execute_query", db.statement = %sql)
    }

    pub fn acquire_connection_span() -> Span {
        info_span!("merged_relations.acquire_connection")
    }
}
