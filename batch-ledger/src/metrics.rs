//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `batch_ledger_operations_total` - Operations by name and outcome
//! - `batch_ledger_batches_created_total` - Batches created
//! - `batch_ledger_events_total` - Events committed
//! - `batch_ledger_operation_duration_seconds` - Histogram of operation latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Operations by `operation` and `outcome` label
    pub operations_total: IntCounterVec,

    /// Total batches created
    pub batches_created: IntCounter,

    /// Total events committed
    pub events_total: IntCounter,

    /// Operation duration histogram
    pub operation_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("batches_created", &self.batches_created.get())
            .field("events_total", &self.events_total.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new(
                "batch_ledger_operations_total",
                "Ledger operations by name and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let batches_created = IntCounter::new(
            "batch_ledger_batches_created_total",
            "Total number of batches created",
        )?;
        registry.register(Box::new(batches_created.clone()))?;

        let events_total =
            IntCounter::new("batch_ledger_events_total", "Total number of events committed")?;
        registry.register(Box::new(events_total.clone()))?;

        let operation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "batch_ledger_operation_duration_seconds",
                "Histogram of operation latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250]),
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            operations_total,
            batches_created,
            events_total,
            operation_duration,
            registry,
        })
    }

    /// Record a completed operation.
    ///
    /// `outcome` is `"ok"` or the error's wire code / `"fault"`.
    pub fn record_operation(&self, operation: &str, outcome: &str, duration_seconds: f64) {
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.operation_duration.observe(duration_seconds);
    }

    /// Record batch creation
    pub fn record_batch_created(&self) {
        self.batches_created.inc();
    }

    /// Record event commit
    pub fn record_event(&self) {
        self.events_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
