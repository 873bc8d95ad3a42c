//! Moka connector capacity metrics.
//!
//! Enable the `metrics` feature to use these metrics.
//!
//! ## Metrics
//!
//! - `tessera_moka_entries` - Current number of rows in the store (gauge)
//! - `tessera_moka_size_bytes` - Current weighted size in bytes (gauge)
//!
//! Both metrics include a `connector` label to distinguish between multiple Moka instances.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for row count gauge.
    pub static ref MOKA_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "tessera_moka_entries",
            "Current number of rows in the Moka connector."
        );
        "tessera_moka_entries"
    };

    /// Metric name for weighted size gauge.
    pub static ref MOKA_SIZE_BYTES: &'static str = {
        metrics::describe_gauge!(
            "tessera_moka_size_bytes",
            "Current weighted size of the Moka connector in bytes."
        );
        "tessera_moka_size_bytes"
    };
}

/// Record current store capacity metrics.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_capacity(connector: &str, entries: u64, size_bytes: u64) {
    metrics::gauge!(*MOKA_ENTRIES, "connector" => connector.to_string()).set(entries as f64);
    metrics::gauge!(*MOKA_SIZE_BYTES, "connector" => connector.to_string()).set(size_bytes as f64);
}

/// Record current store capacity metrics (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_capacity(_connector: &str, _entries: u64, _size_bytes: u64) {}
