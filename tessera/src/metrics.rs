//! Metrics declaration and recording.
//!
//! Enable the `metrics` feature to emit these through the [`metrics`] facade.
//! Without it every `record_*` function compiles to nothing.
//!
//! ## Metrics
//!
//! - `tessera_fallback_recovery_total` - Origin failures answered (`outcome="hit"`)
//!   or not (`outcome="miss"`) from the fallback (counter)
//! - `tessera_cache_write_total` - Cache writes by `kind` and `status` (counter)
//! - `tessera_offload_tasks_spawned_total` - Background tasks spawned (counter)
//! - `tessera_offload_tasks_completed_total` - Background tasks completed (counter)
//! - `tessera_offload_tasks_timeout_total` - Background tasks cancelled by timeout (counter)
//! - `tessera_offload_tasks_active` - Background tasks in flight (gauge)
//! - `tessera_offload_task_duration_seconds` - Background task run time (histogram)

use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track fallback consultations after an origin failure.
    pub static ref FALLBACK_RECOVERY_COUNTER: &'static str = {
        metrics::describe_counter!(
            "tessera_fallback_recovery_total",
            "Total number of fallback consultations after an origin failure."
        );
        "tessera_fallback_recovery_total"
    };
    /// Track cache writes to the fallback store.
    pub static ref CACHE_WRITE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "tessera_cache_write_total",
            "Total number of cache writes to the fallback store."
        );
        "tessera_cache_write_total"
    };

    // Offload manager metrics

    /// Track number of offload tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "tessera_offload_tasks_spawned_total",
            "Total number of offload tasks spawned."
        );
        "tessera_offload_tasks_spawned_total"
    };
    /// Track number of offload tasks completed.
    pub static ref OFFLOAD_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "tessera_offload_tasks_completed_total",
            "Total number of offload tasks completed."
        );
        "tessera_offload_tasks_completed_total"
    };
    /// Track number of offload tasks cancelled by timeout.
    pub static ref OFFLOAD_TASKS_TIMEOUT: &'static str = {
        metrics::describe_counter!(
            "tessera_offload_tasks_timeout_total",
            "Total number of offload tasks cancelled due to timeout."
        );
        "tessera_offload_tasks_timeout_total"
    };
    /// Current number of active offload tasks.
    pub static ref OFFLOAD_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "tessera_offload_tasks_active",
            "Current number of active offload tasks."
        );
        "tessera_offload_tasks_active"
    };
    /// Histogram of offload task duration.
    pub static ref OFFLOAD_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "tessera_offload_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of offload tasks in seconds."
        );
        "tessera_offload_task_duration_seconds"
    };
}

/// Record the outcome of a fallback consultation.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_fallback_recovery(connector: &str, operation: &'static str, hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    metrics::counter!(
        *FALLBACK_RECOVERY_COUNTER,
        "connector" => connector.to_string(),
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the outcome of a fallback consultation (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fallback_recovery(_connector: &str, _operation: &'static str, _hit: bool) {}

/// Record a finished cache write.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_cache_write(connector: &str, kind: &'static str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(
        *CACHE_WRITE_COUNTER,
        "connector" => connector.to_string(),
        "kind" => kind,
        "status" => status
    )
    .increment(1);
}

/// Record a finished cache write (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_cache_write(_connector: &str, _kind: &'static str, _ok: bool) {}

/// Record a spawned offload task.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_offload_spawned(kind: &str) {
    metrics::counter!(*OFFLOAD_TASKS_SPAWNED, "kind" => kind.to_string()).increment(1);
    metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => kind.to_string()).increment(1.0);
}

/// Record a spawned offload task (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_offload_spawned(_kind: &str) {}

/// Record a finished offload task; `completed` is false when it timed out.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_offload_finished(kind: &str, elapsed: Duration, completed: bool) {
    let name = if completed {
        *OFFLOAD_TASKS_COMPLETED
    } else {
        *OFFLOAD_TASKS_TIMEOUT
    };
    metrics::counter!(name, "kind" => kind.to_string()).increment(1);
    metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => kind.to_string()).decrement(1.0);
    metrics::histogram!(*OFFLOAD_TASK_DURATION, "kind" => kind.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record a finished offload task (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_offload_finished(_kind: &str, _elapsed: Duration, _completed: bool) {}
