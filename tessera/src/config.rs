//! Serde configuration for the fallback connector.
//!
//! ```yaml
//! writes: background
//! offload:
//!   max_concurrent_tasks: 128
//!   timeout: 2s
//!   timeout_policy: cancel
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::offload::{OffloadConfig, TimeoutPolicy};

/// How cache writes are carried out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Awaited before the operation returns.
    Inline,
    /// Spawned on the offload manager.
    #[default]
    Background,
}

/// What happens when a background cache write exceeds `timeout`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutAction {
    /// Cancel the write.
    #[default]
    Cancel,
    /// Log a warning and let the write finish.
    Warn,
}

/// Offload manager settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OffloadSettings {
    /// Maximum number of background writes running at once.
    pub max_concurrent_tasks: Option<usize>,
    /// Time budget of a single background write.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    /// Applied when `timeout` is exceeded.
    pub timeout_policy: TimeoutAction,
}

impl From<&OffloadSettings> for OffloadConfig {
    fn from(settings: &OffloadSettings) -> Self {
        let timeout_policy = match (settings.timeout, settings.timeout_policy) {
            (None, _) => TimeoutPolicy::None,
            (Some(timeout), TimeoutAction::Cancel) => TimeoutPolicy::Cancel(timeout),
            (Some(timeout), TimeoutAction::Warn) => TimeoutPolicy::Warn(timeout),
        };
        OffloadConfig {
            max_concurrent_tasks: settings.max_concurrent_tasks,
            timeout_policy,
        }
    }
}

/// Configuration of a [`FallbackConnector`](crate::FallbackConnector).
///
/// Only the cache-write strategy is configurable; the origin, fallback and
/// encoder are always supplied in code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    /// Cache write strategy.
    pub writes: WriteMode,
    /// Offload manager settings, used by background writes.
    pub offload: OffloadSettings,
    /// Label used in tracing and metrics.
    pub label: Option<String>,
}
