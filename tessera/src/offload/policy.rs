//! Offload task policies and configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do with a background task that runs too long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Let every task run to completion.
    #[default]
    None,
    /// Abort the task once the duration has elapsed.
    Cancel(#[serde(with = "humantime_serde")] Duration),
    /// Let the task finish, then warn if it took longer than the duration.
    Warn(#[serde(with = "humantime_serde")] Duration),
}

/// Configuration for the [`OffloadManager`](super::OffloadManager).
///
/// ```
/// use std::time::Duration;
/// use tessera::offload::{OffloadConfig, TimeoutPolicy};
///
/// let config = OffloadConfig::default()
///     .max_concurrent_tasks(32)
///     .timeout(Duration::from_secs(1));
/// assert_eq!(config.timeout_policy, TimeoutPolicy::Cancel(Duration::from_secs(1)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffloadConfig {
    /// Maximum number of tasks running at the same time.
    ///
    /// Tasks spawned above the limit wait for a free slot. `None` means unlimited.
    pub max_concurrent_tasks: Option<usize>,
    /// Timeout policy for spawned tasks.
    pub timeout_policy: TimeoutPolicy,
}

impl OffloadConfig {
    /// Limits the number of concurrently running tasks.
    pub fn max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = Some(max);
        self
    }

    /// Sets the timeout policy.
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Cancels tasks running longer than `duration`.
    pub fn timeout(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Cancel(duration))
    }
}
