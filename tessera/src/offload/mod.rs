//! Background execution of cache writes.
//!
//! The fallback connector hands every cache write that must not delay the
//! caller to an [`Offload`](tessera_core::Offload) implementation.
//! [`OffloadManager`] is the tokio-based one: it tracks spawned tasks so they
//! can be awaited on shutdown, bounds how many run at once and applies a
//! timeout policy to each of them.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tessera::offload::{OffloadConfig, OffloadManager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = OffloadManager::new(
//!     OffloadConfig::default()
//!         .max_concurrent_tasks(64)
//!         .timeout(Duration::from_secs(5)),
//! );
//!
//! manager.spawn("cache_upsert", async {
//!     // write to the fallback store
//! });
//! manager.wait_all().await;
//! # }
//! ```

mod manager;
mod policy;

pub use manager::{OffloadHandle, OffloadKey, OffloadManager};
pub use policy::{OffloadConfig, TimeoutPolicy};
