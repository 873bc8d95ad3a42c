//! In-memory key-value connector for Tessera, powered by [Moka](https://docs.rs/moka).
//!
//! [`MokaConnector`] keeps whole rows in a bounded concurrent cache, addressed
//! by entity and primary key. It has no ordering, so `range` is unsupported,
//! which makes it a natural store for fallback caches that only ever need
//! single-key reads and writes.
//!
//! ```
//! use tessera_moka::MokaConnector;
//!
//! let connector = MokaConnector::builder().max_entries(10_000).build();
//! # let _ = connector;
//! ```

mod builder;
mod connector;
pub mod metrics;

pub use builder::{ByteCapacity, EntryCapacity, MokaConnectorBuilder, NoCapacity};
pub use connector::{MokaConnector, StoreKey};
pub use moka::policy::EvictionPolicy;
