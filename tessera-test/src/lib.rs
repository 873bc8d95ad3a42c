//! Connectors and helpers for testing code built on Tessera.
//!
//! - [`MemoryConnector`] - a complete origin with an outage switch
//! - [`FailingConnector`] - every operation fails
//! - [`GatedConnector`] - holds writes back until opened
//! - [`tracing::EventCapture`] - records log events for assertions

mod failing;
mod gated;
mod memory;
pub mod tracing;

pub use failing::FailingConnector;
pub use gated::GatedConnector;
pub use memory::{ConnectorCounters, MemoryConnector, RowAddress};

use tessera_core::{FieldValue, Row};

/// Builds a row from field name and value pairs.
///
/// ```
/// let row = tessera_test::row([("id", 1i64)]);
/// assert_eq!(row.len(), 1);
/// ```
pub fn row<I, K, V>(fields: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    fields
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}
