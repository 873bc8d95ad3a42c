//! Fallback caching connector.
//!
//! [`FallbackConnector`] pairs an authoritative origin with a key-value
//! fallback store. See its documentation for the read, write and recovery
//! rules.

mod builder;
mod connector;
mod key;
mod schema;
mod writes;

pub use builder::FallbackConnectorBuilder;
pub use connector::FallbackConnector;
pub use key::{RangeQuery, RangeResults, cache_key};
pub use schema::{KEY_COLUMN, VALUE_COLUMN, key_value_entity};
pub use writes::CacheWrites;
