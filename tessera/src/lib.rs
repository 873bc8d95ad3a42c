#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Tessera
//!
//! A pluggable data-access layer. Stores implement the
//! [`Connector`](tessera_core::Connector) trait; connectors can wrap other
//! connectors to add behavior without the caller noticing.
//!
//! This crate provides the [`FallbackConnector`]: an origin connector is the
//! source of truth, and a second connector keeps a key-value copy of the rows
//! and pages the origin returned. When the origin fails a read, the copy is
//! served instead.
//!
//! ## Crates
//!
//! - `tessera-core` - entity model, [`Connector`](tessera_core::Connector) and
//!   [`Offload`](tessera_core::Offload) traits
//! - `tessera-format` - encoders for cache keys and values
//! - `tessera-moka` - bounded in-memory key-value connector, a good fallback
//! - `tessera-test` - connectors for tests
//!
//! ## Quick start
//!
//! ```
//! use tessera::{Connector, EntityDefinition, EntityInfo, EntityRef, FallbackConnector, Fields, Row, Type};
//! use tessera_format::BincodeFormat;
//! use tessera_moka::MokaConnector;
//! use tessera_test::MemoryConnector;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let entity = EntityInfo::new(
//!     EntityRef::new("shop", "catalog"),
//!     EntityDefinition::new("item")
//!         .partition_key("sku")
//!         .column("sku", Type::String)
//!         .column("title", Type::String),
//! );
//!
//! let origin = MemoryConnector::new();
//! let fallback = MokaConnector::builder().max_entries(1_000).build();
//! let connector = FallbackConnector::builder(origin.clone(), fallback, BincodeFormat)
//!     .inline_writes()
//!     .build();
//!
//! let item = Row::from([
//!     ("sku".to_string(), "A-1".into()),
//!     ("title".to_string(), "Lamp".into()),
//! ]);
//! connector.upsert(&entity, &item).await.unwrap();
//!
//! // The origin goes away, the fallback still answers.
//! origin.set_available(false);
//! let keys = Row::from([("sku".to_string(), "A-1".into())]);
//! let found = connector.read(&entity, &keys, &Fields::All).await.unwrap();
//! assert_eq!(found, item);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod offload;

pub use config::{FallbackConfig, OffloadSettings, TimeoutAction, WriteMode};
pub use error::CacheWriteError;
pub use fallback::{CacheWrites, FallbackConnector, FallbackConnectorBuilder};
pub use offload::{OffloadConfig, OffloadManager, TimeoutPolicy};

pub use tessera_core::{
    ColumnConditions, Condition, Connector, ConnectorError, ConnectorLabel, ConnectorResult,
    EntityDefinition, EntityInfo, EntityRef, FieldValue, Fields, Offload, Operator, Page, Row,
    Type,
};
