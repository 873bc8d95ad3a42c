//! Builder for [`FallbackConnector`].

use tessera_core::{ConnectorLabel, Offload};

use super::connector::FallbackConnector;
use super::writes::CacheWrites;
use crate::config::{FallbackConfig, WriteMode};
use crate::offload::{OffloadConfig, OffloadManager};

/// Builder for creating and configuring a [`FallbackConnector`].
///
/// Origin, fallback and encoder are required up front; everything else has a
/// default.
pub struct FallbackConnectorBuilder<O, F, E, D = OffloadManager> {
    origin: O,
    fallback: F,
    encoder: E,
    writes: CacheWrites<D>,
    label: ConnectorLabel,
}

impl<O, F, E> FallbackConnectorBuilder<O, F, E, OffloadManager> {
    /// Creates a builder with background writes on a default [`OffloadManager`].
    pub fn new(origin: O, fallback: F, encoder: E) -> Self {
        Self {
            origin,
            fallback,
            encoder,
            writes: CacheWrites::default(),
            label: ConnectorLabel::new_static("fallback"),
        }
    }

    /// Applies the write strategy and label from `config`.
    pub fn config(self, config: &FallbackConfig) -> Self {
        let builder = match config.writes {
            WriteMode::Inline => self.inline_writes(),
            WriteMode::Background => {
                self.offload(OffloadManager::new(OffloadConfig::from(&config.offload)))
            }
        };
        match &config.label {
            Some(label) => builder.label(ConnectorLabel::new(label.as_str())),
            None => builder,
        }
    }
}

impl<O, F, E, D> FallbackConnectorBuilder<O, F, E, D> {
    /// Awaits every cache write before the operation returns.
    pub fn inline_writes(self) -> Self {
        self.writes(CacheWrites::Inline)
    }

    /// Runs cache writes in the background on `offload`.
    pub fn offload<NewD>(self, offload: NewD) -> FallbackConnectorBuilder<O, F, E, NewD>
    where
        NewD: Offload,
    {
        self.writes(CacheWrites::Background(offload))
    }

    /// Sets the cache-write strategy.
    pub fn writes<NewD>(self, writes: CacheWrites<NewD>) -> FallbackConnectorBuilder<O, F, E, NewD> {
        FallbackConnectorBuilder {
            origin: self.origin,
            fallback: self.fallback,
            encoder: self.encoder,
            writes,
            label: self.label,
        }
    }

    /// Sets a custom label for this connector.
    ///
    /// # Default
    ///
    /// `"fallback"`
    pub fn label(mut self, label: impl Into<ConnectorLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Builds the [`FallbackConnector`].
    pub fn build(self) -> FallbackConnector<O, F, E, D> {
        FallbackConnector {
            origin: self.origin,
            fallback: self.fallback,
            encoder: self.encoder,
            writes: self.writes,
            label: self.label,
        }
    }
}
