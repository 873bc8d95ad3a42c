//! Encoders turning structured values into opaque bytes and back.
//!
//! [`Format`] is object safe so connectors can hold a `Box<dyn Format>` or an
//! `Arc<dyn Format>` picked at runtime. Typed encoding goes through the
//! [`FormatExt`] extension trait, which every `Format` gets for free.
//!
//! Two formats ship with the crate:
//!
//! - [`BincodeFormat`] - compact binary encoding
//! - [`JsonFormat`] - self-describing structured encoding
//!
//! ```
//! use tessera_format::{FormatExt, JsonFormat};
//!
//! let bytes = JsonFormat.encode(&vec![1u32, 2, 3]).unwrap();
//! let back: Vec<u32> = JsonFormat.decode(&bytes).unwrap();
//! assert_eq!(back, vec![1, 2, 3]);
//! ```

use std::error::Error as StdError;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tessera_core::{ConnectorError, Raw};
use thiserror::Error;

mod bincode;
mod json;

pub use self::bincode::BincodeFormat;
pub use erased_serde;
pub use json::JsonFormat;

/// Encoding or decoding failure.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The value could not be encoded.
    #[error("encoding failed: {0}")]
    Serialize(Box<dyn StdError + Send + Sync>),

    /// The bytes could not be decoded into the requested type.
    #[error("decoding failed: {0}")]
    Deserialize(Box<dyn StdError + Send + Sync>),
}

impl FormatError {
    /// Wraps an encoder error.
    pub fn serialize(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Serialize(error.into())
    }

    /// Wraps a decoder error.
    pub fn deserialize(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Deserialize(error.into())
    }
}

impl From<FormatError> for ConnectorError {
    fn from(error: FormatError) -> Self {
        Self::Internal(Box::new(error))
    }
}

/// Identifies a format, used to compare formats behind trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTypeId {
    /// [`JsonFormat`].
    Json,
    /// [`BincodeFormat`].
    Bincode,
    /// A user-defined format. The string should be unique.
    Custom(&'static str),
}

/// Typed destination of a decode.
///
/// A [`Format`] only sees this erased view of the caller's type and hands it
/// its input in whichever shape the format produces.
pub trait DecodeTarget {
    /// Reads the value from a self-describing serde deserializer.
    fn from_serde(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), FormatError>;

    /// Reads the value from bytes in bincode's standard configuration.
    fn from_bincode(&mut self, data: &[u8]) -> Result<(), FormatError>;
}

struct Slot<T>(Option<T>);

impl<T> DecodeTarget for Slot<T>
where
    T: DeserializeOwned,
{
    fn from_serde(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), FormatError> {
        self.0 = Some(erased_serde::deserialize(deserializer).map_err(FormatError::deserialize)?);
        Ok(())
    }

    fn from_bincode(&mut self, data: &[u8]) -> Result<(), FormatError> {
        let (value, read) =
            ::bincode::serde::decode_from_slice(data, ::bincode::config::standard())
                .map_err(FormatError::deserialize)?;
        if read != data.len() {
            return Err(FormatError::deserialize(format!(
                "{} trailing bytes after value",
                data.len() - read
            )));
        }
        self.0 = Some(value);
        Ok(())
    }
}

/// Object-safe encoder.
pub trait Format: Debug + Send + Sync {
    /// Encodes a type-erased value.
    fn encode_value(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError>;

    /// Decodes `data` into `target`.
    fn decode_into(&self, data: &[u8], target: &mut dyn DecodeTarget) -> Result<(), FormatError>;

    /// Returns the identifier of this format.
    fn format_type_id(&self) -> FormatTypeId;

    /// Clones this format into a box.
    fn clone_box(&self) -> Box<dyn Format>;
}

/// Typed encoding for every [`Format`].
pub trait FormatExt: Format {
    /// Encodes `value`.
    fn encode<T>(&self, value: &T) -> Result<Raw, FormatError>
    where
        T: Serialize,
    {
        self.encode_value(value)
    }

    /// Decodes a `T` from `data`.
    fn decode<T>(&self, data: &[u8]) -> Result<T, FormatError>
    where
        T: DeserializeOwned,
    {
        let mut slot = Slot(None);
        self.decode_into(data, &mut slot)?;
        slot.0
            .ok_or_else(|| FormatError::deserialize("format produced no value"))
    }
}

impl<T: Format + ?Sized> FormatExt for T {}

impl Clone for Box<dyn Format> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl Format for Box<dyn Format> {
    fn encode_value(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError> {
        (**self).encode_value(value)
    }

    fn decode_into(&self, data: &[u8], target: &mut dyn DecodeTarget) -> Result<(), FormatError> {
        (**self).decode_into(data, target)
    }

    fn format_type_id(&self) -> FormatTypeId {
        (**self).format_type_id()
    }

    fn clone_box(&self) -> Box<dyn Format> {
        (**self).clone_box()
    }
}

impl Format for Arc<dyn Format> {
    fn encode_value(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError> {
        (**self).encode_value(value)
    }

    fn decode_into(&self, data: &[u8], target: &mut dyn DecodeTarget) -> Result<(), FormatError> {
        (**self).decode_into(data, target)
    }

    fn format_type_id(&self) -> FormatTypeId {
        (**self).format_type_id()
    }

    fn clone_box(&self) -> Box<dyn Format> {
        (**self).clone_box()
    }
}
