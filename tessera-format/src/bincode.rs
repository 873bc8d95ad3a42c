use tessera_core::Raw;

use super::{DecodeTarget, Format, FormatError, FormatTypeId};

/// Bincode format, standard configuration.
///
/// Not self-describing: values must be decoded into the exact type they were
/// encoded from. Encoding is deterministic for deterministic inputs, which
/// makes it suitable for cache keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl Format for BincodeFormat {
    fn encode_value(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError> {
        ::bincode::serde::encode_to_vec(value, ::bincode::config::standard())
            .map(Raw::from)
            .map_err(FormatError::serialize)
    }

    fn decode_into(&self, data: &[u8], target: &mut dyn DecodeTarget) -> Result<(), FormatError> {
        target.from_bincode(data)
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Bincode
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }
}
