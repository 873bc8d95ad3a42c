use tessera_core::Raw;

use super::{DecodeTarget, Format, FormatError, FormatTypeId};

/// JSON format.
///
/// Self-describing and human readable; map keys must serialize as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn encode_value(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError> {
        serde_json::to_vec(value)
            .map(Raw::from)
            .map_err(FormatError::serialize)
    }

    fn decode_into(&self, data: &[u8], target: &mut dyn DecodeTarget) -> Result<(), FormatError> {
        let mut deserializer = serde_json::Deserializer::from_slice(data);
        target.from_serde(&mut <dyn erased_serde::Deserializer>::erase(&mut deserializer))?;
        deserializer.end().map_err(FormatError::deserialize)
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Json
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }
}
