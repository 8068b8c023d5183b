//! Payload encoding by content format
//!
//! TLV payloads go through the TLV codec. Text and opaque payloads carry a
//! single resource value whose type comes from the object model.

use lwm2m_core::{
    ContentFormat, DataType, Lwm2mError, Lwm2mNode, Lwm2mPath, Lwm2mResult, ObjectModel, Resource,
    Value,
};
use lwm2m_tlv::{decode_node, encode_node};

/// Decode a response payload addressed at `path`
///
/// A missing content format is read as TLV.
pub fn decode(
    payload: &[u8],
    format: Option<ContentFormat>,
    path: &Lwm2mPath,
    model: &ObjectModel,
) -> Lwm2mResult<Lwm2mNode> {
    match format.unwrap_or(ContentFormat::Tlv) {
        ContentFormat::Tlv => decode_node(payload, path, model),
        ContentFormat::Text => {
            let resource_id = single_resource(path, ContentFormat::Text)?;
            let text = std::str::from_utf8(payload)
                .map_err(|e| Lwm2mError::malformed(format!("text payload is not UTF-8: {}", e)))?;
            let data_type = model.data_type(path.object_id(), resource_id);
            let value = if data_type == DataType::Opaque {
                Value::new_string(text)
            } else {
                Value::from_text(text, data_type)?
            };
            Ok(Resource::new_single(resource_id, value).into())
        }
        ContentFormat::Opaque => {
            let resource_id = single_resource(path, ContentFormat::Opaque)?;
            Ok(Resource::new_single(resource_id, Value::new_opaque(payload)).into())
        }
        other => Err(Lwm2mError::InvalidData(format!(
            "Content format {} is not supported",
            other
        ))),
    }
}

/// Encode a request payload
pub fn encode(node: &Lwm2mNode, format: ContentFormat) -> Lwm2mResult<Vec<u8>> {
    match format {
        ContentFormat::Tlv => encode_node(node),
        ContentFormat::Text => Ok(single_value(node, format)?.to_text()?.into_bytes()),
        ContentFormat::Opaque => match single_value(node, format)? {
            Value::Opaque(bytes) => Ok(bytes.clone()),
            other => Err(Lwm2mError::InvalidData(format!(
                "Opaque format needs an opaque value, got {:?}",
                other.data_type()
            ))),
        },
        other => Err(Lwm2mError::InvalidData(format!(
            "Content format {} is not supported",
            other
        ))),
    }
}

fn single_resource(path: &Lwm2mPath, format: ContentFormat) -> Lwm2mResult<u16> {
    path.resource_id().ok_or_else(|| {
        Lwm2mError::InvalidData(format!("{} payload must target a single resource, not {}", format, path))
    })
}

fn single_value(node: &Lwm2mNode, format: ContentFormat) -> Lwm2mResult<&Value> {
    node.as_resource()
        .and_then(Resource::single_value)
        .ok_or_else(|| {
            Lwm2mError::InvalidData(format!("{} payload must hold a single resource value", format))
        })
}
