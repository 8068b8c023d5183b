//! Mapping between TLV entries and the resource tree

use crate::decoder::TlvDecoder;
use crate::encoder::TlvEncoder;
use crate::types::{Tlv, TlvType};
use crate::value::{decode_value, encode_value};
use lwm2m_core::{
    Lwm2mError, Lwm2mNode, Lwm2mPath, Lwm2mResult, Object, ObjectInstance, ObjectModel, Resource,
    ResourceValue,
};
use std::collections::BTreeMap;

/// Encode a node to TLV
///
/// An object is written as its instances one after the other, an object
/// instance as one object instance entry wrapping its resources, a multiple
/// resource as one multiple resource entry wrapping its instances in
/// ascending index order.
pub fn encode_node(node: &Lwm2mNode) -> Lwm2mResult<Vec<u8>> {
    let entries = match node {
        Lwm2mNode::Object(object) => object.instances.values().map(instance_to_tlv).collect(),
        Lwm2mNode::ObjectInstance(instance) => vec![instance_to_tlv(instance)],
        Lwm2mNode::Resource(resource) => vec![resource_to_tlv(resource)],
    };
    let mut encoder = TlvEncoder::new();
    encoder.encode_all(&entries)?;
    Ok(encoder.into_vec())
}

/// Decode a TLV payload addressed at `path`
///
/// The path tells what the payload must contain: a resource path expects one
/// resource entry with that id, an instance path expects either one object
/// instance entry with that id or the bare resource entries of the
/// instance, and an object path expects object instance entries. Leaf values
/// are typed from `model`; resources it does not describe decode as opaque.
pub fn decode_node(bytes: &[u8], path: &Lwm2mPath, model: &ObjectModel) -> Lwm2mResult<Lwm2mNode> {
    let entries = TlvDecoder::decode(bytes)?;
    let object_id = path.object_id();

    match (path.object_instance_id(), path.resource_id()) {
        (Some(_), Some(resource_id)) => {
            let [entry] = entries.as_slice() else {
                return Err(Lwm2mError::malformed(format!(
                    "expected one resource entry for {}, found {}",
                    path,
                    entries.len()
                )));
            };
            if entry.identifier != resource_id {
                return Err(Lwm2mError::malformed(format!(
                    "resource {} does not match requested path {}",
                    entry.identifier, path
                )));
            }
            Ok(Lwm2mNode::Resource(tlv_to_resource(entry, object_id, model)?))
        }
        (Some(instance_id), None) => {
            let instance = match entries.as_slice() {
                [entry] if entry.kind == TlvType::ObjectInstance => {
                    if entry.identifier != instance_id {
                        return Err(Lwm2mError::malformed(format!(
                            "object instance {} does not match requested path {}",
                            entry.identifier, path
                        )));
                    }
                    tlv_to_instance(entry, object_id, model)?
                }
                _ => ObjectInstance {
                    id: instance_id,
                    resources: resources_from(&entries, object_id, model)?,
                },
            };
            Ok(Lwm2mNode::ObjectInstance(instance))
        }
        (None, _) => {
            let instances = entries
                .iter()
                .map(|entry| tlv_to_instance(entry, object_id, model))
                .collect::<Lwm2mResult<Vec<_>>>()?;
            Ok(Lwm2mNode::Object(Object::new(object_id, instances)))
        }
    }
}

fn resource_to_tlv(resource: &Resource) -> Tlv {
    match &resource.value {
        ResourceValue::Single(value) => Tlv::resource_value(resource.id, encode_value(value)),
        ResourceValue::Multiple(values) => Tlv::multiple_resource(
            resource.id,
            values
                .iter()
                .map(|(index, value)| Tlv::resource_instance(*index, encode_value(value)))
                .collect(),
        ),
    }
}

fn instance_to_tlv(instance: &ObjectInstance) -> Tlv {
    Tlv::object_instance(instance.id, instance.resources.values().map(resource_to_tlv).collect())
}

fn tlv_to_resource(entry: &Tlv, object_id: u16, model: &ObjectModel) -> Lwm2mResult<Resource> {
    let data_type = model.data_type(object_id, entry.identifier);
    match (entry.kind, entry.value(), entry.children()) {
        (TlvType::ResourceValue, Some(bytes), _) => {
            Ok(Resource::new_single(entry.identifier, decode_value(bytes, data_type)?))
        }
        (TlvType::MultipleResource, _, Some(children)) => {
            let mut values = BTreeMap::new();
            for child in children {
                let bytes = child.value().ok_or_else(|| {
                    Lwm2mError::malformed(format!("resource instance {} has no value", child.identifier))
                })?;
                if values.insert(child.identifier, decode_value(bytes, data_type)?).is_some() {
                    return Err(Lwm2mError::malformed(format!(
                        "duplicate resource instance {} in resource {}",
                        child.identifier, entry.identifier
                    )));
                }
            }
            Ok(Resource {
                id: entry.identifier,
                value: ResourceValue::Multiple(values),
            })
        }
        (kind, _, _) => Err(Lwm2mError::malformed(format!(
            "expected a resource, found {:?} {}",
            kind, entry.identifier
        ))),
    }
}

fn resources_from(entries: &[Tlv], object_id: u16, model: &ObjectModel) -> Lwm2mResult<BTreeMap<u16, Resource>> {
    let mut resources = BTreeMap::new();
    for entry in entries {
        let resource = tlv_to_resource(entry, object_id, model)?;
        if resources.insert(resource.id, resource).is_some() {
            return Err(Lwm2mError::malformed(format!("duplicate resource {}", entry.identifier)));
        }
    }
    Ok(resources)
}

fn tlv_to_instance(entry: &Tlv, object_id: u16, model: &ObjectModel) -> Lwm2mResult<ObjectInstance> {
    match (entry.kind, entry.children()) {
        (TlvType::ObjectInstance, Some(children)) => Ok(ObjectInstance {
            id: entry.identifier,
            resources: resources_from(children, object_id, model)?,
        }),
        (kind, _) => Err(Lwm2mError::malformed(format!(
            "expected an object instance, found {:?} {}",
            kind, entry.identifier
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_core::Value;

    fn device_instance() -> ObjectInstance {
        ObjectInstance::new(
            0,
            vec![
                Resource::new_single(0, Value::new_string("Open Mobile Alliance")),
                Resource::new_single(1, Value::new_string("Lightweight M2M Client")),
                Resource::new_multiple(6, vec![(0, Value::new_integer(1)), (1, Value::new_integer(5))]),
                Resource::new_single(9, Value::new_integer(100)),
                Resource::new_multiple(11, vec![(0, Value::new_integer(0))]),
                Resource::new_single(13, Value::new_time(1_367_491_215)),
                Resource::new_single(14, Value::new_string("+02:00")),
            ],
        )
    }

    #[test]
    fn test_single_instance_single_resource() {
        let instance = ObjectInstance::new(0, vec![Resource::new_single(14, Value::new_string("value"))]);
        let bytes = encode_node(&Lwm2mNode::ObjectInstance(instance.clone())).unwrap();
        assert_eq!(bytes, vec![0x07, 0x00, 0xC5, 0x0E, b'v', b'a', b'l', b'u', b'e']);

        let decoded = decode_node(&bytes, &Lwm2mPath::object_instance(3, 0), &ObjectModel::default()).unwrap();
        assert_eq!(decoded, Lwm2mNode::ObjectInstance(instance));
    }

    #[test]
    fn test_device_instance_round_trip() {
        let model = ObjectModel::default();
        let node = Lwm2mNode::ObjectInstance(device_instance());
        let bytes = encode_node(&node).unwrap();
        let decoded = decode_node(&bytes, &Lwm2mPath::object_instance(3, 0), &model).unwrap();
        assert_eq!(decoded, node);
        assert_eq!(encode_node(&decoded).unwrap(), bytes);
    }

    #[test]
    fn test_object_round_trip() {
        let model = ObjectModel::default();
        let object = Object::new(
            1,
            vec![
                ObjectInstance::new(0, vec![Resource::new_single(1, Value::new_integer(86400))]),
                ObjectInstance::new(7, vec![Resource::new_single(7, Value::new_string("UQ"))]),
            ],
        );
        let node = Lwm2mNode::Object(object);
        let bytes = encode_node(&node).unwrap();
        assert_eq!(decode_node(&bytes, &Lwm2mPath::object(1), &model).unwrap(), node);
    }

    #[test]
    fn test_instance_path_accepts_bare_resources() {
        let mut encoder = TlvEncoder::new();
        encoder
            .encode_all(&[
                Tlv::resource_value(0, b"acme".to_vec()),
                Tlv::resource_value(9, vec![0x50]),
            ])
            .unwrap();
        let decoded = decode_node(&encoder.into_vec(), &Lwm2mPath::object_instance(3, 2), &ObjectModel::default())
            .unwrap();
        let instance = decoded.as_object_instance().unwrap();
        assert_eq!(instance.id, 2);
        assert_eq!(instance.resource(9).unwrap().single_value(), Some(&Value::Integer(80)));
    }

    #[test]
    fn test_resource_path() {
        let model = ObjectModel::default();
        let resource = Resource::new_multiple(7, vec![(0, Value::new_integer(3800)), (4, Value::new_integer(5000))]);
        let bytes = encode_node(&Lwm2mNode::Resource(resource.clone())).unwrap();
        let decoded = decode_node(&bytes, &Lwm2mPath::resource(3, 0, 7), &model).unwrap();
        assert_eq!(decoded, Lwm2mNode::Resource(resource));

        assert!(decode_node(&bytes, &Lwm2mPath::resource(3, 0, 8), &model).is_err());
    }

    #[test]
    fn test_unknown_resources_decode_as_opaque() {
        let resource = Resource::new_single(0, Value::new_opaque(vec![0xCA, 0xFE]));
        let bytes = encode_node(&Lwm2mNode::Resource(resource.clone())).unwrap();
        let decoded = decode_node(&bytes, &Lwm2mPath::resource(4242, 0, 0), &ObjectModel::empty()).unwrap();
        assert_eq!(decoded, Lwm2mNode::Resource(resource));
    }

    fn assert_round_trip(node: Lwm2mNode, path: Lwm2mPath) -> Vec<u8> {
        let model = ObjectModel::default();
        let bytes = encode_node(&node).unwrap();
        let decoded = decode_node(&bytes, &path, &model).unwrap();
        assert_eq!(decoded, node);
        assert_eq!(encode_node(&decoded).unwrap(), bytes);
        bytes
    }

    #[test]
    fn test_location_floats_keep_their_width() {
        let location = ObjectInstance::new(
            0,
            vec![
                Resource::new_single(0, Value::new_float(1.5)),
                Resource::new_single(1, Value::new_float(0.1)),
                Resource::new_single(5, Value::new_time(1_700_000_000)),
            ],
        );
        let bytes = assert_round_trip(Lwm2mNode::ObjectInstance(location), Lwm2mPath::object_instance(6, 0));
        // 1.5 fits a single precision float, 0.1 does not
        assert_eq!(&bytes[..3], &[0x08, 0x00, 22]);
        assert_eq!(&bytes[3..9], &[0xC4, 0x00, 0x3F, 0xC0, 0x00, 0x00]);
        assert_eq!(&bytes[9..11], &[0xC8, 0x01]);

        let bytes = assert_round_trip(
            Lwm2mNode::Resource(Resource::new_single(0, Value::new_float(-33.8688))),
            Lwm2mPath::resource(6, 0, 0),
        );
        assert_eq!(bytes.len(), 2 + 8);
    }

    #[test]
    fn test_boolean_round_trip() {
        let server = ObjectInstance::new(
            1,
            vec![
                Resource::new_single(1, Value::new_integer(300)),
                Resource::new_single(6, Value::new_bool(true)),
                Resource::new_single(7, Value::new_string("U")),
            ],
        );
        assert_round_trip(Lwm2mNode::ObjectInstance(server), Lwm2mPath::object_instance(1, 1));

        let bytes = assert_round_trip(
            Lwm2mNode::Resource(Resource::new_single(6, Value::new_bool(false))),
            Lwm2mPath::resource(1, 1, 6),
        );
        assert_eq!(bytes, vec![0xC1, 0x06, 0x00]);
    }

    #[test]
    fn test_firmware_package_round_trip() {
        let package: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let bytes = assert_round_trip(
            Lwm2mNode::Resource(Resource::new_single(0, Value::new_opaque(package))),
            Lwm2mPath::resource(5, 0, 0),
        );
        // 300 bytes need a two byte length
        assert_eq!(&bytes[..4], &[0xD0, 0x00, 0x01, 0x2C]);
    }

    #[test]
    fn test_wide_resource_ids_round_trip() {
        let instance = ObjectInstance::new(
            0,
            vec![
                Resource::new_single(9, Value::new_integer(42)),
                Resource::new_single(300, Value::new_opaque(vec![0x01, 0x02])),
                Resource::new_multiple(
                    1000,
                    vec![(0, Value::new_opaque(vec![0xAA])), (700, Value::new_opaque(vec![0xBB]))],
                ),
            ],
        );
        let bytes = assert_round_trip(Lwm2mNode::ObjectInstance(instance), Lwm2mPath::object_instance(3, 0));
        assert_eq!(&bytes[6..12], &[0xE2, 0x01, 0x2C, 0x01, 0x02, 0xA7]);
        assert_eq!(&bytes[14..], &[0x41, 0x00, 0xAA, 0x61, 0x02, 0xBC, 0xBB]);
    }

    #[test]
    fn test_type_mismatch_is_malformed() {
        // 3-byte value for an integer resource
        let err = decode_node(&[0xC3, 0x09, 0x00, 0x00, 0x01], &Lwm2mPath::resource(3, 0, 9), &ObjectModel::default())
            .unwrap_err();
        assert!(matches!(err, Lwm2mError::MalformedPayload(_)));
    }

    #[test]
    fn test_object_path_rejects_bare_resources() {
        let bytes = encode_node(&Lwm2mNode::Resource(Resource::new_single(0, Value::new_string("x")))).unwrap();
        assert!(decode_node(&bytes, &Lwm2mPath::object(3), &ObjectModel::default()).is_err());
    }
}
