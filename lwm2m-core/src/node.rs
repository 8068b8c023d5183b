//! Resource tree model
//!
//! In-memory representation of the values exchanged with devices. An
//! [`Object`] holds [`ObjectInstance`]s, an instance holds [`Resource`]s, and a
//! resource holds either one [`Value`] or an ordered set of resource
//! instances (index → value). Identifiers are unsigned; resource instance
//! indices are unique within a resource but need not be contiguous.

use crate::error::{Lwm2mError, Lwm2mResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Semantic type of a resource value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    Opaque,
    /// Seconds since the Unix epoch
    Time,
}

/// A single resource value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Opaque(#[serde(with = "serde_bytes")] Vec<u8>),
    Time(i64),
}

impl Value {
    /// UTF-8 text
    pub fn new_string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    /// Signed integer, encoded in 1, 2, 4 or 8 bytes
    pub fn new_integer(value: i64) -> Self {
        Value::Integer(value)
    }

    /// Floating point number, encoded in 4 bytes when no precision is lost
    pub fn new_float(value: f64) -> Self {
        Value::Float(value)
    }

    /// Boolean, encoded as a single `0` or `1` byte
    pub fn new_bool(value: bool) -> Self {
        Value::Boolean(value)
    }

    /// Raw bytes, passed through untouched
    pub fn new_opaque(value: impl Into<Vec<u8>>) -> Self {
        Value::Opaque(value.into())
    }

    /// Point in time as seconds since the Unix epoch
    pub fn new_time(seconds: i64) -> Self {
        Value::Time(seconds)
    }

    /// Get the semantic type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::String(_) => DataType::String,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Boolean(_) => DataType::Boolean,
            Value::Opaque(_) => DataType::Opaque,
            Value::Time(_) => DataType::Time,
        }
    }

    /// Text of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer of an integer or time value
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) | Value::Time(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Plain-text representation used by the text content format
    ///
    /// # Errors
    /// Opaque values have no text representation.
    pub fn to_text(&self) -> Lwm2mResult<String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) | Value::Time(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Boolean(b) => Ok(if *b { "1" } else { "0" }.to_string()),
            Value::Opaque(_) => Err(Lwm2mError::InvalidData(
                "opaque values cannot be sent as text".to_string(),
            )),
        }
    }

    /// Parse a plain-text value of the given type
    pub fn from_text(text: &str, data_type: DataType) -> Lwm2mResult<Self> {
        let invalid = || Lwm2mError::malformed(format!("'{}' is not a valid {:?}", text, data_type));
        match data_type {
            DataType::String => Ok(Value::String(text.to_string())),
            DataType::Integer => text.trim().parse::<i64>().map(Value::Integer).map_err(|_| invalid()),
            DataType::Time => text.trim().parse::<i64>().map(Value::Time).map_err(|_| invalid()),
            DataType::Float => text.trim().parse::<f64>().map(Value::Float).map_err(|_| invalid()),
            DataType::Boolean => match text.trim() {
                "1" | "true" => Ok(Value::Boolean(true)),
                "0" | "false" => Ok(Value::Boolean(false)),
                _ => Err(invalid()),
            },
            DataType::Opaque => Ok(Value::Opaque(text.as_bytes().to_vec())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Opaque(bytes) => {
                write!(f, "0x")?;
                for b in bytes {
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(i) | Value::Time(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Content of a resource: one value, or resource instances keyed by index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResourceValue {
    Single(Value),
    Multiple(BTreeMap<u16, Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: u16,
    pub value: ResourceValue,
}

impl Resource {
    /// Create a single-valued resource
    pub fn new_single(id: u16, value: Value) -> Self {
        Self {
            id,
            value: ResourceValue::Single(value),
        }
    }

    /// Create a multiple-valued resource
    pub fn new_multiple(id: u16, values: impl IntoIterator<Item = (u16, Value)>) -> Self {
        Self {
            id,
            value: ResourceValue::Multiple(values.into_iter().collect()),
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self.value, ResourceValue::Multiple(_))
    }

    /// The value of a single-valued resource
    pub fn single_value(&self) -> Option<&Value> {
        match &self.value {
            ResourceValue::Single(v) => Some(v),
            ResourceValue::Multiple(_) => None,
        }
    }

    /// The resource instances of a multiple-valued resource
    pub fn instances(&self) -> Option<&BTreeMap<u16, Value>> {
        match &self.value {
            ResourceValue::Multiple(values) => Some(values),
            ResourceValue::Single(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInstance {
    pub id: u16,
    pub resources: BTreeMap<u16, Resource>,
}

impl ObjectInstance {
    pub fn new(id: u16, resources: impl IntoIterator<Item = Resource>) -> Self {
        Self {
            id,
            resources: resources.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub fn resource(&self, id: u16) -> Option<&Resource> {
        self.resources.get(&id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub id: u16,
    pub instances: BTreeMap<u16, ObjectInstance>,
}

impl Object {
    pub fn new(id: u16, instances: impl IntoIterator<Item = ObjectInstance>) -> Self {
        Self {
            id,
            instances: instances.into_iter().map(|i| (i.id, i)).collect(),
        }
    }

    pub fn instance(&self, id: u16) -> Option<&ObjectInstance> {
        self.instances.get(&id)
    }
}

/// Any node of the resource tree that can be carried in a request or response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lwm2mNode {
    Object(Object),
    ObjectInstance(ObjectInstance),
    Resource(Resource),
}

impl Lwm2mNode {
    pub fn id(&self) -> u16 {
        match self {
            Lwm2mNode::Object(o) => o.id,
            Lwm2mNode::ObjectInstance(i) => i.id,
            Lwm2mNode::Resource(r) => r.id,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Lwm2mNode::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_object_instance(&self) -> Option<&ObjectInstance> {
        match self {
            Lwm2mNode::ObjectInstance(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Lwm2mNode::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl From<Resource> for Lwm2mNode {
    fn from(resource: Resource) -> Self {
        Lwm2mNode::Resource(resource)
    }
}

impl From<ObjectInstance> for Lwm2mNode {
    fn from(instance: ObjectInstance) -> Self {
        Lwm2mNode::ObjectInstance(instance)
    }
}

impl From<Object> for Lwm2mNode {
    fn from(object: Object) -> Self {
        Lwm2mNode::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(Value::new_string("a").data_type(), DataType::String);
        assert_eq!(Value::new_time(10).data_type(), DataType::Time);
        assert_eq!(Value::new_opaque(vec![1u8]).data_type(), DataType::Opaque);
        assert_eq!(Value::new_time(10).as_integer(), Some(10));
    }

    #[test]
    fn test_text_representation() {
        assert_eq!(Value::new_bool(true).to_text().unwrap(), "1");
        assert_eq!(Value::new_integer(-42).to_text().unwrap(), "-42");
        assert!(Value::new_opaque(vec![0u8]).to_text().is_err());

        assert_eq!(Value::from_text("0", DataType::Boolean).unwrap(), Value::Boolean(false));
        assert_eq!(Value::from_text("1.5", DataType::Float).unwrap(), Value::Float(1.5));
        assert!(Value::from_text("abc", DataType::Integer).is_err());
    }

    #[test]
    fn test_instance_keeps_resources_ordered() {
        let instance = ObjectInstance::new(
            0,
            vec![
                Resource::new_single(14, Value::new_string("+02")),
                Resource::new_single(0, Value::new_string("vendor")),
            ],
        );
        let ids: Vec<u16> = instance.resources.keys().copied().collect();
        assert_eq!(ids, vec![0, 14]);
        assert!(instance.resource(14).is_some());
    }

    #[test]
    fn test_multiple_resource_sparse_indices() {
        let resource = Resource::new_multiple(6, vec![(5, Value::new_integer(1)), (0, Value::new_integer(5))]);
        assert!(resource.is_multiple());
        let indices: Vec<u16> = resource.instances().unwrap().keys().copied().collect();
        assert_eq!(indices, vec![0, 5]);
        assert!(resource.single_value().is_none());
    }
}
