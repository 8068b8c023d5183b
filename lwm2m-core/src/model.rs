//! Object model metadata
//!
//! TLV carries no value type on the wire, so decoding needs to know the type
//! of every resource. An [`ObjectModel`] describes the objects a server
//! understands: for each object its resources, whether they are multiple,
//! which operations they allow and the type of their values.
//!
//! [`ObjectModel::default`] holds the core objects 0 to 7. Further objects
//! are added with [`ObjectModel::add`].

use crate::node::DataType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Operations allowed on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operations {
    None,
    R,
    W,
    RW,
    E,
}

impl Operations {
    pub const fn is_readable(self) -> bool {
        matches!(self, Self::R | Self::RW)
    }

    pub const fn is_writable(self) -> bool {
        matches!(self, Self::W | Self::RW)
    }

    pub const fn is_executable(self) -> bool {
        matches!(self, Self::E)
    }
}

/// Description of one resource of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Resource id within its object
    pub id: u16,
    /// Human readable name, e.g. `Battery Level`
    pub name: String,
    /// Operations the resource supports
    pub operations: Operations,
    /// Whether the resource holds several instances
    pub multiple: bool,
    /// Whether every instance of the object carries the resource
    pub mandatory: bool,
    /// Value type; executable resources have none
    pub data_type: Option<DataType>,
}

impl ResourceSpec {
    pub fn new(
        id: u16,
        name: impl Into<String>,
        operations: Operations,
        multiple: bool,
        mandatory: bool,
        data_type: Option<DataType>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            operations,
            multiple,
            mandatory,
            data_type,
        }
    }
}

/// Description of an object and its resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// Object id, e.g. `3` for Device
    pub id: u16,
    pub name: String,
    /// Whether a client may hold several instances
    pub multiple: bool,
    /// Whether every client must implement the object
    pub mandatory: bool,
    /// Resource descriptions keyed by resource id
    pub resources: BTreeMap<u16, ResourceSpec>,
}

impl ObjectSpec {
    pub fn new(
        id: u16,
        name: impl Into<String>,
        multiple: bool,
        mandatory: bool,
        resources: impl IntoIterator<Item = ResourceSpec>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            multiple,
            mandatory,
            resources: resources.into_iter().map(|r| (r.id, r)).collect(),
        }
    }
}

/// Object descriptions used to type decoded values
///
/// The default model holds the core objects 0 to 7.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectModel {
    objects: HashMap<u16, ObjectSpec>,
}

impl ObjectModel {
    /// A model with no objects; every resource decodes as opaque
    pub fn empty() -> Self {
        Self {
            objects: HashMap::new(),
        }
    }

    /// Add or replace an object description
    pub fn add(&mut self, spec: ObjectSpec) {
        self.objects.insert(spec.id, spec);
    }

    /// Description of an object, if the model knows it
    pub fn object(&self, object_id: u16) -> Option<&ObjectSpec> {
        self.objects.get(&object_id)
    }

    /// Description of a resource, if the model knows its object and the resource
    pub fn resource(&self, object_id: u16, resource_id: u16) -> Option<&ResourceSpec> {
        self.objects.get(&object_id).and_then(|o| o.resources.get(&resource_id))
    }

    /// Value type of a resource, falling back to opaque for unknown resources
    pub fn data_type(&self, object_id: u16, resource_id: u16) -> DataType {
        self.resource(object_id, resource_id)
            .and_then(|r| r.data_type)
            .unwrap_or(DataType::Opaque)
    }

    /// Objects defined by the OMA LwM2M core
    pub fn core() -> Self {
        let mut model = Self::empty();
        for spec in core_objects() {
            model.add(spec);
        }
        model
    }

    /// Number of objects described
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for ObjectModel {
    fn default() -> Self {
        Self::core()
    }
}

fn res(id: u16, name: &str, operations: Operations, multiple: bool, mandatory: bool, data_type: DataType) -> ResourceSpec {
    ResourceSpec::new(id, name, operations, multiple, mandatory, Some(data_type))
}

fn exec(id: u16, name: &str, mandatory: bool) -> ResourceSpec {
    ResourceSpec::new(id, name, Operations::E, false, mandatory, None)
}

fn core_objects() -> Vec<ObjectSpec> {
    use DataType::*;
    use Operations::{None as NoOp, R, RW, W};

    vec![
        ObjectSpec::new(0, "LWM2M Security", true, true, vec![
            res(0, "LWM2M Server URI", NoOp, false, true, String),
            res(1, "Bootstrap Server", NoOp, false, true, Boolean),
            res(2, "Security Mode", NoOp, false, true, Integer),
            res(3, "Public Key or Identity", NoOp, false, true, Opaque),
            res(4, "Server Public Key or Identity", NoOp, false, true, Opaque),
            res(5, "Secret Key", NoOp, false, true, Opaque),
            res(6, "SMS Security Mode", NoOp, false, false, Integer),
            res(7, "SMS Binding Key Parameters", NoOp, false, false, Opaque),
            res(8, "SMS Binding Secret Keys", NoOp, false, false, Opaque),
            res(9, "LWM2M Server SMS Number", NoOp, false, false, String),
            res(10, "Short Server ID", NoOp, false, false, Integer),
            res(11, "Client Hold Off Time", NoOp, false, false, Integer),
            res(12, "Bootstrap Server Account Timeout", NoOp, false, false, Integer),
        ]),
        ObjectSpec::new(1, "LWM2M Server", true, true, vec![
            res(0, "Short Server ID", R, false, true, Integer),
            res(1, "Lifetime", RW, false, true, Integer),
            res(2, "Default Minimum Period", RW, false, false, Integer),
            res(3, "Default Maximum Period", RW, false, false, Integer),
            exec(4, "Disable", false),
            res(5, "Disable Timeout", RW, false, false, Integer),
            res(6, "Notification Storing When Disabled or Offline", RW, false, true, Boolean),
            res(7, "Binding", RW, false, true, String),
            exec(8, "Registration Update Trigger", true),
        ]),
        ObjectSpec::new(2, "LWM2M Access Control", true, false, vec![
            res(0, "Object ID", R, false, true, Integer),
            res(1, "Object Instance ID", R, false, true, Integer),
            res(2, "ACL", RW, true, false, Integer),
            res(3, "Access Control Owner", RW, false, true, Integer),
        ]),
        ObjectSpec::new(3, "Device", false, true, vec![
            res(0, "Manufacturer", R, false, false, String),
            res(1, "Model Number", R, false, false, String),
            res(2, "Serial Number", R, false, false, String),
            res(3, "Firmware Version", R, false, false, String),
            exec(4, "Reboot", true),
            exec(5, "Factory Reset", false),
            res(6, "Available Power Sources", R, true, false, Integer),
            res(7, "Power Source Voltage", R, true, false, Integer),
            res(8, "Power Source Current", R, true, false, Integer),
            res(9, "Battery Level", R, false, false, Integer),
            res(10, "Memory Free", R, false, false, Integer),
            res(11, "Error Code", R, true, true, Integer),
            exec(12, "Reset Error Code", false),
            res(13, "Current Time", RW, false, false, Time),
            res(14, "UTC Offset", RW, false, false, String),
            res(15, "Timezone", RW, false, false, String),
            res(16, "Supported Binding and Modes", R, false, true, String),
        ]),
        ObjectSpec::new(4, "Connectivity Monitoring", false, false, vec![
            res(0, "Network Bearer", R, false, true, Integer),
            res(1, "Available Network Bearer", R, true, true, Integer),
            res(2, "Radio Signal Strength", R, false, true, Integer),
            res(3, "Link Quality", R, false, false, Integer),
            res(4, "IP Addresses", R, true, true, String),
            res(5, "Router IP Addresses", R, true, false, String),
            res(6, "Link Utilization", R, false, false, Integer),
            res(7, "APN", R, true, false, String),
            res(8, "Cell ID", R, false, false, Integer),
            res(9, "SMNC", R, false, false, Integer),
            res(10, "SMCC", R, false, false, Integer),
        ]),
        ObjectSpec::new(5, "Firmware Update", false, false, vec![
            res(0, "Package", W, false, true, Opaque),
            res(1, "Package URI", W, false, true, String),
            exec(2, "Update", true),
            res(3, "State", R, false, true, Integer),
            res(4, "Update Supported Objects", RW, false, false, Boolean),
            res(5, "Update Result", R, false, true, Integer),
        ]),
        ObjectSpec::new(6, "Location", false, false, vec![
            res(0, "Latitude", R, false, true, Float),
            res(1, "Longitude", R, false, true, Float),
            res(2, "Altitude", R, false, false, Float),
            res(3, "Uncertainty", R, false, false, Float),
            res(4, "Velocity", R, false, false, Opaque),
            res(5, "Timestamp", R, false, true, Time),
        ]),
        ObjectSpec::new(7, "Connectivity Statistics", false, false, vec![
            res(0, "SMS Tx Counter", R, false, false, Integer),
            res(1, "SMS Rx Counter", R, false, false, Integer),
            res(2, "Tx Data", R, false, false, Integer),
            res(3, "Rx Data", R, false, false, Integer),
            res(4, "Max Message Size", R, false, false, Integer),
            res(5, "Average Message Size", R, false, false, Integer),
            exec(6, "Start", true),
            exec(7, "Stop", true),
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_model() {
        let model = ObjectModel::default();
        assert_eq!(model.len(), 8);
        let device = model.object(3).unwrap();
        assert_eq!(device.name, "Device");
        assert!(!device.multiple);
        assert_eq!(model.data_type(3, 14), DataType::String);
        assert_eq!(model.data_type(3, 13), DataType::Time);
        assert!(model.resource(3, 11).unwrap().multiple);
        assert!(model.resource(3, 4).unwrap().operations.is_executable());
    }

    #[test]
    fn test_unknown_resource_is_opaque() {
        let model = ObjectModel::core();
        assert_eq!(model.data_type(3, 999), DataType::Opaque);
        assert_eq!(model.data_type(1234, 0), DataType::Opaque);
        assert!(ObjectModel::empty().is_empty());
    }

    #[test]
    fn test_add_object() {
        let mut model = ObjectModel::empty();
        model.add(ObjectSpec::new(
            1024,
            "Custom",
            true,
            false,
            vec![ResourceSpec::new(0, "Label", Operations::RW, false, true, Some(DataType::String))],
        ));
        assert_eq!(model.data_type(1024, 0), DataType::String);
    }
}
