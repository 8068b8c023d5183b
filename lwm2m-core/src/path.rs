//! Addressing of Objects, Object Instances and Resources
//!
//! A path targets one level of the three-level data model:
//! `/<objectId>`, `/<objectId>/<instanceId>` or
//! `/<objectId>/<instanceId>/<resourceId>`.

use crate::error::{Lwm2mError, Lwm2mResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address of an object, an object instance or a resource
///
/// A resource id is only ever present together with an instance id.
/// Paths order by object, then instance, then resource, with the shorter
/// path first.
///
/// ```
/// use lwm2m_core::Lwm2mPath;
///
/// let path: Lwm2mPath = "/3/0/9".parse().unwrap();
/// assert_eq!(path, Lwm2mPath::resource(3, 0, 9));
/// assert_eq!(path.object_instance_id(), Some(0));
/// assert!(Lwm2mPath::object(3) < Lwm2mPath::object_instance(3, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lwm2mPath {
    object_id: u16,
    object_instance_id: Option<u16>,
    resource_id: Option<u16>,
}

impl Lwm2mPath {
    /// Path to a whole object
    #[must_use]
    pub const fn object(object_id: u16) -> Self {
        Self {
            object_id,
            object_instance_id: None,
            resource_id: None,
        }
    }

    /// Path to an object instance
    #[must_use]
    pub const fn object_instance(object_id: u16, instance_id: u16) -> Self {
        Self {
            object_id,
            object_instance_id: Some(instance_id),
            resource_id: None,
        }
    }

    /// Path to a resource
    #[must_use]
    pub const fn resource(object_id: u16, instance_id: u16, resource_id: u16) -> Self {
        Self {
            object_id,
            object_instance_id: Some(instance_id),
            resource_id: Some(resource_id),
        }
    }

    /// Build a path from optional parts
    ///
    /// # Errors
    /// Returns `InvalidData` when a resource id is given without an instance id.
    pub fn new(object_id: u16, instance_id: Option<u16>, resource_id: Option<u16>) -> Lwm2mResult<Self> {
        if instance_id.is_none() && resource_id.is_some() {
            return Err(Lwm2mError::InvalidData(
                "a resource id requires an object instance id".to_string(),
            ));
        }
        Ok(Self {
            object_id,
            object_instance_id: instance_id,
            resource_id,
        })
    }

    /// Object id, present on every path
    pub const fn object_id(&self) -> u16 {
        self.object_id
    }

    /// Instance id, `None` on an object path
    pub const fn object_instance_id(&self) -> Option<u16> {
        self.object_instance_id
    }

    /// Resource id, set only on a resource path
    pub const fn resource_id(&self) -> Option<u16> {
        self.resource_id
    }

    /// Whether the path targets a whole object
    #[must_use]
    pub const fn is_object(&self) -> bool {
        self.object_instance_id.is_none()
    }

    #[must_use]
    pub const fn is_object_instance(&self) -> bool {
        self.object_instance_id.is_some() && self.resource_id.is_none()
    }

    #[must_use]
    pub const fn is_resource(&self) -> bool {
        self.resource_id.is_some()
    }

    /// Path segments, outermost first
    pub fn segments(&self) -> Vec<String> {
        let mut segments = vec![self.object_id.to_string()];
        if let Some(instance) = self.object_instance_id {
            segments.push(instance.to_string());
        }
        if let Some(resource) = self.resource_id {
            segments.push(resource.to_string());
        }
        segments
    }

    /// Full URI path below a device root path
    ///
    /// The root path `/` (or empty) adds nothing, so `/3/0` under `/lwm2m`
    /// becomes `/lwm2m/3/0` and under `/` stays `/3/0`.
    pub fn with_root(&self, root_path: &str) -> String {
        let root = root_path.trim_end_matches('/');
        format!("{}{}", root, self)
    }
}

impl fmt::Display for Lwm2mPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.object_id)?;
        if let Some(instance) = self.object_instance_id {
            write!(f, "/{}", instance)?;
        }
        if let Some(resource) = self.resource_id {
            write!(f, "/{}", resource)?;
        }
        Ok(())
    }
}

impl FromStr for Lwm2mPath {
    type Err = Lwm2mError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Err(Lwm2mError::InvalidData(format!("Invalid path: '{}'", s)));
        }
        let ids = trimmed
            .split('/')
            .map(|part| {
                part.parse::<u16>()
                    .map_err(|_| Lwm2mError::InvalidData(format!("Invalid path segment '{}' in '{}'", part, s)))
            })
            .collect::<Lwm2mResult<Vec<u16>>>()?;
        match ids.as_slice() {
            [object] => Ok(Self::object(*object)),
            [object, instance] => Ok(Self::object_instance(*object, *instance)),
            [object, instance, resource] => Ok(Self::resource(*object, *instance, *resource)),
            _ => Err(Lwm2mError::InvalidData(format!("Path too deep: '{}'", s))),
        }
    }
}
