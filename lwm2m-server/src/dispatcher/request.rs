//! Downlink operations and their typed responses

use lwm2m_core::{
    ContentFormat, LinkObject, Lwm2mError, Lwm2mNode, Lwm2mPath, Lwm2mResult, ObserveSpec, Resource,
    ResponseCode,
};

/// An operation the server issues against a client's resource tree
#[derive(Debug, Clone, PartialEq)]
pub enum DownlinkRequest {
    /// Read the value(s) at a path
    Read {
        path: Lwm2mPath,
        /// Preferred response format, left to the client when `None`
        format: Option<ContentFormat>,
    },
    /// List the objects, instances and resources below a path
    Discover { path: Lwm2mPath },
    /// Write a node, replacing the target (`PUT`) or updating it (`POST`)
    Write {
        path: Lwm2mPath,
        node: Lwm2mNode,
        format: ContentFormat,
        replace: bool,
    },
    /// Set the notification attributes of a path
    WriteAttributes { path: Lwm2mPath, attributes: ObserveSpec },
    /// Execute a resource
    Execute {
        path: Lwm2mPath,
        arguments: Option<String>,
    },
    /// Create an object instance from its resources
    Create {
        path: Lwm2mPath,
        resources: Vec<Resource>,
        format: ContentFormat,
    },
    /// Delete an object instance
    Delete { path: Lwm2mPath },
    /// Read a path and subscribe to its changes
    Observe {
        path: Lwm2mPath,
        format: Option<ContentFormat>,
    },
}

impl DownlinkRequest {
    pub fn read(path: Lwm2mPath) -> Self {
        Self::Read { path, format: None }
    }

    pub fn discover(path: Lwm2mPath) -> Self {
        Self::Discover { path }
    }

    /// Write replacing the target
    pub fn write_replace(path: Lwm2mPath, node: impl Into<Lwm2mNode>, format: ContentFormat) -> Self {
        Self::Write {
            path,
            node: node.into(),
            format,
            replace: true,
        }
    }

    /// Write updating only the supplied resources
    pub fn write_update(path: Lwm2mPath, node: impl Into<Lwm2mNode>, format: ContentFormat) -> Self {
        Self::Write {
            path,
            node: node.into(),
            format,
            replace: false,
        }
    }

    pub fn write_attributes(path: Lwm2mPath, attributes: ObserveSpec) -> Self {
        Self::WriteAttributes { path, attributes }
    }

    pub fn execute(path: Lwm2mPath) -> Self {
        Self::Execute { path, arguments: None }
    }

    pub fn create(path: Lwm2mPath, resources: Vec<Resource>) -> Self {
        Self::Create {
            path,
            resources,
            format: ContentFormat::Tlv,
        }
    }

    pub fn delete(path: Lwm2mPath) -> Self {
        Self::Delete { path }
    }

    pub fn observe(path: Lwm2mPath) -> Self {
        Self::Observe { path, format: None }
    }

    pub fn path(&self) -> &Lwm2mPath {
        match self {
            Self::Read { path, .. }
            | Self::Discover { path }
            | Self::Write { path, .. }
            | Self::WriteAttributes { path, .. }
            | Self::Execute { path, .. }
            | Self::Create { path, .. }
            | Self::Delete { path }
            | Self::Observe { path, .. } => path,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Read { .. } => "Read",
            Self::Discover { .. } => "Discover",
            Self::Write { replace: true, .. } => "Write (replace)",
            Self::Write { replace: false, .. } => "Write (update)",
            Self::WriteAttributes { .. } => "WriteAttributes",
            Self::Execute { .. } => "Execute",
            Self::Create { .. } => "Create",
            Self::Delete { .. } => "Delete",
            Self::Observe { .. } => "Observe",
        }
    }

    /// Success code a client answers this operation with
    pub fn expected_code(&self) -> ResponseCode {
        match self {
            Self::Read { .. } | Self::Discover { .. } | Self::Observe { .. } => ResponseCode::Content,
            Self::Write { .. } | Self::WriteAttributes { .. } | Self::Execute { .. } => ResponseCode::Changed,
            Self::Create { .. } => ResponseCode::Created,
            Self::Delete { .. } => ResponseCode::Deleted,
        }
    }

    /// Check that the target path fits the operation
    ///
    /// # Errors
    ///
    /// Returns `Lwm2mError::InvalidData` describing the mismatch.
    pub fn validate(&self) -> Lwm2mResult<()> {
        let path = self.path();
        let invalid = |expected: &str| {
            Err(Lwm2mError::InvalidData(format!(
                "{} needs {} path, got {}",
                self.name(),
                expected,
                path
            )))
        };
        match self {
            Self::Execute { .. } if !path.is_resource() => invalid("a resource"),
            Self::Delete { .. } if !path.is_object_instance() => invalid("an object instance"),
            Self::Create { .. } if path.is_resource() => invalid("an object or object instance"),
            Self::Write { node, .. } => {
                let fits = match node {
                    Lwm2mNode::Resource(r) => path.resource_id() == Some(r.id),
                    Lwm2mNode::ObjectInstance(i) => {
                        path.is_object_instance() && path.object_instance_id() == Some(i.id)
                    }
                    Lwm2mNode::Object(_) => false,
                };
                if fits { Ok(()) } else { invalid("a matching resource or object instance") }
            }
            Self::WriteAttributes { attributes, .. } => attributes.validate(),
            _ => Ok(()),
        }
    }
}

/// A successful answer to a [`DownlinkRequest`]
#[derive(Debug, Clone, PartialEq)]
pub enum DownlinkResponse {
    Read { code: ResponseCode, content: Lwm2mNode },
    Discover { code: ResponseCode, links: Vec<LinkObject> },
    Write { code: ResponseCode },
    WriteAttributes { code: ResponseCode },
    Execute { code: ResponseCode },
    /// `location` is the path of the new instance, e.g. `/12/1`
    Create { code: ResponseCode, location: Option<String> },
    Delete { code: ResponseCode },
    Observe { code: ResponseCode, content: Lwm2mNode },
}

impl DownlinkResponse {
    pub fn code(&self) -> ResponseCode {
        match self {
            Self::Read { code, .. }
            | Self::Discover { code, .. }
            | Self::Write { code }
            | Self::WriteAttributes { code }
            | Self::Execute { code }
            | Self::Create { code, .. }
            | Self::Delete { code }
            | Self::Observe { code, .. } => *code,
        }
    }

    /// Value carried by a Read or Observe response
    pub fn content(&self) -> Option<&Lwm2mNode> {
        match self {
            Self::Read { content, .. } | Self::Observe { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn links(&self) -> Option<&[LinkObject]> {
        match self {
            Self::Discover { links, .. } => Some(links),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Create { location, .. } => location.as_deref(),
            _ => None,
        }
    }
}
