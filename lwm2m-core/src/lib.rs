//! Core types and utilities for the LwM2M server
//!
//! This crate provides the fundamental types shared by every layer of the
//! server: error handling, response codes, resource paths, the in-memory
//! Object/Instance/Resource tree, content formats, CoRE link format and the
//! object model metadata used to type resource values.

pub mod error;
pub mod response_code;
pub mod path;
pub mod node;
pub mod content_format;
pub mod link;
pub mod attributes;
pub mod model;

pub use error::{Lwm2mError, Lwm2mResult, RegistryError};
pub use response_code::ResponseCode;
pub use path::Lwm2mPath;
pub use node::{DataType, Lwm2mNode, ObjectInstance, Object, Resource, ResourceValue, Value};
pub use content_format::ContentFormat;
pub use link::LinkObject;
pub use attributes::ObserveSpec;
pub use model::{ObjectModel, ObjectSpec, Operations, ResourceSpec};
