//! CoRE link format (RFC 6690)
//!
//! Devices declare their supported Objects and Object Instances as a list of
//! links, e.g. `</lwm2m>;rt="oma.lwm2m",</lwm2m/1/0>,</lwm2m/3/0>`.
//! Discover responses use the same format.

use crate::error::{Lwm2mError, Lwm2mResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resource type advertised by the link carrying a device's root path
pub const LWM2M_RESOURCE_TYPE: &str = "oma.lwm2m";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkObject {
    pub url: String,
    /// Link attributes; a `None` value is a bare attribute (`;obs`)
    pub attributes: BTreeMap<String, Option<String>>,
}

impl LinkObject {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_deref())
    }

    /// Whether this link advertises the LwM2M root path
    pub fn is_lwm2m_root(&self) -> bool {
        self.attribute("rt") == Some(LWM2M_RESOURCE_TYPE)
    }

    /// Parse one `<url>;attr=value;...` entry
    pub fn parse_one(entry: &str) -> Lwm2mResult<Self> {
        let invalid = || Lwm2mError::malformed(format!("Invalid link: '{}'", entry));
        let rest = entry.trim().strip_prefix('<').ok_or_else(invalid)?;
        let (url, params) = rest.split_once('>').ok_or_else(invalid)?;
        let mut link = LinkObject::new(url);
        for attribute in params.split(';').map(str::trim).filter(|a| !a.is_empty()) {
            match attribute.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim().trim_matches('"').to_string();
                    link.attributes.insert(name.trim().to_string(), Some(value));
                }
                None => {
                    link.attributes.insert(attribute.to_string(), None);
                }
            }
        }
        Ok(link)
    }

    /// Parse a comma separated list of links
    ///
    /// Commas inside quoted attribute values do not split entries.
    pub fn parse(content: &str) -> Lwm2mResult<Vec<Self>> {
        let mut links = Vec::new();
        let mut start = 0;
        let mut quoted = false;
        for (idx, ch) in content.char_indices() {
            match ch {
                '"' => quoted = !quoted,
                ',' if !quoted => {
                    links.push(Self::parse_one(&content[start..idx])?);
                    start = idx + 1;
                }
                _ => {}
            }
        }
        let tail = &content[start..];
        if !tail.trim().is_empty() {
            links.push(Self::parse_one(tail)?);
        }
        Ok(links)
    }

    /// Serialize a list of links to link format
    pub fn serialize(links: &[LinkObject]) -> String {
        links.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
    }
}

impl fmt::Display for LinkObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.url)?;
        for (name, value) in &self.attributes {
            match value {
                Some(v) if v.parse::<f64>().is_ok() => write!(f, ";{}={}", name, v)?,
                Some(v) => write!(f, ";{}=\"{}\"", name, v)?,
                None => write!(f, ";{}", name)?,
            }
        }
        Ok(())
    }
}
