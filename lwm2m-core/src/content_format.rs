//! Content formats carried alongside request and response payloads

use crate::error::{Lwm2mError, Lwm2mResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentFormat {
    /// text/plain
    Text,
    /// application/link-format
    Link,
    /// application/octet-stream
    Opaque,
    /// application/vnd.oma.lwm2m+tlv
    Tlv,
    /// application/vnd.oma.lwm2m+json
    Json,
}

impl ContentFormat {
    /// Registered content-format number
    pub const fn code(self) -> u16 {
        match self {
            Self::Text => 0,
            Self::Link => 40,
            Self::Opaque => 42,
            Self::Tlv => 11542,
            Self::Json => 11543,
        }
    }

    pub fn from_code(code: u16) -> Lwm2mResult<Self> {
        match code {
            0 => Ok(Self::Text),
            40 => Ok(Self::Link),
            42 => Ok(Self::Opaque),
            11542 => Ok(Self::Tlv),
            11543 => Ok(Self::Json),
            _ => Err(Lwm2mError::InvalidData(format!("Unknown content format: {}", code))),
        }
    }

    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Link => "application/link-format",
            Self::Opaque => "application/octet-stream",
            Self::Tlv => "application/vnd.oma.lwm2m+tlv",
            Self::Json => "application/vnd.oma.lwm2m+json",
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.media_type(), self.code())
    }
}
