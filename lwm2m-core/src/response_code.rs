//! LwM2M response codes
//!
//! Response codes follow the CoAP `class.detail` numbering. Only the codes an
//! LwM2M server produces or expects from a device are modelled.

use crate::error::{Lwm2mError, Lwm2mResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    /// 2.01
    Created,
    /// 2.02
    Deleted,
    /// 2.04
    Changed,
    /// 2.05
    Content,
    /// 4.00
    BadRequest,
    /// 4.01
    Unauthorized,
    /// 4.03
    Forbidden,
    /// 4.04
    NotFound,
    /// 4.05
    MethodNotAllowed,
    /// 4.06
    NotAcceptable,
    /// 4.09
    Conflict,
    /// 4.15
    UnsupportedContentFormat,
    /// 5.00
    InternalServerError,
}

impl ResponseCode {
    /// Encode as a single CoAP code byte (`class << 5 | detail`)
    pub const fn to_u8(self) -> u8 {
        let (class, detail) = self.class_detail();
        (class << 5) | detail
    }

    /// Decode a CoAP code byte
    pub fn from_u8(value: u8) -> Lwm2mResult<Self> {
        let code = match (value >> 5, value & 0x1F) {
            (2, 1) => Self::Created,
            (2, 2) => Self::Deleted,
            (2, 4) => Self::Changed,
            (2, 5) => Self::Content,
            (4, 0) => Self::BadRequest,
            (4, 1) => Self::Unauthorized,
            (4, 3) => Self::Forbidden,
            (4, 4) => Self::NotFound,
            (4, 5) => Self::MethodNotAllowed,
            (4, 6) => Self::NotAcceptable,
            (4, 9) => Self::Conflict,
            (4, 15) => Self::UnsupportedContentFormat,
            (5, 0) => Self::InternalServerError,
            (class, detail) => {
                return Err(Lwm2mError::InvalidData(format!(
                    "Unknown response code: {}.{:02}",
                    class, detail
                )));
            }
        };
        Ok(code)
    }

    const fn class_detail(self) -> (u8, u8) {
        match self {
            Self::Created => (2, 1),
            Self::Deleted => (2, 2),
            Self::Changed => (2, 4),
            Self::Content => (2, 5),
            Self::BadRequest => (4, 0),
            Self::Unauthorized => (4, 1),
            Self::Forbidden => (4, 3),
            Self::NotFound => (4, 4),
            Self::MethodNotAllowed => (4, 5),
            Self::NotAcceptable => (4, 6),
            Self::Conflict => (4, 9),
            Self::UnsupportedContentFormat => (4, 15),
            Self::InternalServerError => (5, 0),
        }
    }

    /// Check if this is a 2.xx code
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.class_detail().0 == 2
    }

    /// Check if this is a 4.xx or 5.xx code
    #[must_use]
    pub const fn is_error(self) -> bool {
        !self.is_success()
    }

    fn reason(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Deleted => "Deleted",
            Self::Changed => "Changed",
            Self::Content => "Content",
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::NotAcceptable => "Not Acceptable",
            Self::Conflict => "Conflict",
            Self::UnsupportedContentFormat => "Unsupported Content-Format",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (class, detail) = self.class_detail();
        write!(f, "{}.{:02} {}", class, detail, self.reason())
    }
}
