//! Wire-level request and response messages

use lwm2m_core::{ContentFormat, ResponseCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Request verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Correlation token linking a request to its response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Token(u64);

impl Token {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// A fresh random token
    pub fn random() -> Self {
        Self(rand::random::<u64>())
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A request ready to be handed to the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRequest {
    pub token: Token,
    pub method: Method,
    pub destination: SocketAddr,
    pub uri_path: String,
    pub uri_query: Vec<String>,
    pub content_format: Option<ContentFormat>,
    pub accept: Option<ContentFormat>,
    /// Register the sender as an observer of the target
    pub observe: bool,
    pub payload: Vec<u8>,
}

impl WireRequest {
    pub fn new(token: Token, method: Method, destination: SocketAddr, uri_path: impl Into<String>) -> Self {
        Self {
            token,
            method,
            destination,
            uri_path: uri_path.into(),
            uri_query: Vec::new(),
            content_format: None,
            accept: None,
            observe: false,
            payload: Vec::new(),
        }
    }

    /// Path and query, e.g. `/3/0/14?pmin=10&pmax=100`
    pub fn uri(&self) -> String {
        if self.uri_query.is_empty() {
            self.uri_path.clone()
        } else {
            format!("{}?{}", self.uri_path, self.uri_query.join("&"))
        }
    }
}

/// A response received from a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireResponse {
    pub token: Token,
    pub code: ResponseCode,
    pub content_format: Option<ContentFormat>,
    /// Location of a created resource, e.g. `/12/1`
    pub location_path: Option<String>,
    /// Notification sequence number when the response belongs to an observation
    pub observe: Option<u32>,
    pub payload: Vec<u8>,
}

impl WireResponse {
    pub fn new(token: Token, code: ResponseCode) -> Self {
        Self {
            token,
            code,
            content_format: None,
            location_path: None,
            observe: None,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(mut self, format: ContentFormat, payload: Vec<u8>) -> Self {
        self.content_format = Some(format);
        self.payload = payload;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location_path = Some(location.into());
        self
    }

    pub fn with_observe(mut self, sequence: u32) -> Self {
        self.observe = Some(sequence);
        self
    }
}

/// Something the transport reports back for an earlier request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Response(WireResponse),
    /// The channel failed before a response was obtained
    Failure { token: Token, reason: String },
}

impl TransportEvent {
    pub fn token(&self) -> Token {
        match self {
            TransportEvent::Response(response) => response.token,
            TransportEvent::Failure { token, .. } => *token,
        }
    }
}
