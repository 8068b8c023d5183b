//! Registered client (device) record

use lwm2m_core::{LinkObject, Lwm2mError, Lwm2mResult};
use lwm2m_transport::EndpointKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// Root path used when a client does not advertise one
pub const DEFAULT_ROOT_PATH: &str = "/";

/// Registration state of a client
///
/// `Unregistered` is both the initial and the terminal state. A client only
/// ever leaves `Registered` through deregistration or expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationState {
    Unregistered,
    Registered,
}

/// How the server can reach a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingMode {
    /// UDP
    U,
    /// UDP with queue mode
    UQ,
    /// SMS
    S,
    /// SMS with queue mode
    SQ,
    /// UDP and SMS
    US,
    /// UDP with queue mode and SMS
    UQS,
}

impl BindingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingMode::U => "U",
            BindingMode::UQ => "UQ",
            BindingMode::S => "S",
            BindingMode::SQ => "SQ",
            BindingMode::US => "US",
            BindingMode::UQS => "UQS",
        }
    }
}

impl FromStr for BindingMode {
    type Err = Lwm2mError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "U" => Ok(BindingMode::U),
            "UQ" => Ok(BindingMode::UQ),
            "S" => Ok(BindingMode::S),
            "SQ" => Ok(BindingMode::SQ),
            "US" => Ok(BindingMode::US),
            "UQS" => Ok(BindingMode::UQS),
            other => Err(Lwm2mError::InvalidData(format!("unknown binding mode: {}", other))),
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Endpoint name, unique among registered clients
    pub endpoint: String,
    /// Server-issued handle presented on update and deregister
    pub registration_id: String,
    /// Network address and port the client was last seen on
    pub address: SocketAddr,
    /// Seconds the registration stays valid without an update
    pub lifetime: u64,
    /// Protocol version the client announced, `1.0` when absent
    pub lwm2m_version: String,
    /// How the server may reach the client
    pub binding_mode: BindingMode,
    /// MSISDN for SMS binding, if the client gave one
    pub sms_number: Option<String>,
    /// Prefix of every resource path on this client
    pub root_path: String,
    /// Objects and instances the client declared
    pub object_links: Vec<LinkObject>,
    /// When the client first registered
    pub registration_date: SystemTime,
    /// When the client last registered or updated; expiry counts from here
    pub last_update: SystemTime,
    /// Registered over the secured endpoint
    pub secure: bool,
    /// Registered until deregistration or expiry
    pub state: RegistrationState,
}

impl Client {
    /// Location handed back to the client, e.g. `/rd/5a3f0c81b2`
    pub fn location(&self) -> String {
        format!("/rd/{}", self.registration_id)
    }

    /// Endpoint requests to this client go through
    pub fn endpoint_kind(&self) -> EndpointKind {
        EndpointKind::from_secure(self.secure)
    }

    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    /// Whether the lifetime has elapsed since the last update
    ///
    /// # Errors
    ///
    /// Returns `Lwm2mError::InvalidData` if `now` lies before the last
    /// update, which means the clock moved backwards.
    pub fn is_expired_at(&self, now: SystemTime) -> Lwm2mResult<bool> {
        let elapsed = now.duration_since(self.last_update).map_err(|e| {
            Lwm2mError::InvalidData(format!(
                "clock is {:?} behind last update of {}",
                e.duration(),
                self.endpoint
            ))
        })?;
        Ok(elapsed > Duration::from_secs(self.lifetime))
    }

    /// Replace the declared links, deriving the root path from them
    pub fn set_object_links(&mut self, links: Vec<LinkObject>) {
        self.root_path = root_path_of(&links);
        self.object_links = links;
    }
}

/// Root path advertised through an `rt="oma.lwm2m"` link
pub fn root_path_of(links: &[LinkObject]) -> String {
    links
        .iter()
        .find(|link| link.is_lwm2m_root())
        .map(|link| link.url.clone())
        .unwrap_or_else(|| DEFAULT_ROOT_PATH.to_string())
}
