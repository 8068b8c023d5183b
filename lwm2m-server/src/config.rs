//! Server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::registry::BindingMode;

/// Server configuration
///
/// Durations are (de)serialized as whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address of the plain (unsecured) endpoint
    pub plain_address: SocketAddr,
    /// Address of the secured endpoint
    pub secure_address: SocketAddr,
    /// Tick of the registration expiry sweep
    ///
    /// Must not exceed half of `min_lifetime` for expiry to be timely.
    #[serde(with = "seconds")]
    pub expiry_period: Duration,
    /// Timeout for requests sent without an explicit one
    #[serde(with = "seconds")]
    pub request_timeout: Duration,
    /// Lifetime given to clients that register without one, in seconds
    pub default_lifetime: u64,
    /// Smallest lifetime accepted on register/update, in seconds
    pub min_lifetime: u64,
    /// Binding mode given to clients that register without one
    pub default_binding: BindingMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            plain_address: SocketAddr::from(([0, 0, 0, 0], 5683)),
            secure_address: SocketAddr::from(([0, 0, 0, 0], 5684)),
            expiry_period: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            default_lifetime: 86_400,
            min_lifetime: 1,
            default_binding: BindingMode::U,
        }
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.plain_address.port(), 5683);
        assert_eq!(config.secure_address.port(), 5684);
        assert_eq!(config.default_lifetime, 86_400);
        assert_eq!(config.default_binding, BindingMode::U);
        assert!(config.expiry_period.as_secs() * 2 <= 86_400);
    }
}
