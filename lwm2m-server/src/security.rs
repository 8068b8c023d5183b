//! Security information of clients using the secured endpoint
//!
//! The DTLS handshake itself happens in the transport. The server only
//! needs to know which endpoints must use the secured channel and which
//! PSK identity they authenticate with.

use async_trait::async_trait;
use lwm2m_core::{Lwm2mError, Lwm2mResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Pre-shared key credentials of one endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityInfo {
    pub endpoint: String,
    pub identity: String,
    #[serde(with = "serde_bytes")]
    pub pre_shared_key: Vec<u8>,
}

impl SecurityInfo {
    pub fn new_psk(endpoint: impl Into<String>, identity: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            endpoint: endpoint.into(),
            identity: identity.into(),
            pre_shared_key: key.into(),
        }
    }
}

impl fmt::Debug for SecurityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityInfo")
            .field("endpoint", &self.endpoint)
            .field("identity", &self.identity)
            .field("pre_shared_key", &"<redacted>")
            .finish()
    }
}

/// Read access to security information
#[async_trait]
pub trait SecurityStore: Send + Sync {
    /// Security information of an endpoint, if it must use the secured channel
    async fn get_by_endpoint(&self, endpoint: &str) -> Option<SecurityInfo>;

    /// Security information matching a PSK identity
    async fn get_by_identity(&self, identity: &str) -> Option<SecurityInfo>;
}

/// Security store kept in memory
#[derive(Debug, Default)]
pub struct InMemorySecurityStore {
    by_endpoint: RwLock<HashMap<String, SecurityInfo>>,
}

impl InMemorySecurityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the security information of an endpoint
    ///
    /// # Errors
    ///
    /// Returns `Lwm2mError::InvalidData` if the identity is already used by
    /// another endpoint.
    pub async fn add(&self, info: SecurityInfo) -> Lwm2mResult<Option<SecurityInfo>> {
        let mut by_endpoint = self.by_endpoint.write().await;
        let taken = by_endpoint
            .values()
            .any(|other| other.identity == info.identity && other.endpoint != info.endpoint);
        if taken {
            return Err(Lwm2mError::InvalidData(format!(
                "PSK identity {} is already in use",
                info.identity
            )));
        }
        Ok(by_endpoint.insert(info.endpoint.clone(), info))
    }

    pub async fn remove(&self, endpoint: &str) -> Option<SecurityInfo> {
        self.by_endpoint.write().await.remove(endpoint)
    }

    pub async fn all(&self) -> Vec<SecurityInfo> {
        self.by_endpoint.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SecurityStore for InMemorySecurityStore {
    async fn get_by_endpoint(&self, endpoint: &str) -> Option<SecurityInfo> {
        self.by_endpoint.read().await.get(endpoint).cloned()
    }

    async fn get_by_identity(&self, identity: &str) -> Option<SecurityInfo> {
        self.by_endpoint
            .read()
            .await
            .values()
            .find(|info| info.identity == identity)
            .cloned()
    }
}

/// Key lookup handed to the DTLS handshake
///
/// Answers "identity to key" without giving the transport the whole store.
#[derive(Clone)]
pub struct PskStore {
    store: Arc<dyn SecurityStore>,
}

impl PskStore {
    pub fn new(store: Arc<dyn SecurityStore>) -> Self {
        Self { store }
    }

    /// Pre-shared key for a PSK identity
    pub async fn key(&self, identity: &str) -> Option<Vec<u8>> {
        self.store
            .get_by_identity(identity)
            .await
            .map(|info| info.pre_shared_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_lookups() {
        let store = InMemorySecurityStore::new();
        store
            .add(SecurityInfo::new_psk("dev1", "dev1-id", vec![0x01, 0x02]))
            .await
            .unwrap();

        assert_eq!(store.get_by_endpoint("dev1").await.unwrap().identity, "dev1-id");
        assert_eq!(store.get_by_identity("dev1-id").await.unwrap().endpoint, "dev1");
        assert!(store.get_by_endpoint("dev2").await.is_none());
    }

    #[tokio::test]
    async fn test_identity_is_unique() {
        let store = InMemorySecurityStore::new();
        store.add(SecurityInfo::new_psk("dev1", "shared", vec![1])).await.unwrap();
        let result = store.add(SecurityInfo::new_psk("dev2", "shared", vec![2])).await;
        assert!(matches!(result, Err(Lwm2mError::InvalidData(_))));

        let replaced = store.add(SecurityInfo::new_psk("dev1", "shared", vec![3])).await.unwrap();
        assert_eq!(replaced.unwrap().pre_shared_key, vec![1]);
    }

    #[tokio::test]
    async fn test_psk_store() {
        let store = Arc::new(InMemorySecurityStore::new());
        store.add(SecurityInfo::new_psk("dev1", "id1", b"secret".to_vec())).await.unwrap();
        let psk = PskStore::new(store.clone());
        assert_eq!(psk.key("id1").await, Some(b"secret".to_vec()));
        assert_eq!(psk.key("unknown").await, None);

        let info = store.remove("dev1").await.unwrap();
        assert!(!format!("{:?}", info).contains("secret"));
        assert_eq!(psk.key("id1").await, None);
    }
}
