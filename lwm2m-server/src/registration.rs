//! Registration Handler
//!
//! Validates register, update and deregister messages against the client
//! registry and produces the protocol response. Holds no state besides its
//! collaborators.

use crate::config::ServerConfig;
use crate::registry::{BindingMode, ClientRegistry, NewRegistration, RegistrationUpdate};
use crate::security::SecurityStore;
use lwm2m_core::{LinkObject, Lwm2mError, Lwm2mResult, RegistryError, ResponseCode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

/// Register message received from a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub endpoint: String,
    /// Source address of the message
    pub source: SocketAddr,
    pub lifetime: Option<u64>,
    pub lwm2m_version: Option<String>,
    pub binding_mode: Option<String>,
    pub sms_number: Option<String>,
    pub object_links: Vec<LinkObject>,
    /// Received over the secured endpoint
    pub secure: bool,
    /// PSK identity the secured channel was authenticated with
    pub psk_identity: Option<String>,
}

impl RegisterRequest {
    pub fn new(endpoint: impl Into<String>, source: SocketAddr) -> Self {
        Self {
            endpoint: endpoint.into(),
            source,
            lifetime: None,
            lwm2m_version: None,
            binding_mode: None,
            sms_number: None,
            object_links: Vec::new(),
            secure: false,
            psk_identity: None,
        }
    }

    pub fn with_lifetime(mut self, lifetime: u64) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_binding_mode(mut self, binding_mode: impl Into<String>) -> Self {
        self.binding_mode = Some(binding_mode.into());
        self
    }

    pub fn with_links(mut self, links: Vec<LinkObject>) -> Self {
        self.object_links = links;
        self
    }

    /// Mark the message as received over the secured endpoint
    pub fn with_psk_identity(mut self, identity: impl Into<String>) -> Self {
        self.secure = true;
        self.psk_identity = Some(identity.into());
        self
    }
}

/// Update message received from a device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub registration_id: String,
    pub source: Option<SocketAddr>,
    pub lifetime: Option<u64>,
    pub binding_mode: Option<String>,
    pub sms_number: Option<String>,
    pub object_links: Option<Vec<LinkObject>>,
}

impl UpdateRequest {
    pub fn new(registration_id: impl Into<String>) -> Self {
        Self {
            registration_id: registration_id.into(),
            ..Self::default()
        }
    }

    pub fn with_lifetime(mut self, lifetime: u64) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_source(mut self, source: SocketAddr) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_links(mut self, links: Vec<LinkObject>) -> Self {
        self.object_links = Some(links);
        self
    }
}

/// Deregister message received from a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregisterRequest {
    pub registration_id: String,
}

impl DeregisterRequest {
    pub fn new(registration_id: impl Into<String>) -> Self {
        Self {
            registration_id: registration_id.into(),
        }
    }
}

/// Response sent back for a registration message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub code: ResponseCode,
    /// Location of the new registration, on success of a register
    pub location: Option<String>,
    pub registration_id: Option<String>,
}

impl RegistrationResponse {
    pub fn new(code: ResponseCode) -> Self {
        Self {
            code,
            location: None,
            registration_id: None,
        }
    }

    fn created(registration_id: String, location: String) -> Self {
        Self {
            code: ResponseCode::Created,
            location: Some(location),
            registration_id: Some(registration_id),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

pub struct RegistrationHandler {
    registry: Arc<ClientRegistry>,
    security: Arc<dyn SecurityStore>,
    config: ServerConfig,
}

impl RegistrationHandler {
    pub fn new(registry: Arc<ClientRegistry>, security: Arc<dyn SecurityStore>, config: ServerConfig) -> Self {
        Self {
            registry,
            security,
            config,
        }
    }

    /// Handle a register message
    pub async fn register(&self, request: RegisterRequest) -> RegistrationResponse {
        match self.try_register(request).await {
            Ok(response) => response,
            Err(e) => RegistrationResponse::new(e.response_code()),
        }
    }

    async fn try_register(&self, request: RegisterRequest) -> Lwm2mResult<RegistrationResponse> {
        if request.endpoint.is_empty() {
            log::debug!("Rejecting register without endpoint from {}", request.source);
            return Err(Lwm2mError::Protocol(ResponseCode::BadRequest));
        }
        let lifetime = request.lifetime.unwrap_or(self.config.default_lifetime);
        self.check_lifetime(lifetime)?;
        let binding_mode = match &request.binding_mode {
            Some(binding) => parse_binding(binding)?,
            None => self.config.default_binding,
        };
        self.check_security(&request).await?;

        let registration = NewRegistration {
            endpoint: request.endpoint,
            address: request.source,
            lifetime,
            lwm2m_version: request.lwm2m_version.unwrap_or_else(|| "1.0".to_string()),
            binding_mode,
            sms_number: request.sms_number,
            object_links: request.object_links,
            secure: request.secure,
        };
        let client = self.registry.register(registration).await?;
        Ok(RegistrationResponse::created(client.registration_id.clone(), client.location()))
    }

    async fn check_security(&self, request: &RegisterRequest) -> Lwm2mResult<()> {
        let forbidden = Err(Lwm2mError::Protocol(ResponseCode::Forbidden));
        match self.security.get_by_endpoint(&request.endpoint).await {
            Some(info) => {
                if !request.secure {
                    log::warn!("{} must register over the secured endpoint", request.endpoint);
                    return forbidden;
                }
                if request.psk_identity.as_deref() != Some(info.identity.as_str()) {
                    log::warn!("Invalid PSK identity for {}", request.endpoint);
                    return forbidden;
                }
                Ok(())
            }
            None if request.secure => {
                log::warn!("No security info for {} registering over the secured endpoint", request.endpoint);
                forbidden
            }
            None => Ok(()),
        }
    }

    fn check_lifetime(&self, lifetime: u64) -> Lwm2mResult<()> {
        if lifetime < self.config.min_lifetime {
            log::debug!("Rejecting lifetime {} below {}", lifetime, self.config.min_lifetime);
            return Err(Lwm2mError::Protocol(ResponseCode::BadRequest));
        }
        Ok(())
    }

    /// Handle an update message
    ///
    /// An unknown registration id is answered with BAD_REQUEST.
    pub async fn update(&self, request: UpdateRequest) -> RegistrationResponse {
        match self.try_update(request).await {
            Ok(()) => RegistrationResponse::new(ResponseCode::Changed),
            Err(Lwm2mError::Registry(RegistryError::NotFound)) => {
                RegistrationResponse::new(ResponseCode::BadRequest)
            }
            Err(e) => RegistrationResponse::new(e.response_code()),
        }
    }

    async fn try_update(&self, request: UpdateRequest) -> Lwm2mResult<()> {
        if let Some(lifetime) = request.lifetime {
            self.check_lifetime(lifetime)?;
        }
        let binding_mode = request.binding_mode.as_deref().map(parse_binding).transpose()?;
        let update = RegistrationUpdate {
            address: request.source,
            lifetime: request.lifetime,
            binding_mode,
            sms_number: request.sms_number,
            object_links: request.object_links,
        };
        self.registry.update(&request.registration_id, update).await?;
        Ok(())
    }

    /// Handle a deregister message
    ///
    /// An unknown registration id is answered with BAD_REQUEST.
    pub async fn deregister(&self, request: DeregisterRequest) -> RegistrationResponse {
        match self.registry.deregister(&request.registration_id).await {
            Ok(_) => RegistrationResponse::new(ResponseCode::Deleted),
            Err(Lwm2mError::Registry(RegistryError::NotFound)) => {
                RegistrationResponse::new(ResponseCode::BadRequest)
            }
            Err(e) => RegistrationResponse::new(e.response_code()),
        }
    }
}

fn parse_binding(binding: &str) -> Lwm2mResult<BindingMode> {
    binding
        .parse()
        .map_err(|_| Lwm2mError::Protocol(ResponseCode::BadRequest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{InMemorySecurityStore, SecurityInfo};

    fn source() -> SocketAddr {
        "192.168.1.20:56830".parse().unwrap()
    }

    fn handler() -> (RegistrationHandler, Arc<ClientRegistry>, Arc<InMemorySecurityStore>) {
        let registry = Arc::new(ClientRegistry::new());
        let security = Arc::new(InMemorySecurityStore::new());
        let handler = RegistrationHandler::new(registry.clone(), security.clone(), ServerConfig::default());
        (handler, registry, security)
    }

    #[tokio::test]
    async fn test_register_defaults() {
        let (handler, registry, _) = handler();
        let response = handler.register(RegisterRequest::new("dev1", source())).await;
        assert_eq!(response.code, ResponseCode::Created);
        let id = response.registration_id.unwrap();
        assert_eq!(response.location, Some(format!("/rd/{}", id)));

        let client = registry.find_by_endpoint("dev1").await.unwrap();
        assert_eq!(client.lifetime, 86_400);
        assert_eq!(client.lwm2m_version, "1.0");
        assert_eq!(client.binding_mode, BindingMode::U);
        assert_eq!(client.address, source());
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let (handler, _, _) = handler();
        assert!(handler.register(RegisterRequest::new("dev1", source())).await.is_success());
        let response = handler.register(RegisterRequest::new("dev1", source())).await;
        assert_eq!(response.code, ResponseCode::Conflict);
        assert!(response.location.is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_parameters() {
        let (handler, registry, _) = handler();
        let response = handler.register(RegisterRequest::new("", source())).await;
        assert_eq!(response.code, ResponseCode::BadRequest);

        let response = handler
            .register(RegisterRequest::new("dev1", source()).with_binding_mode("X"))
            .await;
        assert_eq!(response.code, ResponseCode::BadRequest);

        let response = handler
            .register(RegisterRequest::new("dev1", source()).with_lifetime(0))
            .await;
        assert_eq!(response.code, ResponseCode::BadRequest);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_and_deregister() {
        let (handler, registry, _) = handler();
        let response = handler
            .register(RegisterRequest::new("dev1", source()).with_lifetime(60))
            .await;
        let id = response.registration_id.unwrap();

        let response = handler.update(UpdateRequest::new(id.clone()).with_lifetime(120)).await;
        assert_eq!(response.code, ResponseCode::Changed);
        assert_eq!(registry.find_by_endpoint("dev1").await.unwrap().lifetime, 120);

        let response = handler.deregister(DeregisterRequest::new(id.clone())).await;
        assert_eq!(response.code, ResponseCode::Deleted);

        let response = handler.update(UpdateRequest::new(id.clone())).await;
        assert_eq!(response.code, ResponseCode::BadRequest);
        let response = handler.deregister(DeregisterRequest::new(id)).await;
        assert_eq!(response.code, ResponseCode::BadRequest);
    }

    #[tokio::test]
    async fn test_update_links_moves_root_path() {
        let (handler, registry, _) = handler();
        let id = handler
            .register(RegisterRequest::new("dev1", source()))
            .await
            .registration_id
            .unwrap();
        let links = LinkObject::parse(r#"</dm>;rt="oma.lwm2m",</dm/3/0>"#).unwrap();
        handler.update(UpdateRequest::new(id).with_links(links)).await;
        assert_eq!(registry.find_by_endpoint("dev1").await.unwrap().root_path, "/dm");
    }

    #[tokio::test]
    async fn test_security_checks() {
        let (handler, _, security) = handler();
        security
            .add(SecurityInfo::new_psk("secured", "secured-id", vec![0x0A]))
            .await
            .unwrap();

        let response = handler.register(RegisterRequest::new("secured", source())).await;
        assert_eq!(response.code, ResponseCode::Forbidden);

        let response = handler
            .register(RegisterRequest::new("secured", source()).with_psk_identity("other-id"))
            .await;
        assert_eq!(response.code, ResponseCode::Forbidden);

        let response = handler
            .register(RegisterRequest::new("plain", source()).with_psk_identity("plain-id"))
            .await;
        assert_eq!(response.code, ResponseCode::Forbidden);

        let response = handler
            .register(RegisterRequest::new("secured", source()).with_psk_identity("secured-id"))
            .await;
        assert_eq!(response.code, ResponseCode::Created);
    }
}
