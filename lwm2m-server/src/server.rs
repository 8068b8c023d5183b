//! LwM2M server
//!
//! Wires the client registry, the registration handler, the observation
//! registry and the request dispatcher together behind one handle.

use crate::config::ServerConfig;
use crate::dispatcher::{DownlinkRequest, DownlinkResponse, RequestDispatcher};
use crate::observation::{ObservationListener, ObservationRegistry};
use crate::registration::{
    DeregisterRequest, RegisterRequest, RegistrationHandler, RegistrationResponse, UpdateRequest,
};
use crate::registry::{Client, ClientRegistry, ClientRegistryListener, Clock, SystemClock};
use crate::security::{InMemorySecurityStore, PskStore, SecurityStore};
use lwm2m_core::{Lwm2mError, Lwm2mPath, Lwm2mResult, ObjectModel, RegistryError};
use lwm2m_transport::{EndpointSet, RequestTransport, TransportEvent};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// LwM2M server
///
/// # Usage Example
/// ```ignore
/// use lwm2m_server::Lwm2mServer;
///
/// let server = Lwm2mServer::builder()
///     .plain_transport(my_transport)
///     .build()?;
/// server.start();
///
/// // Feed every inbound response or transport failure to the server
/// server.handle_transport_event(event);
/// ```
pub struct Lwm2mServer {
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    observations: Arc<ObservationRegistry>,
    dispatcher: Arc<RequestDispatcher>,
    registration: RegistrationHandler,
    security: Arc<dyn SecurityStore>,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl Lwm2mServer {
    pub fn builder() -> Lwm2mServerBuilder {
        Lwm2mServerBuilder::default()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Start the registration expiry sweep
    ///
    /// Must be called from within a tokio runtime. Starting a running
    /// server has no effect.
    pub fn start(&self) {
        let mut sweep = self.sweep.lock().unwrap_or_else(PoisonError::into_inner);
        if sweep.is_none() {
            *sweep = Some(self.registry.start_expiry_sweep(self.config.expiry_period));
            log::info!(
                "LwM2M server started on {} (secure {})",
                self.config.plain_address,
                self.config.secure_address
            );
        }
    }

    /// Stop the registration expiry sweep
    pub fn stop(&self) {
        if let Some(sweep) = self.sweep.lock().unwrap_or_else(PoisonError::into_inner).take() {
            sweep.abort();
            log::info!("LwM2M server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.sweep
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub async fn handle_register(&self, request: RegisterRequest) -> RegistrationResponse {
        self.registration.register(request).await
    }

    pub async fn handle_update(&self, request: UpdateRequest) -> RegistrationResponse {
        self.registration.update(request).await
    }

    pub async fn handle_deregister(&self, request: DeregisterRequest) -> RegistrationResponse {
        self.registration.deregister(request).await
    }

    /// Route an inbound transport event
    ///
    /// Events completing a pending request go to the dispatcher. Remaining
    /// responses are treated as notifications of an observation. Returns
    /// whether the event was consumed.
    pub fn handle_transport_event(&self, event: TransportEvent) -> bool {
        let notification = match &event {
            TransportEvent::Response(response) if !self.dispatcher.is_pending(response.token) => {
                Some(response.clone())
            }
            _ => None,
        };
        match notification {
            Some(response) => {
                self.observations
                    .notification_received(response.token, response.content_format, &response.payload)
            }
            None => self.dispatcher.handle_event(event),
        }
    }

    /// Send a request to a client and wait for the answer
    ///
    /// Uses the configured request timeout when `timeout` is `None`.
    pub async fn send(
        &self,
        endpoint: &str,
        request: DownlinkRequest,
        timeout: Option<Duration>,
    ) -> Lwm2mResult<DownlinkResponse> {
        self.dispatcher.send(endpoint, request, timeout).await
    }

    /// Send a request to a client, delivering the answer to a callback
    pub fn send_with_callback<S, F>(
        &self,
        endpoint: impl Into<String>,
        request: DownlinkRequest,
        timeout: Option<Duration>,
        on_success: S,
        on_failure: F,
    ) -> JoinHandle<()>
    where
        S: FnOnce(DownlinkResponse) + Send + 'static,
        F: FnOnce(Lwm2mError) + Send + 'static,
    {
        self.dispatcher
            .send_with_callback(endpoint, request, timeout, on_success, on_failure)
    }

    /// Stop observing a path of a client
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the client is not registered.
    pub async fn cancel_observation(&self, endpoint: &str, path: &Lwm2mPath) -> Lwm2mResult<bool> {
        let client = self
            .registry
            .find_by_endpoint(endpoint)
            .await
            .ok_or(RegistryError::NotFound)?;
        Ok(self.observations.cancel(&client.registration_id, path))
    }

    pub async fn client(&self, endpoint: &str) -> Option<Client> {
        self.registry.find_by_endpoint(endpoint).await
    }

    pub fn client_registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn observation_registry(&self) -> &Arc<ObservationRegistry> {
        &self.observations
    }

    pub fn add_registry_listener(&self, listener: Arc<dyn ClientRegistryListener>) {
        self.registry.add_listener(listener);
    }

    pub fn add_observation_listener(&self, listener: Arc<dyn ObservationListener>) {
        self.observations.add_listener(listener);
    }

    /// Key lookup for the DTLS handshake of the secured endpoint
    pub fn psk_store(&self) -> PskStore {
        PskStore::new(Arc::clone(&self.security))
    }
}

impl Drop for Lwm2mServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for [`Lwm2mServer`]
#[derive(Default)]
pub struct Lwm2mServerBuilder {
    config: Option<ServerConfig>,
    model: Option<ObjectModel>,
    plain: Option<Arc<dyn RequestTransport>>,
    secure: Option<Arc<dyn RequestTransport>>,
    security: Option<Arc<dyn SecurityStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Lwm2mServerBuilder {
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn object_model(mut self, model: ObjectModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn plain_transport(mut self, transport: Arc<dyn RequestTransport>) -> Self {
        self.plain = Some(transport);
        self
    }

    pub fn secure_transport(mut self, transport: Arc<dyn RequestTransport>) -> Self {
        self.secure = Some(transport);
        self
    }

    pub fn security_store(mut self, store: Arc<dyn SecurityStore>) -> Self {
        self.security = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the server
    ///
    /// # Errors
    ///
    /// Returns `Lwm2mError::InvalidData` if no plain transport was given or
    /// the secure transport does not report itself as secured.
    pub fn build(self) -> Lwm2mResult<Lwm2mServer> {
        let plain = self
            .plain
            .ok_or_else(|| Lwm2mError::InvalidData("a plain transport is required".to_string()))?;
        let mut endpoints = EndpointSet::new(plain);
        if let Some(secure) = self.secure {
            if !secure.is_secure() {
                return Err(Lwm2mError::InvalidData(
                    "the secure transport must be a secured channel".to_string(),
                ));
            }
            endpoints = endpoints.with_secure(secure);
        }

        let config = self.config.unwrap_or_default();
        let model = Arc::new(self.model.unwrap_or_default());
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let security = self
            .security
            .unwrap_or_else(|| Arc::new(InMemorySecurityStore::new()));

        let registry = Arc::new(ClientRegistry::with_clock(clock));
        let observations = Arc::new(ObservationRegistry::new(model.clone()));
        registry.add_listener(observations.clone());

        let dispatcher = Arc::new(RequestDispatcher::new(
            registry.clone(),
            observations.clone(),
            endpoints,
            model,
            config.request_timeout,
        ));
        let registration = RegistrationHandler::new(registry.clone(), security.clone(), config.clone());

        Ok(Lwm2mServer {
            config,
            registry,
            observations,
            dispatcher,
            registration,
            security,
            sweep: Mutex::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_transport::ChannelTransport;

    #[test]
    fn test_build_requires_plain_transport() {
        assert!(matches!(Lwm2mServer::builder().build(), Err(Lwm2mError::InvalidData(_))));
    }

    #[test]
    fn test_secure_transport_must_be_secured() {
        let (plain, _rx) = ChannelTransport::plain();
        let (fake, _fake_rx) = ChannelTransport::plain();
        let result = Lwm2mServer::builder()
            .plain_transport(Arc::new(plain))
            .secure_transport(Arc::new(fake))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_start_stop() {
        let (plain, _rx) = ChannelTransport::plain();
        let server = Lwm2mServer::builder()
            .plain_transport(Arc::new(plain))
            .build()
            .unwrap();
        assert!(!server.is_running());
        server.start();
        server.start();
        assert!(server.is_running());
        server.stop();
        assert!(!server.is_running());
    }
}
