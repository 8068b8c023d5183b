//! Client Registry
//!
//! Authoritative table of registered devices. All mutations (register,
//! update, deregister and the expiry sweep) are serialized by a single
//! table lock. Listeners are notified after the lock is released and
//! before the mutating call returns.

pub mod client;
pub mod clock;
pub mod events;

pub use client::{BindingMode, Client, DEFAULT_ROOT_PATH, RegistrationState, root_path_of};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{CallbackRegistryListener, ChannelRegistryListener, ClientEvent, ClientRegistryListener};

use lwm2m_core::{LinkObject, Lwm2mResult, RegistryError};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const REGISTRATION_ID_LENGTH: usize = 10;

/// Parameters of a new registration, already validated
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegistration {
    pub endpoint: String,
    pub address: SocketAddr,
    pub lifetime: u64,
    pub lwm2m_version: String,
    pub binding_mode: BindingMode,
    pub sms_number: Option<String>,
    pub object_links: Vec<LinkObject>,
    pub secure: bool,
}

/// Changes applied by an update
///
/// Fields left at `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationUpdate {
    pub address: Option<SocketAddr>,
    pub lifetime: Option<u64>,
    pub binding_mode: Option<BindingMode>,
    pub sms_number: Option<String>,
    pub object_links: Option<Vec<LinkObject>>,
}

impl RegistrationUpdate {
    pub fn lifetime(lifetime: u64) -> Self {
        Self {
            lifetime: Some(lifetime),
            ..Self::default()
        }
    }
}

/// Table of registered clients, keyed by endpoint name
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, Client>>,
    listeners: std::sync::RwLock<Vec<Arc<dyn ClientRegistryListener>>>,
    clock: Arc<dyn Clock>,
}

impl ClientRegistry {
    /// Create a registry driven by the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a registry with an injected clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            listeners: std::sync::RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Subscribe a listener to registry events
    pub fn add_listener(&self, listener: Arc<dyn ClientRegistryListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn notify(&self, event: ClientEvent) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.on_event(&event);
        }
    }

    /// Admit a new registration
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Conflict` if the endpoint is already registered.
    pub async fn register(&self, registration: NewRegistration) -> Lwm2mResult<Client> {
        let mut clients = self.clients.write().await;
        if clients.contains_key(&registration.endpoint) {
            return Err(RegistryError::Conflict.into());
        }

        let registration_id = loop {
            let candidate = new_registration_id();
            if !clients.values().any(|c| c.registration_id == candidate) {
                break candidate;
            }
        };
        let now = self.clock.now();
        let mut client = Client {
            endpoint: registration.endpoint,
            registration_id,
            address: registration.address,
            lifetime: registration.lifetime,
            lwm2m_version: registration.lwm2m_version,
            binding_mode: registration.binding_mode,
            sms_number: registration.sms_number,
            root_path: DEFAULT_ROOT_PATH.to_string(),
            object_links: Vec::new(),
            registration_date: now,
            last_update: now,
            secure: registration.secure,
            state: RegistrationState::Registered,
        };
        client.set_object_links(registration.object_links);
        clients.insert(client.endpoint.clone(), client.clone());
        drop(clients);

        log::info!(
            "New registration: {} as {} from {}",
            client.endpoint,
            client.registration_id,
            client.address
        );
        self.notify(ClientEvent::Registered(client.clone()));
        Ok(client)
    }

    /// Refresh a registration, applying only the supplied fields
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no registered client holds the
    /// registration id.
    pub async fn update(&self, registration_id: &str, update: RegistrationUpdate) -> Lwm2mResult<Client> {
        let mut clients = self.clients.write().await;
        let client = clients
            .values_mut()
            .find(|c| c.registration_id == registration_id)
            .ok_or(RegistryError::NotFound)?;

        if let Some(address) = update.address {
            client.address = address;
        }
        if let Some(lifetime) = update.lifetime {
            client.lifetime = lifetime;
        }
        if let Some(binding_mode) = update.binding_mode {
            client.binding_mode = binding_mode;
        }
        if let Some(sms_number) = update.sms_number {
            client.sms_number = Some(sms_number);
        }
        if let Some(links) = update.object_links {
            client.set_object_links(links);
        }
        client.last_update = self.clock.now();
        let client = client.clone();
        drop(clients);

        log::info!("Registration updated: {} ({})", client.endpoint, client.registration_id);
        self.notify(ClientEvent::Updated(client.clone()));
        Ok(client)
    }

    /// End a registration
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no registered client holds the
    /// registration id.
    pub async fn deregister(&self, registration_id: &str) -> Lwm2mResult<Client> {
        let mut clients = self.clients.write().await;
        let endpoint = clients
            .values()
            .find(|c| c.registration_id == registration_id)
            .map(|c| c.endpoint.clone())
            .ok_or(RegistryError::NotFound)?;
        let mut client = clients.remove(&endpoint).ok_or(RegistryError::NotFound)?;
        drop(clients);

        client.state = RegistrationState::Unregistered;
        log::info!("Deregistered: {} ({})", client.endpoint, client.registration_id);
        self.notify(ClientEvent::Unregistered(client.clone()));
        Ok(client)
    }

    pub async fn find_by_registration_id(&self, registration_id: &str) -> Option<Client> {
        let clients = self.clients.read().await;
        clients
            .values()
            .find(|c| c.registration_id == registration_id)
            .cloned()
    }

    pub async fn find_by_endpoint(&self, endpoint: &str) -> Option<Client> {
        let clients = self.clients.read().await;
        clients.get(endpoint).cloned()
    }

    pub async fn find_by_address(&self, address: SocketAddr) -> Option<Client> {
        let clients = self.clients.read().await;
        clients.values().find(|c| c.address == address).cloned()
    }

    /// Snapshot of all registered clients
    pub async fn all(&self) -> Vec<Client> {
        let clients = self.clients.read().await;
        clients.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Remove every client whose lifetime elapsed since its last update
    ///
    /// A client whose expiry cannot be evaluated is logged and kept; the
    /// others are still processed. Returns the removed clients.
    pub async fn clean_expired(&self) -> Vec<Client> {
        let now = self.clock.now();
        let mut clients = self.clients.write().await;
        let mut expired_endpoints = Vec::new();
        for client in clients.values() {
            match client.is_expired_at(now) {
                Ok(true) => expired_endpoints.push(client.endpoint.clone()),
                Ok(false) => {}
                Err(e) => log::warn!("Cannot evaluate expiry of {}: {}", client.endpoint, e),
            }
        }
        let expired: Vec<Client> = expired_endpoints
            .iter()
            .filter_map(|endpoint| clients.remove(endpoint))
            .map(|mut client| {
                client.state = RegistrationState::Unregistered;
                client
            })
            .collect();
        drop(clients);

        for client in &expired {
            log::info!("Registration expired: {} ({})", client.endpoint, client.registration_id);
            self.notify(ClientEvent::Unregistered(client.clone()));
        }
        expired
    }

    /// Spawn the recurring expiry sweep
    ///
    /// The first sweep runs one `period` after the call. Abort the returned
    /// handle to stop sweeping.
    pub fn start_expiry_sweep(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let expired = registry.clean_expired().await;
                if !expired.is_empty() {
                    log::debug!("Expiry sweep removed {} client(s)", expired.len());
                }
            }
        })
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn new_registration_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REGISTRATION_ID_LENGTH)
        .map(char::from)
        .collect()
}
