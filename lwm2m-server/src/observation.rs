//! Observation Registry
//!
//! Tracks the standing subscriptions opened by Observe requests, at most one
//! per (registration, path). Notifications are matched on the token of the
//! Observe request that opened the subscription.

use crate::content;
use crate::registry::{Client, ClientEvent, ClientRegistryListener};
use lwm2m_core::{ContentFormat, Lwm2mNode, Lwm2mPath, Lwm2mResult, ObjectModel, RegistryError};
use lwm2m_transport::Token;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// How many ended registrations are remembered to reject late observes
const RETIRED_CAPACITY: usize = 1024;

/// An active subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub registration_id: String,
    pub endpoint: String,
    pub path: Lwm2mPath,
    pub token: Token,
}

/// Receiver of observation notifications
pub trait ObservationListener: Send + Sync {
    /// A notification for `observation` carried a new value
    fn new_value(&self, observation: &Observation, value: &Lwm2mNode);

    /// The observation was removed
    fn cancelled(&self, _observation: &Observation) {}
}

/// Callback-based observation listener
pub struct CallbackObservationListener<F>
where
    F: Fn(&Observation, &Lwm2mNode) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackObservationListener<F>
where
    F: Fn(&Observation, &Lwm2mNode) + Send + Sync,
{
    #[must_use]
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ObservationListener for CallbackObservationListener<F>
where
    F: Fn(&Observation, &Lwm2mNode) + Send + Sync,
{
    fn new_value(&self, observation: &Observation, value: &Lwm2mNode) {
        (self.callback)(observation, value);
    }
}

#[derive(Debug, Default)]
struct ObservationTable {
    by_token: HashMap<Token, Observation>,
    by_registration: HashMap<String, HashMap<Lwm2mPath, Token>>,
    retired: HashSet<String>,
    retired_order: VecDeque<String>,
}

impl ObservationTable {
    fn retire(&mut self, registration_id: &str) {
        if self.retired.insert(registration_id.to_string()) {
            self.retired_order.push_back(registration_id.to_string());
            while self.retired_order.len() > RETIRED_CAPACITY {
                if let Some(oldest) = self.retired_order.pop_front() {
                    self.retired.remove(&oldest);
                }
            }
        }
    }
}

/// Active observations of all clients
pub struct ObservationRegistry {
    table: Mutex<ObservationTable>,
    listeners: RwLock<Vec<Arc<dyn ObservationListener>>>,
    model: Arc<ObjectModel>,
}

impl ObservationRegistry {
    pub fn new(model: Arc<ObjectModel>) -> Self {
        Self {
            table: Mutex::new(ObservationTable::default()),
            listeners: RwLock::new(Vec::new()),
            model,
        }
    }

    fn table(&self) -> MutexGuard<'_, ObservationTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> Vec<Arc<dyn ObservationListener>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn add_listener(&self, listener: Arc<dyn ObservationListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Record an observation of `path` on `client`
    ///
    /// Observing a path that is already observed replaces the token.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the client's registration has
    /// already ended and its observations were cancelled.
    pub fn observe(&self, client: &Client, path: Lwm2mPath, token: Token) -> Lwm2mResult<()> {
        let mut table = self.table();
        if table.retired.contains(&client.registration_id) {
            return Err(RegistryError::NotFound.into());
        }
        let previous = table
            .by_registration
            .entry(client.registration_id.clone())
            .or_default()
            .insert(path, token);
        if let Some(previous) = previous {
            table.by_token.remove(&previous);
        }
        table.by_token.insert(
            token,
            Observation {
                registration_id: client.registration_id.clone(),
                endpoint: client.endpoint.clone(),
                path,
                token,
            },
        );
        log::debug!("{} now observes {} with token {}", client.endpoint, path, token);
        Ok(())
    }

    /// Route a notification to the observation listeners
    ///
    /// Returns `false` if the token matches no observation or the payload
    /// cannot be decoded; both are logged and otherwise ignored.
    pub fn notification_received(&self, token: Token, format: Option<ContentFormat>, payload: &[u8]) -> bool {
        let Some(observation) = self.table().by_token.get(&token).cloned() else {
            log::debug!("Dropping notification with unknown token {}", token);
            return false;
        };
        let value = match content::decode(payload, format, &observation.path, &self.model) {
            Ok(value) => value,
            Err(e) => {
                log::warn!(
                    "Cannot decode notification of {} from {}: {}",
                    observation.path,
                    observation.endpoint,
                    e
                );
                return false;
            }
        };
        for listener in self.listeners() {
            listener.new_value(&observation, &value);
        }
        true
    }

    /// Remove all observations of a registration
    ///
    /// Observes for this registration arriving afterwards are rejected.
    /// Returns the number of observations removed.
    pub fn cancel_observations(&self, registration_id: &str) -> usize {
        let removed: Vec<Observation> = {
            let mut table = self.table();
            table.retire(registration_id);
            let tokens = table.by_registration.remove(registration_id).unwrap_or_default();
            tokens
                .values()
                .filter_map(|token| table.by_token.remove(token))
                .collect()
        };
        self.notify_cancelled(&removed);
        removed.len()
    }

    /// Remove the observation of one path
    pub fn cancel(&self, registration_id: &str, path: &Lwm2mPath) -> bool {
        let removed = {
            let mut table = self.table();
            let token = table
                .by_registration
                .get_mut(registration_id)
                .and_then(|paths| paths.remove(path));
            if table
                .by_registration
                .get(registration_id)
                .is_some_and(|paths| paths.is_empty())
            {
                table.by_registration.remove(registration_id);
            }
            token.and_then(|token| table.by_token.remove(&token))
        };
        match removed {
            Some(observation) => {
                self.notify_cancelled(std::slice::from_ref(&observation));
                true
            }
            None => false,
        }
    }

    /// Remove the observation registered under `token`
    pub fn cancel_token(&self, token: Token) -> bool {
        let removed = {
            let mut table = self.table();
            let removed = table.by_token.remove(&token);
            if let Some(observation) = &removed {
                if let Some(paths) = table.by_registration.get_mut(&observation.registration_id) {
                    if paths.get(&observation.path) == Some(&token) {
                        paths.remove(&observation.path);
                    }
                    if paths.is_empty() {
                        table.by_registration.remove(&observation.registration_id);
                    }
                }
            }
            removed
        };
        match removed {
            Some(observation) => {
                self.notify_cancelled(std::slice::from_ref(&observation));
                true
            }
            None => false,
        }
    }

    fn notify_cancelled(&self, observations: &[Observation]) {
        if observations.is_empty() {
            return;
        }
        let listeners = self.listeners();
        for observation in observations {
            log::debug!("Observation of {} on {} cancelled", observation.path, observation.endpoint);
            for listener in &listeners {
                listener.cancelled(observation);
            }
        }
    }

    /// Observations held for a registration
    pub fn observations_of(&self, registration_id: &str) -> Vec<Observation> {
        let table = self.table();
        table
            .by_registration
            .get(registration_id)
            .map(|paths| {
                paths
                    .values()
                    .filter_map(|token| table.by_token.get(token).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn find_by_token(&self, token: Token) -> Option<Observation> {
        self.table().by_token.get(&token).cloned()
    }

    pub fn len(&self) -> usize {
        self.table().by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cancels the observations of every client that leaves the registry
impl ClientRegistryListener for ObservationRegistry {
    fn on_event(&self, event: &ClientEvent) {
        if let ClientEvent::Unregistered(client) = event {
            let count = self.cancel_observations(&client.registration_id);
            if count > 0 {
                log::info!("Cancelled {} observation(s) of {}", count, client.endpoint);
            }
        }
    }
}
