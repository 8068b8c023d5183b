//! Client registry events
//!
//! Every registration lifecycle transition is published as a [`ClientEvent`]
//! to the listeners subscribed on the registry.

use super::client::Client;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// A lifecycle transition of a registered client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A new registration was admitted
    Registered(Client),
    /// An existing registration was refreshed
    Updated(Client),
    /// The registration ended, by deregister or by expiry
    ///
    /// Fired exactly once per registration. The client is already absent
    /// from the registry when listeners see it.
    Unregistered(Client),
}

impl ClientEvent {
    pub fn client(&self) -> &Client {
        match self {
            Self::Registered(client) | Self::Updated(client) | Self::Unregistered(client) => client,
        }
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }

    #[must_use]
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }

    #[must_use]
    pub fn is_unregistered(&self) -> bool {
        matches!(self, Self::Unregistered(_))
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            Self::Registered(c) => format!("Client {} registered as {}", c.endpoint, c.registration_id),
            Self::Updated(c) => format!("Client {} updated registration {}", c.endpoint, c.registration_id),
            Self::Unregistered(c) => {
                format!("Client {} unregistered from {}", c.endpoint, c.registration_id)
            }
        }
    }
}

/// Listener for client registry events
///
/// Called from within the registering (or sweeping) context, after the
/// registry lock has been released. Implementations must not block.
pub trait ClientRegistryListener: Send + Sync {
    /// Called when a registry event occurs
    ///
    /// # Arguments
    /// * `event` - The event that occurred
    fn on_event(&self, event: &ClientEvent);
}

/// Callback-based registry listener
pub struct CallbackRegistryListener<F>
where
    F: Fn(&ClientEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackRegistryListener<F>
where
    F: Fn(&ClientEvent) + Send + Sync,
{
    /// Create a new callback-based listener
    ///
    /// # Arguments
    /// * `callback` - Function to call when an event occurs
    #[must_use]
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ClientRegistryListener for CallbackRegistryListener<F>
where
    F: Fn(&ClientEvent) + Send + Sync,
{
    fn on_event(&self, event: &ClientEvent) {
        (self.callback)(event);
    }
}

/// Listener forwarding registry events to a tokio mpsc channel
pub struct ChannelRegistryListener {
    tx: UnboundedSender<ClientEvent>,
}

impl ChannelRegistryListener {
    /// Create a new channel-based listener
    ///
    /// # Returns
    /// Returns the listener and a receiver for events.
    pub fn new() -> (Self, UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ClientRegistryListener for ChannelRegistryListener {
    fn on_event(&self, event: &ClientEvent) {
        // The receiver may have been dropped
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::client::{BindingMode, RegistrationState};
    use std::sync::Mutex;
    use std::time::SystemTime;

    fn client() -> Client {
        Client {
            endpoint: "dev1".to_string(),
            registration_id: "r1".to_string(),
            address: "127.0.0.1:5683".parse().unwrap(),
            lifetime: 60,
            lwm2m_version: "1.0".to_string(),
            binding_mode: BindingMode::U,
            sms_number: None,
            root_path: "/".to_string(),
            object_links: Vec::new(),
            registration_date: SystemTime::UNIX_EPOCH,
            last_update: SystemTime::UNIX_EPOCH,
            secure: false,
            state: RegistrationState::Registered,
        }
    }

    #[test]
    fn test_event_kinds() {
        let event = ClientEvent::Registered(client());
        assert!(event.is_registered());
        assert!(!event.is_unregistered());
        assert_eq!(event.client().endpoint, "dev1");
        assert!(ClientEvent::Unregistered(client()).description().contains("unregistered"));
    }

    #[test]
    fn test_callback_listener() {
        let seen = Mutex::new(Vec::new());
        let listener = CallbackRegistryListener::new(|event: &ClientEvent| {
            seen.lock().unwrap().push(event.client().registration_id.clone());
        });
        listener.on_event(&ClientEvent::Updated(client()));
        assert_eq!(*seen.lock().unwrap(), vec!["r1".to_string()]);
    }

    #[test]
    fn test_channel_listener() {
        let (listener, mut rx) = ChannelRegistryListener::new();
        listener.on_event(&ClientEvent::Registered(client()));
        assert!(rx.try_recv().unwrap().is_registered());

        drop(rx);
        listener.on_event(&ClientEvent::Updated(client()));
    }
}
