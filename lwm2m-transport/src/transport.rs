//! Request transport trait and the plain/secured endpoint pair

use crate::message::WireRequest;
use async_trait::async_trait;
use lwm2m_core::{Lwm2mError, Lwm2mResult};
use std::fmt;
use std::sync::Arc;

/// Which logical endpoint a request goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Plain,
    Secure,
}

impl EndpointKind {
    pub fn from_secure(secure: bool) -> Self {
        if secure { EndpointKind::Secure } else { EndpointKind::Plain }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Plain => f.write_str("plain"),
            EndpointKind::Secure => f.write_str("secure"),
        }
    }
}

/// A channel able to deliver requests to devices
///
/// Implementations only hand the request off. The response (or a failure
/// for the same token) comes back later as a
/// [`TransportEvent`](crate::TransportEvent) fed to the server.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Send a request
    ///
    /// # Arguments
    ///
    /// * `request` - The request, carrying the token the response will echo
    ///
    /// # Errors
    ///
    /// Returns `Lwm2mError::Transport` if the request could not be handed off.
    async fn send_request(&self, request: WireRequest) -> Lwm2mResult<()>;

    /// Whether this transport is the secured channel
    fn is_secure(&self) -> bool;
}

/// The plain endpoint and the optional secured endpoint of one server
#[derive(Clone)]
pub struct EndpointSet {
    plain: Arc<dyn RequestTransport>,
    secure: Option<Arc<dyn RequestTransport>>,
}

impl EndpointSet {
    pub fn new(plain: Arc<dyn RequestTransport>) -> Self {
        Self { plain, secure: None }
    }

    pub fn with_secure(mut self, secure: Arc<dyn RequestTransport>) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn has_secure(&self) -> bool {
        self.secure.is_some()
    }

    /// Select the endpoint for a client
    ///
    /// # Errors
    ///
    /// Returns `Lwm2mError::Transport` if the secured endpoint is requested
    /// but none is configured.
    pub fn select(&self, kind: EndpointKind) -> Lwm2mResult<&Arc<dyn RequestTransport>> {
        match kind {
            EndpointKind::Plain => Ok(&self.plain),
            EndpointKind::Secure => self
                .secure
                .as_ref()
                .ok_or_else(|| Lwm2mError::Transport("no secure endpoint configured".to_string())),
        }
    }

    /// Send a request through the selected endpoint
    pub async fn send(&self, kind: EndpointKind, request: WireRequest) -> Lwm2mResult<()> {
        self.select(kind)?.send_request(request).await
    }
}

impl fmt::Debug for EndpointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointSet")
            .field("secure", &self.secure.is_some())
            .finish()
    }
}
