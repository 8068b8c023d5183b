//! In-process transport backed by a tokio channel
//!
//! Every request handed to a [`ChannelTransport`] is pushed onto an unbounded
//! channel. The receiving half plays the device side: it reads the requests
//! and answers by feeding responses back to the server.

use crate::message::WireRequest;
use crate::transport::RequestTransport;
use async_trait::async_trait;
use lwm2m_core::{Lwm2mError, Lwm2mResult};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<WireRequest>,
    secure: bool,
}

impl ChannelTransport {
    /// Create a transport and the receiver that observes its requests
    pub fn new(secure: bool) -> (Self, mpsc::UnboundedReceiver<WireRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender, secure }, receiver)
    }

    pub fn plain() -> (Self, mpsc::UnboundedReceiver<WireRequest>) {
        Self::new(false)
    }

    pub fn secure() -> (Self, mpsc::UnboundedReceiver<WireRequest>) {
        Self::new(true)
    }
}

#[async_trait]
impl RequestTransport for ChannelTransport {
    async fn send_request(&self, request: WireRequest) -> Lwm2mResult<()> {
        self.sender
            .send(request)
            .map_err(|_| Lwm2mError::Transport("channel closed".to_string()))
    }

    fn is_secure(&self) -> bool {
        self.secure
    }
}
