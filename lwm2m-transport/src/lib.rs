//! Transport layer contract for the LwM2M server
//!
//! The datagram transport and its secured channel live outside this
//! workspace. This crate defines what the server needs from them:
//!
//! - [`WireRequest`] / [`WireResponse`]: the request/response messages,
//!   correlated by a [`Token`] the transport echoes back unchanged
//! - [`RequestTransport`]: hands a request to one logical endpoint
//! - [`EndpointSet`]: the plain and secured endpoints sharing one dispatcher
//! - [`ChannelTransport`]: an in-process transport backed by a tokio channel

pub mod message;
pub mod transport;
pub mod channel;

pub use message::{Method, Token, TransportEvent, WireRequest, WireResponse};
pub use transport::{EndpointKind, EndpointSet, RequestTransport};
pub use channel::ChannelTransport;
