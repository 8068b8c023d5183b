//! LwM2M server
//!
//! Server side of the LwM2M device-management protocol:
//!
//! - [`registry`]: the Client Registry and its lifecycle events
//! - [`registration`]: register/update/deregister message handling
//! - [`observation`]: standing subscriptions and notification routing
//! - [`dispatcher`]: downlink operations and response correlation
//! - [`server`]: the [`Lwm2mServer`] wiring all of the above

pub mod config;
pub mod content;
pub mod dispatcher;
pub mod observation;
pub mod registration;
pub mod registry;
pub mod security;
pub mod server;

pub use config::ServerConfig;
pub use dispatcher::{DownlinkRequest, DownlinkResponse, RequestDispatcher};
pub use observation::{CallbackObservationListener, Observation, ObservationListener, ObservationRegistry};
pub use registration::{
    DeregisterRequest, RegisterRequest, RegistrationHandler, RegistrationResponse, UpdateRequest,
};
pub use registry::{
    BindingMode, CallbackRegistryListener, ChannelRegistryListener, Client, ClientEvent, ClientRegistry,
    ClientRegistryListener, Clock, ManualClock, NewRegistration, RegistrationState, RegistrationUpdate,
    SystemClock,
};
pub use security::{InMemorySecurityStore, PskStore, SecurityInfo, SecurityStore};
pub use server::{Lwm2mServer, Lwm2mServerBuilder};
