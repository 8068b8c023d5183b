//! Request Dispatcher
//!
//! Turns a [`DownlinkRequest`] into a wire request addressed at a registered
//! client, hands it to the transport and correlates the answer (or the
//! transport failure, or the timeout) back to the caller.
//!
//! Both the awaiting [`RequestDispatcher::send`] and the callback-based
//! [`RequestDispatcher::send_with_callback`] share one [`PendingRequests`]
//! table. Entries are inserted before the request reaches the transport
//! and removed when the caller stops waiting, whether it timed out or its
//! task was aborted. A successful Observe opens its observation while the
//! response is being handled, so notifications that follow on the same
//! token are routed even before the caller resumes.

pub mod builder;
pub mod pending;
pub mod request;

pub use builder::build_wire_request;
pub use pending::{Completion, ObserveTarget, PendingGuard, PendingRequests};
pub use request::{DownlinkRequest, DownlinkResponse};

use crate::content;
use crate::observation::ObservationRegistry;
use crate::registry::{Client, ClientRegistry};
use lwm2m_core::{LinkObject, Lwm2mError, Lwm2mResult, ObjectModel, RegistryError, ResponseCode};
use lwm2m_transport::{EndpointSet, Token, TransportEvent, WireResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct RequestDispatcher {
    registry: Arc<ClientRegistry>,
    observations: Arc<ObservationRegistry>,
    endpoints: EndpointSet,
    pending: PendingRequests,
    model: Arc<ObjectModel>,
    default_timeout: Duration,
}

impl RequestDispatcher {
    pub fn new(
        registry: Arc<ClientRegistry>,
        observations: Arc<ObservationRegistry>,
        endpoints: EndpointSet,
        model: Arc<ObjectModel>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            observations,
            endpoints,
            pending: PendingRequests::new(),
            model,
            default_timeout,
        }
    }

    /// Send a request to a registered client and wait for its answer
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Endpoint name of the target client
    /// * `request` - The operation to perform
    /// * `timeout` - How long to wait; the configured default when `None`
    ///
    /// # Errors
    ///
    /// - `RegistryError::NotFound` if the client is not registered
    /// - `Lwm2mError::InvalidData` if the request does not fit its target
    /// - `Lwm2mError::Transport` if the request could not be delivered
    /// - `Lwm2mError::Timeout` if no answer arrived in time
    /// - `Lwm2mError::Protocol` if the client rejected the operation
    /// - `Lwm2mError::MalformedPayload` if the answer cannot be decoded
    pub async fn send(
        &self,
        endpoint: &str,
        request: DownlinkRequest,
        timeout: Option<Duration>,
    ) -> Lwm2mResult<DownlinkResponse> {
        let client = self
            .registry
            .find_by_endpoint(endpoint)
            .await
            .ok_or(RegistryError::NotFound)?;

        let observe = match &request {
            DownlinkRequest::Observe { path, .. } => Some(ObserveTarget {
                client: client.clone(),
                path: *path,
            }),
            _ => None,
        };
        let (token, receiver) = self.pending.insert(&client.endpoint, observe);
        let _guard = PendingGuard::new(&self.pending, token);
        let wire = build_wire_request(&request, &client, token)?;
        log::debug!("{} {} to {} with token {}", request.name(), wire.uri(), client.endpoint, token);

        if let Err(e) = self.endpoints.send(client.endpoint_kind(), wire).await {
            log::warn!("Cannot send {} to {}: {}", request.name(), client.endpoint, e);
            return Err(e);
        }

        let timeout = timeout.unwrap_or(self.default_timeout);
        let response = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(completion)) => completion?,
            Ok(Err(_)) => {
                return Err(Lwm2mError::Transport("request abandoned".to_string()));
            }
            Err(_) => {
                log::debug!("{} to {} timed out after {:?}", request.name(), client.endpoint, timeout);
                return Err(Lwm2mError::Timeout);
            }
        };
        self.decode_response(&request, &client, token, response)
    }

    /// Send a request and deliver the outcome to exactly one callback
    ///
    /// Returns immediately. The callback runs on a spawned task, never in
    /// the calling context.
    pub fn send_with_callback<S, F>(
        self: &Arc<Self>,
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
        let dispatcher = Arc::clone(self);
        let endpoint = endpoint.into();
        tokio::spawn(async move {
            match dispatcher.send(&endpoint, request, timeout).await {
                Ok(response) => on_success(response),
                Err(e) => on_failure(e),
            }
        })
    }

    /// Complete the pending request an inbound transport event belongs to
    ///
    /// Returns `false` if no request is pending for the event's token; a
    /// late or duplicated response is thus a no-op.
    ///
    /// A Content answer to an Observe records the observation before the
    /// caller is woken.
    pub fn handle_event(&self, event: TransportEvent) -> bool {
        let token = event.token();
        let Some(entry) = self.pending.take(token) else {
            log::debug!("No pending request for token {}", token);
            return false;
        };
        let completion = match event {
            TransportEvent::Response(response) => match entry.observe_target() {
                Some(target) if response.code == ResponseCode::Content => self
                    .observations
                    .observe(&target.client, target.path, token)
                    .map(|()| response),
                _ => Ok(response),
            },
            TransportEvent::Failure { reason, .. } => Err(Lwm2mError::Transport(reason)),
        };
        entry.complete(token, completion);
        true
    }

    /// Whether a request is waiting for `token`
    pub fn is_pending(&self, token: Token) -> bool {
        self.pending.contains(token)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn decode_response(
        &self,
        request: &DownlinkRequest,
        client: &Client,
        token: Token,
        response: WireResponse,
    ) -> Lwm2mResult<DownlinkResponse> {
        let code = response.code;
        if code != request.expected_code() {
            log::debug!("{} on {} answered {}", request.name(), client.endpoint, code);
            return Err(Lwm2mError::Protocol(code));
        }

        let decoded = match request {
            DownlinkRequest::Read { path, .. } => DownlinkResponse::Read {
                code,
                content: content::decode(&response.payload, response.content_format, path, &self.model)?,
            },
            DownlinkRequest::Observe { path, .. } => {
                match content::decode(&response.payload, response.content_format, path, &self.model) {
                    Ok(content) => DownlinkResponse::Observe { code, content },
                    Err(e) => {
                        self.observations.cancel_token(token);
                        return Err(e);
                    }
                }
            }
            DownlinkRequest::Discover { .. } => {
                let body = std::str::from_utf8(&response.payload)
                    .map_err(|e| Lwm2mError::malformed(format!("link format is not UTF-8: {}", e)))?;
                DownlinkResponse::Discover {
                    code,
                    links: LinkObject::parse(body)?,
                }
            }
            DownlinkRequest::Create { .. } => DownlinkResponse::Create {
                code,
                location: response.location_path,
            },
            DownlinkRequest::Write { .. } => DownlinkResponse::Write { code },
            DownlinkRequest::WriteAttributes { .. } => DownlinkResponse::WriteAttributes { code },
            DownlinkRequest::Execute { .. } => DownlinkResponse::Execute { code },
            DownlinkRequest::Delete { .. } => DownlinkResponse::Delete { code },
        };
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BindingMode, NewRegistration};
    use lwm2m_core::{ContentFormat, Lwm2mPath, ResponseCode, Value};
    use lwm2m_transport::{ChannelTransport, WireRequest};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        dispatcher: Arc<RequestDispatcher>,
        registry: Arc<ClientRegistry>,
        observations: Arc<ObservationRegistry>,
        requests: UnboundedReceiver<WireRequest>,
    }

    async fn fixture() -> Fixture {
        let model = Arc::new(ObjectModel::default());
        let registry = Arc::new(ClientRegistry::new());
        let observations = Arc::new(ObservationRegistry::new(model.clone()));
        let (transport, requests) = ChannelTransport::plain();
        let dispatcher = Arc::new(RequestDispatcher::new(
            registry.clone(),
            observations.clone(),
            EndpointSet::new(Arc::new(transport)),
            model,
            Duration::from_secs(5),
        ));
        registry
            .register(NewRegistration {
                endpoint: "dev1".to_string(),
                address: "127.0.0.1:40000".parse().unwrap(),
                lifetime: 60,
                lwm2m_version: "1.0".to_string(),
                binding_mode: BindingMode::U,
                sms_number: None,
                object_links: Vec::new(),
                secure: false,
            })
            .await
            .unwrap();
        Fixture {
            dispatcher,
            registry,
            observations,
            requests,
        }
    }

    #[tokio::test]
    async fn test_read_round_trip() {
        let mut f = fixture().await;
        let dispatcher = f.dispatcher.clone();
        let call = tokio::spawn(async move {
            dispatcher
                .send("dev1", DownlinkRequest::read(Lwm2mPath::resource(3, 0, 9)), None)
                .await
        });

        let wire = f.requests.recv().await.unwrap();
        assert_eq!(wire.uri_path, "/3/0/9");
        let response = WireResponse::new(wire.token, ResponseCode::Content)
            .with_payload(ContentFormat::Text, b"75".to_vec());
        assert!(f.dispatcher.handle_event(TransportEvent::Response(response)));

        let response = call.await.unwrap().unwrap();
        assert_eq!(
            response.content().unwrap().as_resource().unwrap().single_value(),
            Some(&Value::new_integer(75))
        );
        assert_eq!(f.dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let f = fixture().await;
        let result = f
            .dispatcher
            .send("nobody", DownlinkRequest::read(Lwm2mPath::object(3)), None)
            .await;
        assert!(matches!(result, Err(Lwm2mError::Registry(RegistryError::NotFound))));
    }

    #[tokio::test]
    async fn test_error_code_is_protocol_error() {
        let mut f = fixture().await;
        let dispatcher = f.dispatcher.clone();
        let call = tokio::spawn(async move {
            dispatcher
                .send("dev1", DownlinkRequest::delete(Lwm2mPath::object_instance(3, 0)), None)
                .await
        });
        let wire = f.requests.recv().await.unwrap();
        f.dispatcher.handle_event(TransportEvent::Response(WireResponse::new(
            wire.token,
            ResponseCode::MethodNotAllowed,
        )));
        assert!(matches!(
            call.await.unwrap(),
            Err(Lwm2mError::Protocol(ResponseCode::MethodNotAllowed))
        ));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let mut f = fixture().await;
        let dispatcher = f.dispatcher.clone();
        let call = tokio::spawn(async move {
            dispatcher
                .send("dev1", DownlinkRequest::execute(Lwm2mPath::resource(3, 0, 4)), None)
                .await
        });
        let wire = f.requests.recv().await.unwrap();
        f.dispatcher.handle_event(TransportEvent::Failure {
            token: wire.token,
            reason: "connection reset".to_string(),
        });
        assert!(matches!(call.await.unwrap(), Err(Lwm2mError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_discards_late_response() {
        let mut f = fixture().await;
        let result = f
            .dispatcher
            .send(
                "dev1",
                DownlinkRequest::read(Lwm2mPath::object(3)),
                Some(Duration::from_millis(500)),
            )
            .await;
        assert!(matches!(result, Err(Lwm2mError::Timeout)));

        let wire = f.requests.recv().await.unwrap();
        assert!(!f.dispatcher.is_pending(wire.token));
        let late = WireResponse::new(wire.token, ResponseCode::Content);
        assert!(!f.dispatcher.handle_event(TransportEvent::Response(late)));
    }

    #[tokio::test]
    async fn test_callback_delivery() {
        let mut f = fixture().await;
        let (tx, rx) = tokio::sync::oneshot::channel();
        let failure_tx = Arc::new(std::sync::Mutex::new(None::<Lwm2mError>));
        let failures = failure_tx.clone();
        let handle = f.dispatcher.send_with_callback(
            "dev1",
            DownlinkRequest::discover(Lwm2mPath::object(3)),
            None,
            move |response| {
                let _ = tx.send(response);
            },
            move |e| {
                *failures.lock().unwrap() = Some(e);
            },
        );

        let wire = f.requests.recv().await.unwrap();
        assert_eq!(wire.accept, Some(ContentFormat::Link));
        let response = WireResponse::new(wire.token, ResponseCode::Content)
            .with_payload(ContentFormat::Link, b"</3/0>,</3/0/1>".to_vec());
        f.dispatcher.handle_event(TransportEvent::Response(response));

        let response = rx.await.unwrap();
        assert_eq!(response.links().unwrap().len(), 2);
        handle.await.unwrap();
        assert!(failure_tx.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_observe_registers_observation() {
        let mut f = fixture().await;
        let dispatcher = f.dispatcher.clone();
        let path = Lwm2mPath::resource(3, 0, 9);
        let call = tokio::spawn(async move { dispatcher.send("dev1", DownlinkRequest::observe(path), None).await });

        let wire = f.requests.recv().await.unwrap();
        assert!(wire.observe);
        let response = WireResponse::new(wire.token, ResponseCode::Content)
            .with_payload(ContentFormat::Text, b"80".to_vec())
            .with_observe(0);
        f.dispatcher.handle_event(TransportEvent::Response(response));
        call.await.unwrap().unwrap();

        let client = f.registry.find_by_endpoint("dev1").await.unwrap();
        let observations = f.observations.observations_of(&client.registration_id);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].token, wire.token);
    }

    #[tokio::test]
    async fn test_observation_open_before_caller_resumes() {
        let mut f = fixture().await;
        let dispatcher = f.dispatcher.clone();
        let path = Lwm2mPath::resource(3, 0, 9);
        let call = tokio::spawn(async move { dispatcher.send("dev1", DownlinkRequest::observe(path), None).await });

        let wire = f.requests.recv().await.unwrap();
        let response = WireResponse::new(wire.token, ResponseCode::Content)
            .with_payload(ContentFormat::Text, b"80".to_vec())
            .with_observe(0);
        assert!(f.dispatcher.handle_event(TransportEvent::Response(response)));
        let observation = f.observations.find_by_token(wire.token).unwrap();
        assert_eq!(observation.path, path);
        assert!(f.observations.notification_received(wire.token, Some(ContentFormat::Text), b"79"));

        call.await.unwrap().unwrap();
        assert_eq!(f.observations.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_observe_opens_nothing() {
        let mut f = fixture().await;
        let dispatcher = f.dispatcher.clone();
        let path = Lwm2mPath::resource(3, 0, 9);
        let call = tokio::spawn(async move { dispatcher.send("dev1", DownlinkRequest::observe(path), None).await });

        let wire = f.requests.recv().await.unwrap();
        f.dispatcher.handle_event(TransportEvent::Response(WireResponse::new(
            wire.token,
            ResponseCode::NotFound,
        )));
        assert!(matches!(call.await.unwrap(), Err(Lwm2mError::Protocol(ResponseCode::NotFound))));
        assert!(f.observations.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_observe_answer_closes_observation() {
        let mut f = fixture().await;
        let dispatcher = f.dispatcher.clone();
        let path = Lwm2mPath::resource(3, 0, 9);
        let call = tokio::spawn(async move { dispatcher.send("dev1", DownlinkRequest::observe(path), None).await });

        let wire = f.requests.recv().await.unwrap();
        let response = WireResponse::new(wire.token, ResponseCode::Content)
            .with_payload(ContentFormat::Tlv, vec![0xC8, 0x09]);
        f.dispatcher.handle_event(TransportEvent::Response(response));
        assert!(matches!(call.await.unwrap(), Err(Lwm2mError::MalformedPayload(_))));
        assert!(f.observations.find_by_token(wire.token).is_none());
    }

    #[tokio::test]
    async fn test_aborted_callers_leave_no_pending_entries() {
        let mut f = fixture().await;
        let mut calls = Vec::new();
        for _ in 0..10 {
            let dispatcher = f.dispatcher.clone();
            calls.push(tokio::spawn(async move {
                dispatcher
                    .send("dev1", DownlinkRequest::read(Lwm2mPath::object(3)), None)
                    .await
            }));
        }
        let mut tokens = Vec::new();
        for _ in 0..10 {
            tokens.push(f.requests.recv().await.unwrap().token);
        }
        assert_eq!(f.dispatcher.pending_count(), 10);

        for call in &calls {
            call.abort();
        }
        for call in calls {
            assert!(call.await.unwrap_err().is_cancelled());
        }
        assert_eq!(f.dispatcher.pending_count(), 0);
        for token in tokens {
            let late = WireResponse::new(token, ResponseCode::Content);
            assert!(!f.dispatcher.handle_event(TransportEvent::Response(late)));
        }
    }

    #[tokio::test]
    async fn test_create_location() {
        let mut f = fixture().await;
        let dispatcher = f.dispatcher.clone();
        let call = tokio::spawn(async move {
            dispatcher
                .send("dev1", DownlinkRequest::create(Lwm2mPath::object(12), vec![]), None)
                .await
        });
        let wire = f.requests.recv().await.unwrap();
        let response = WireResponse::new(wire.token, ResponseCode::Created).with_location("/12/1");
        f.dispatcher.handle_event(TransportEvent::Response(response));
        assert_eq!(call.await.unwrap().unwrap().location(), Some("/12/1"));
    }
}
