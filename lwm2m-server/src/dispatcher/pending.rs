//! Table of requests waiting for their response

use crate::registry::Client;
use lwm2m_core::{Lwm2mPath, Lwm2mResult};
use lwm2m_transport::{Token, WireResponse};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Outcome delivered to the waiting side of a pending request
pub type Completion = Lwm2mResult<WireResponse>;

/// Subscription to open when an Observe request succeeds
#[derive(Debug, Clone)]
pub struct ObserveTarget {
    pub client: Client,
    pub path: Lwm2mPath,
}

/// A request waiting for its response
pub struct PendingEntry {
    endpoint: String,
    observe: Option<ObserveTarget>,
    sender: oneshot::Sender<Completion>,
}

impl PendingEntry {
    /// Subscription carried by an Observe request
    pub fn observe_target(&self) -> Option<&ObserveTarget> {
        self.observe.as_ref()
    }

    /// Hand the outcome to the waiting caller
    pub fn complete(self, token: Token, completion: Completion) {
        if self.sender.send(completion).is_err() {
            log::debug!("Caller waiting on {} for {} is gone", token, self.endpoint);
        }
    }
}

/// Removes a pending entry when the waiting side goes away
///
/// Dropping the guard after the entry was resolved is a no-op.
pub struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    token: Token,
}

impl<'a> PendingGuard<'a> {
    pub fn new(pending: &'a PendingRequests, token: Token) -> Self {
        Self { pending, token }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.pending.remove(self.token) {
            log::debug!("Request {} abandoned before its response", self.token);
        }
    }
}

/// Pending requests keyed by correlation token
///
/// The lock is only held for insertions and removals, never while a caller
/// waits. Resolving an entry removes it, so each request is completed at
/// most once.
#[derive(Default)]
pub struct PendingRequests {
    entries: Mutex<HashMap<Token, PendingEntry>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Token, PendingEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a request to `endpoint` under a fresh token
    ///
    /// # Arguments
    /// * `endpoint` - Endpoint name of the target client
    /// * `observe` - Subscription to open if the request is a successful Observe
    pub fn insert(
        &self,
        endpoint: &str,
        observe: Option<ObserveTarget>,
    ) -> (Token, oneshot::Receiver<Completion>) {
        let (sender, receiver) = oneshot::channel();
        let mut entries = self.entries();
        let token = loop {
            let candidate = Token::random();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };
        entries.insert(
            token,
            PendingEntry {
                endpoint: endpoint.to_string(),
                observe,
                sender,
            },
        );
        (token, receiver)
    }

    /// Complete the request registered under `token`
    ///
    /// Returns `false` if no request is pending for the token, e.g. because
    /// it already completed or timed out.
    pub fn resolve(&self, token: Token, completion: Completion) -> bool {
        match self.take(token) {
            Some(entry) => {
                entry.complete(token, completion);
                true
            }
            None => false,
        }
    }

    /// Remove the entry registered under `token` so the caller can complete it
    pub fn take(&self, token: Token) -> Option<PendingEntry> {
        self.entries().remove(&token)
    }

    /// Drop the request registered under `token` without completing it
    pub fn remove(&self, token: Token) -> bool {
        self.entries().remove(&token).is_some()
    }

    pub fn contains(&self, token: Token) -> bool {
        self.entries().contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_core::ResponseCode;

    #[tokio::test]
    async fn test_resolve_once() {
        let pending = PendingRequests::new();
        let (token, receiver) = pending.insert("dev1", None);
        assert!(pending.contains(token));

        let response = WireResponse::new(token, ResponseCode::Content);
        assert!(pending.resolve(token, Ok(response.clone())));
        assert!(!pending.resolve(token, Ok(response.clone())));
        assert_eq!(receiver.await.unwrap().unwrap(), response);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_token_leaves_entry() {
        let pending = PendingRequests::new();
        let (token, mut receiver) = pending.insert("dev1", None);
        let other = Token::new(token.value().wrapping_add(1));

        assert!(!pending.resolve(other, Ok(WireResponse::new(other, ResponseCode::Content))));
        assert!(pending.contains(token));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_guard_removes_unresolved_entry() {
        let pending = PendingRequests::new();
        let (token, _receiver) = pending.insert("dev1", None);
        drop(PendingGuard::new(&pending, token));
        assert!(pending.is_empty());

        let (token, _receiver) = pending.insert("dev1", None);
        let guard = PendingGuard::new(&pending, token);
        let entry = pending.take(token).unwrap();
        assert!(entry.observe_target().is_none());
        drop(guard);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_remove() {
        let pending = PendingRequests::new();
        let (token, _receiver) = pending.insert("dev1", None);
        let (second, _other) = pending.insert("dev1", None);
        assert_ne!(token, second);
        assert!(pending.remove(token));
        assert!(!pending.remove(token));
        assert_eq!(pending.len(), 1);
    }
}
