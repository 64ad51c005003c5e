//! Correlated request/response over the raw event channel.
//!
//! The room-listing request is callback-shaped on the wire: the client sends
//! a frame carrying a correlation id, and the server answers with an `ack`
//! frame echoing that id. This maps each outstanding correlation id to a
//! oneshot sender so callers can simply await a typed response.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::oneshot;

/// Outstanding correlated requests for one channel instance.
#[derive(Default)]
pub struct PendingRequests {
    inner: Mutex<HashMap<String, oneshot::Sender<Value>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request, returning its correlation id and the receiver
    /// the caller awaits.
    pub fn register(&self) -> (String, oneshot::Receiver<Value>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().insert(id.clone(), tx);
        (id, rx)
    }

    /// Complete a pending request with the server's response payload.
    /// Returns false when the id is unknown (late or duplicate response).
    pub fn complete(&self, correlation_id: &str, data: Value) -> bool {
        match self.inner.lock().unwrap().remove(correlation_id) {
            Some(tx) => tx.send(data).is_ok(),
            None => {
                tracing::debug!(correlation_id, "response for unknown request");
                false
            }
        }
    }

    /// Drop every outstanding request. Connection teardown: awaiting callers
    /// observe a closed receiver instead of hanging until timeout.
    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_resolves_awaiting_caller() {
        let pending = PendingRequests::new();
        let (id, rx) = pending.register();

        assert!(pending.complete(&id, serde_json::json!([1, 2, 3])));
        assert_eq!(rx.await.unwrap(), serde_json::json!([1, 2, 3]));
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_response_is_rejected() {
        let pending = PendingRequests::new();
        let (id, _rx) = pending.register();

        assert!(pending.complete(&id, Value::Null));
        assert!(!pending.complete(&id, Value::Null));
    }

    #[tokio::test]
    async fn test_clear_closes_receivers() {
        let pending = PendingRequests::new();
        let (_id, rx) = pending.register();

        pending.clear();
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let pending = PendingRequests::new();
        assert!(!pending.complete("nope", Value::Null));
    }
}
