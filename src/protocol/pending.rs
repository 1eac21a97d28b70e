//! Pending cross-frame requests.
//!
//! Each outgoing request gets an id and a oneshot completion. A response
//! resolves the entry at most once; a timeout removes it, after which a
//! late response finds nothing and is dropped.

use crate::error::{TranslateError, TranslateResult};
use rand::Rng;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Outcome relayed by the responder: translated text or its error message.
pub type Outcome = Result<String, String>;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `<prefix>-<unix millis>-<9 base36 chars>`.
pub fn generate_request_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, millis, suffix)
}

/// Request id → completion handle. Frame-local, so not `Send`.
#[derive(Default)]
pub struct PendingRequests {
    entries: RefCell<HashMap<String, oneshot::Sender<Outcome>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh request and return its id with the receiving end.
    pub fn register(&self, prefix: &str) -> (String, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let mut entries = self.entries.borrow_mut();
        let mut id = generate_request_id(prefix);
        while entries.contains_key(&id) {
            id = generate_request_id(prefix);
        }
        entries.insert(id.clone(), tx);
        (id, rx)
    }

    /// Complete `request_id`. Returns false for unknown or expired ids.
    pub fn resolve(&self, request_id: &str, outcome: Outcome) -> bool {
        let Some(tx) = self.entries.borrow_mut().remove(request_id) else {
            debug!(request_id, "response for unknown or expired request dropped");
            return false;
        };
        tx.send(outcome).is_ok()
    }

    /// Wait for `request_id` for at most `timeout`.
    ///
    /// On expiry the entry is removed and the call fails with
    /// [`TranslateError::RequestTimeout`].
    pub async fn wait(
        &self,
        request_id: &str,
        rx: oneshot::Receiver<Outcome>,
        timeout: Duration,
    ) -> TranslateResult<String> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(text))) => Ok(text),
            Ok(Ok(Err(message))) => Err(TranslateError::Delegated(message)),
            Ok(Err(_)) => Err(TranslateError::ChannelClosed),
            Err(_) => {
                self.entries.borrow_mut().remove(request_id);
                warn!(request_id, ?timeout, "cross-frame request timed out");
                Err(TranslateError::RequestTimeout {
                    request_id: request_id.to_string(),
                })
            }
        }
    }

    /// Forget `request_id` without completing it.
    pub fn cancel(&self, request_id: &str) -> bool {
        self.entries.borrow_mut().remove(request_id).is_some()
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.entries.borrow().contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl std::fmt::Debug for PendingRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequests")
            .field("in_flight", &self.len())
            .finish()
    }
}
