//! Window handles: the addresses frames post messages to.

use super::message::FrameMessage;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// Data delivered to a window, with the sender's handle when known.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub source: Option<WindowHandle>,
    pub data: Value,
}

/// Receiving end of a window's channel.
pub type Inbox = mpsc::UnboundedReceiver<Envelope>;

/// Cloneable address of one frame's window.
///
/// Posting is fire-and-forget: a window whose inbox was dropped (a sandboxed
/// or torn-down frame) swallows messages silently.
#[derive(Clone)]
pub struct WindowHandle {
    id: u64,
    origin: String,
    tx: mpsc::UnboundedSender<Envelope>,
}

/// Create a window for `origin` together with its inbox.
pub fn channel(origin: impl Into<String>) -> (WindowHandle, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = WindowHandle {
        id: NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed),
        origin: origin.into(),
        tx,
    };
    (handle, rx)
}

impl WindowHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Post `message` as coming from `source`. Returns false when nobody
    /// listens on this window.
    pub fn post(&self, message: &FrameMessage, source: &WindowHandle) -> bool {
        debug!(to = self.id, from = source.id, kind = message.kind(), "post message");
        self.post_raw(message.to_wire(), Some(source.clone()))
    }

    /// Post arbitrary data, e.g. traffic from unrelated scripts.
    pub fn post_raw(&self, data: Value, source: Option<WindowHandle>) -> bool {
        self.tx.send(Envelope { source, data }).is_ok()
    }

    /// True when the receiving frame is gone or never listened.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PartialEq for WindowHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WindowHandle {}

impl std::hash::Hash for WindowHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowHandle")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .finish()
    }
}
