//! Cross-frame coordination protocol.
//!
//! Frames never share memory: they talk through [`WindowHandle`]s by posting
//! JSON envelopes whose `type` carries the [`NAMESPACE`] prefix. Requests
//! that expect an answer are tracked in a [`PendingRequests`] table.

pub mod message;
pub mod pending;
pub mod window;

pub use message::{FrameMessage, NAMESPACE};
pub use pending::{PendingRequests, generate_request_id};
pub use window::{Envelope, Inbox, WindowHandle, channel};
