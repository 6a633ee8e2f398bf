//! File-backed mailbox between the long-running parley host and the
//! short-lived MCP server.
//!
//! A channel is a private directory holding at most one `request`, one
//! `feedback` and one `config` file plus an `images/` folder. The presence of
//! a control file means a message is pending; consuming it removes it, so
//! every message is delivered at most once.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod images;
pub mod layout;
pub mod mailbox;
pub mod message;
pub mod poller;
pub mod responder;
pub mod waiter;

pub use config::{ConfigSnapshot, DEFAULT_FOOTER, DEFAULT_TOOL_DESCRIPTION, DEFAULT_TOOL_NAME};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{ChannelError, Result};
pub use images::ImagePayload;
pub use layout::{default_base_dir, remove_channel_dir, ChannelDir};
pub use mailbox::Mailbox;
pub use message::{now_millis, FeedbackMessage, MessageKind, RequestMessage};
pub use poller::{Poller, RequestSink, DEFAULT_POLL_INTERVAL};
pub use responder::{PendingSlot, Responder, SlotBusy};
pub use waiter::{
    FeedbackCall, FeedbackReply, WaitError, WaitOutcome, Waiter, WaiterTimings, DEFAULT_CALL_TIMEOUT,
    DEFAULT_SETTLE_DELAY, TIMEOUT_SENTINEL,
};
