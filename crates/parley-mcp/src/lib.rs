//! Parley MCP server
//!
//! Line-delimited JSON-RPC over stdio exposing one tool that forwards the
//! agent's question to the human through a parley channel and returns the
//! answer.

pub mod dispatcher;
pub mod framing;
pub mod server;
pub mod tool;

pub use dispatcher::{Dispatcher, DispatcherOptions, PendingCall, Routed};
pub use framing::LineFramer;
pub use server::serve;
