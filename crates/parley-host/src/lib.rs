//! Parley host
//!
//! The long-running human side of a parley channel. It owns the session
//! directory, mirrors its settings into the channel's config snapshot, shows
//! agent prompts on a panel and writes the human's answers back.

pub mod conversation;
pub mod error;
pub mod host;
pub mod panel;
pub mod session;
pub mod settings;
pub mod terminal;

pub use conversation::{Author, ConversationEntry, ConversationLog};
pub use error::{HostError, Result, SettingsError};
pub use host::Host;
pub use panel::{Panel, PanelCommand, PanelEvent};
pub use session::{SessionContext, MCP_CONFIG_FILE};
pub use settings::{HostSettings, SettingsWatcher, SETTINGS_FILE};
pub use terminal::PanelMode;
