//! Config mirror: tool metadata published by the host for the MCP server
//!
//! The host rewrites the snapshot whenever its settings change; the server
//! reads it fresh on every `tools/list` and `tools/call`. A missing or
//! corrupt snapshot falls back to the built-in defaults.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::message::MessageKind;

pub const DEFAULT_TOOL_NAME: &str = "run_auto_tester";

pub const DEFAULT_TOOL_DESCRIPTION: &str = "Ask the human supervising this session a question, \
or report progress, and wait for their reply. Put the question or report in `description`. \
The reply is the human's answer and may include images.";

pub const DEFAULT_FOOTER: &str =
    "When you have acted on this feedback, call this tool again to report back.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigSnapshot {
    pub tool_name: String,
    pub tool_description: String,
    pub footer: String,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            tool_description: DEFAULT_TOOL_DESCRIPTION.to_string(),
            footer: DEFAULT_FOOTER.to_string(),
        }
    }
}

impl ConfigSnapshot {
    /// Load the current snapshot, or the defaults if there is none.
    pub fn load(mailbox: &Mailbox) -> Self {
        mailbox
            .read::<ConfigSnapshot>(MessageKind::Config)
            .unwrap_or_default()
            .normalized()
    }

    /// Replace the snapshot in the channel.
    pub fn publish(&self, mailbox: &Mailbox) -> Result<()> {
        mailbox.write(MessageKind::Config, &self.clone().normalized())
    }

    /// Blank name or description fall back to the defaults; a tool must
    /// always be callable.
    pub fn normalized(mut self) -> Self {
        if self.tool_name.trim().is_empty() {
            self.tool_name = DEFAULT_TOOL_NAME.to_string();
        } else {
            self.tool_name = self.tool_name.trim().to_string();
        }
        if self.tool_description.trim().is_empty() {
            self.tool_description = DEFAULT_TOOL_DESCRIPTION.to_string();
        }
        self
    }
}
