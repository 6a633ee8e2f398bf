//! Messages exchanged with the panel that shows prompts to the human
//!
//! The panel itself (rendering, image capture) lives outside this crate; the
//! host only speaks these JSON messages to it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::conversation::ConversationEntry;

/// Host to panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PanelCommand {
    ShowPrompt {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Config {
        enter_to_submit: bool,
        ctrl_enter_to_submit: bool,
    },
    RestoreMessages {
        messages: Vec<ConversationEntry>,
    },
    Focus,
}

/// Panel to host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PanelEvent {
    Submit {
        text: String,
        #[serde(default)]
        images: Vec<String>,
    },
    Clear,
    Ready,
}

/// Fire-and-forget sink for panel commands. Must not block.
pub trait Panel: Send + Sync {
    fn post(&self, command: PanelCommand);
}

impl Panel for mpsc::UnboundedSender<PanelCommand> {
    fn post(&self, command: PanelCommand) {
        if self.send(command).is_err() {
            debug!("Panel is gone, dropping command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Author;
    use serde_json::json;

    #[test]
    fn commands_use_wire_names() {
        let cases = [
            (
                PanelCommand::ShowPrompt {
                    message: "hi".into(),
                },
                json!({ "command": "showPrompt", "message": "hi" }),
            ),
            (
                PanelCommand::Config {
                    enter_to_submit: true,
                    ctrl_enter_to_submit: false,
                },
                json!({ "command": "config", "enterToSubmit": true, "ctrlEnterToSubmit": false }),
            ),
            (PanelCommand::Focus, json!({ "command": "focus" })),
        ];
        for (command, expected) in cases {
            assert_eq!(serde_json::to_value(&command).unwrap(), expected);
        }
    }

    #[test]
    fn restore_carries_entries() {
        let command = PanelCommand::RestoreMessages {
            messages: vec![ConversationEntry {
                text: "q".into(),
                author: Author::Agent,
                images: None,
            }],
        };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({
                "command": "restoreMessages",
                "messages": [{ "text": "q", "author": "agent" }]
            })
        );
    }

    #[test]
    fn events_parse_from_panel_json() {
        let submit: PanelEvent =
            serde_json::from_str(r#"{"command":"submit","text":"ok","images":["AA"]}"#).unwrap();
        assert_eq!(
            submit,
            PanelEvent::Submit {
                text: "ok".into(),
                images: vec!["AA".into()]
            }
        );

        let bare: PanelEvent = serde_json::from_str(r#"{"command":"submit","text":"ok"}"#).unwrap();
        assert!(matches!(bare, PanelEvent::Submit { images, .. } if images.is_empty()));

        let ready: PanelEvent = serde_json::from_str(r#"{"command":"ready"}"#).unwrap();
        assert_eq!(ready, PanelEvent::Ready);
        assert!(serde_json::from_str::<PanelEvent>(r#"{"command":"explode"}"#).is_err());
    }

    #[test]
    fn channel_panel_tolerates_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.post(PanelCommand::Focus);
    }
}
