//! Minimal panel on a terminal or a pipe
//!
//! In `Text` mode prompts are printed for a person and each input line is one
//! answer (`/clear` clears the transcript). In `Json` mode both directions are
//! panel messages, one per line, for driving the host from another program.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::conversation::Author;
use crate::panel::{PanelCommand, PanelEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelMode {
    #[default]
    Text,
    Json,
}

pub fn render(command: &PanelCommand, mode: PanelMode) -> Option<String> {
    match mode {
        PanelMode::Json => match serde_json::to_string(command) {
            Ok(json) => Some(format!("{}\n", json)),
            Err(e) => {
                warn!("Failed to encode panel command: {}", e);
                None
            }
        },
        PanelMode::Text => match command {
            PanelCommand::ShowPrompt { message } => Some(format!("\n[agent] {}\n> ", message)),
            PanelCommand::RestoreMessages { messages } if !messages.is_empty() => {
                let mut out = String::new();
                for entry in messages {
                    let who = match entry.author {
                        Author::Agent => "agent",
                        Author::Human => "you",
                    };
                    out.push_str(&format!("[{}] {}\n", who, entry.text));
                }
                Some(out)
            }
            _ => None,
        },
    }
}

pub fn parse_input(line: &str, mode: PanelMode) -> Option<PanelEvent> {
    match mode {
        PanelMode::Json => {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            match serde_json::from_str(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Ignoring malformed panel message: {}", e);
                    None
                }
            }
        }
        PanelMode::Text => match line.trim() {
            "" => None,
            "/clear" => Some(PanelEvent::Clear),
            text => Some(PanelEvent::Submit {
                text: text.to_string(),
                images: Vec::new(),
            }),
        },
    }
}

/// Render commands from `commands` onto `writer` until all senders are gone.
pub fn spawn_output<W>(
    mut commands: mpsc::UnboundedReceiver<PanelCommand>,
    mut writer: W,
    mode: PanelMode,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            let Some(out) = render(&command, mode) else {
                continue;
            };
            if let Err(e) = async {
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await
            }
            .await
            {
                warn!("Panel output closed: {}", e);
                break;
            }
        }
        debug!("Panel output stopped");
    })
}

/// Read panel events from `reader` until end of input, then close `events`.
///
/// A text panel has no handshake of its own, so it announces `ready` first.
pub fn spawn_input<R>(
    reader: R,
    events: mpsc::UnboundedSender<PanelEvent>,
    mode: PanelMode,
) -> JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if mode == PanelMode::Text && events.send(PanelEvent::Ready).is_err() {
            return;
        }
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(event) = parse_input(&line, mode) {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Panel input failed: {}", e);
                    break;
                }
            }
        }
        debug!("Panel input closed");
    })
}
