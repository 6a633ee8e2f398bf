//! Host runtime: connects the channel to the panel
//!
//! Three independent inputs drive the host: prompts picked up by the
//! [`Poller`], events from the panel and reloaded settings. None of them
//! blocks the others.

use std::sync::{Arc, Mutex, MutexGuard};

use parley_channel::{Poller, RequestMessage, Responder};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::conversation::ConversationLog;
use crate::error::Result;
use crate::panel::{Panel, PanelCommand, PanelEvent};
use crate::session::SessionContext;
use crate::settings::HostSettings;

pub struct Host {
    session: Arc<SessionContext>,
    panel: Arc<dyn Panel>,
    responder: Responder,
    log: Arc<Mutex<ConversationLog>>,
    settings: Mutex<HostSettings>,
}

impl Host {
    pub fn new(session: Arc<SessionContext>, panel: Arc<dyn Panel>, settings: HostSettings) -> Self {
        let responder = Responder::new(session.mailbox().clone());
        Self {
            session,
            panel,
            responder,
            log: Arc::new(Mutex::new(ConversationLog::new())),
            settings: Mutex::new(settings),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    pub fn settings(&self) -> HostSettings {
        lock(&self.settings).clone()
    }

    pub fn conversation(&self) -> ConversationLog {
        lock(&self.log).clone()
    }

    /// Publish the initial config snapshot.
    pub fn start(&self) -> Result<()> {
        let snapshot = lock(&self.settings).to_snapshot();
        snapshot.publish(self.session.mailbox())?;
        info!("Published tool {:?}", snapshot.tool_name);
        Ok(())
    }

    /// Sink for the poller: record the prompt and bring it to the human.
    pub fn request_sink(&self) -> impl FnMut(RequestMessage) + Send + 'static {
        let log = self.log.clone();
        let panel = self.panel.clone();
        move |request: RequestMessage| {
            info!("Prompt from agent ({} chars)", request.prompt.chars().count());
            lock(&log).push_agent(request.prompt.clone());
            panel.post(PanelCommand::ShowPrompt {
                message: request.prompt,
            });
            panel.post(PanelCommand::Focus);
        }
    }

    pub fn handle_event(&self, event: PanelEvent) -> Result<()> {
        match event {
            PanelEvent::Submit { text, images } => {
                if text.trim().is_empty() && images.is_empty() {
                    debug!("Ignoring empty submission");
                    return Ok(());
                }
                lock(&self.log).push_human(text.clone(), images.clone());
                self.responder.respond(text, images)?;
            }
            PanelEvent::Clear => {
                lock(&self.log).clear();
                debug!("Conversation cleared");
            }
            PanelEvent::Ready => {
                self.panel.post(self.settings().panel_config());
                let messages = lock(&self.log).entries().to_vec();
                self.panel.post(PanelCommand::RestoreMessages { messages });
            }
        }
        Ok(())
    }

    /// Adopt new settings: republish the snapshot and update the panel.
    pub fn apply_settings(&self, settings: HostSettings) -> Result<()> {
        let snapshot = settings.to_snapshot();
        snapshot.publish(self.session.mailbox())?;
        self.panel.post(settings.panel_config());
        let mut current = lock(&self.settings);
        if current.poll_interval_ms != settings.poll_interval_ms {
            // The poller keeps its interval until the host restarts.
            info!("Poll interval change takes effect on next start");
        }
        *current = settings;
        drop(current);
        info!("Settings reloaded, tool is {:?}", snapshot.tool_name);
        Ok(())
    }

    /// Run until `cancel` fires or the panel event stream ends.
    pub async fn run(
        &self,
        cancel: CancellationToken,
        mut events: mpsc::UnboundedReceiver<PanelEvent>,
        mut settings_updates: Option<mpsc::UnboundedReceiver<HostSettings>>,
    ) -> Result<()> {
        self.start()?;

        let poll_cancel = cancel.child_token();
        let poller = Poller::new(self.session.mailbox().clone())
            .with_interval(self.settings().poll_interval())
            .spawn(poll_cancel.clone(), self.request_sink());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_event(event) {
                            warn!("Failed to handle panel event: {}", e);
                        }
                    }
                    None => {
                        info!("Panel closed");
                        break;
                    }
                },
                update = next_update(&mut settings_updates) => match update {
                    Some(settings) => {
                        if let Err(e) = self.apply_settings(settings) {
                            warn!("Failed to apply settings: {}", e);
                        }
                    }
                    None => {
                        debug!("Settings watcher stopped");
                        settings_updates = None;
                    }
                },
            }
        }

        poll_cancel.cancel();
        if let Err(e) = poller.await {
            warn!("Poller task failed: {}", e);
        }
        Ok(())
    }
}

async fn next_update(
    updates: &mut Option<mpsc::UnboundedReceiver<HostSettings>>,
) -> Option<HostSettings> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
