//! Host-side delivery of human answers

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::message::{FeedbackMessage, MessageKind};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("an answer is already being awaited")]
pub struct SlotBusy;

/// Single-item slot for an in-process listener waiting on the next answer.
///
/// Either empty (no call in flight) or holding exactly one sender.
#[derive(Debug, Clone, Default)]
pub struct PendingSlot {
    inner: Arc<Mutex<Option<oneshot::Sender<FeedbackMessage>>>>,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupy the slot. A slot whose previous receiver was dropped counts as free.
    pub fn begin(&self) -> std::result::Result<oneshot::Receiver<FeedbackMessage>, SlotBusy> {
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(SlotBusy);
        }
        let (tx, rx) = oneshot::channel();
        *slot = Some(tx);
        Ok(rx)
    }

    /// Hand `answer` to the waiting listener, if any. Returns whether one was waiting.
    pub fn resolve(&self, answer: FeedbackMessage) -> bool {
        let tx = self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match tx {
            Some(tx) => tx.send(answer).is_ok(),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

/// Writes the `feedback` file and notifies local listeners.
#[derive(Debug, Clone)]
pub struct Responder {
    mailbox: Mailbox,
    pending: PendingSlot,
}

impl Responder {
    pub fn new(mailbox: Mailbox) -> Self {
        Self {
            mailbox,
            pending: PendingSlot::new(),
        }
    }

    pub fn pending(&self) -> &PendingSlot {
        &self.pending
    }

    /// Wait in-process for the next answer submitted through [`Responder::respond`].
    pub fn next_answer(&self) -> std::result::Result<oneshot::Receiver<FeedbackMessage>, SlotBusy> {
        self.pending.begin()
    }

    pub fn respond(&self, text: impl Into<String>, images: Vec<String>) -> Result<FeedbackMessage> {
        let message = FeedbackMessage::new(text, images);
        self.mailbox.write(MessageKind::Feedback, &message)?;
        info!(
            "Feedback written ({} chars, {} image(s))",
            message.feedback.chars().count(),
            message.images.len()
        );
        if self.pending.resolve(message.clone()) {
            debug!("Feedback delivered to local listener");
        }
        Ok(message)
    }
}
