//! Server-side wait for a human answer
//!
//! A call writes the `request` file, gives the host poller a moment to pick
//! it up, then polls for `feedback` until it arrives or the timeout elapses.
//! Calls do not overlap: a second call while one is in flight fails with
//! [`WaitError::Busy`]. Dropping the returned future abandons the call and
//! frees the slot.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::ConfigSnapshot;
use crate::diagnostics::Diagnostic;
use crate::error::ChannelError;
use crate::images::{save_images, ImagePayload};
use crate::mailbox::Mailbox;
use crate::message::{now_millis, FeedbackMessage, MessageKind, RequestMessage};
use crate::poller::DEFAULT_POLL_INTERVAL;

/// Reply text when no answer arrives in time.
pub const TIMEOUT_SENTINEL: &str = "[Timeout: No feedback received]";

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Stand-in deadline for timeouts too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiterTimings {
    /// Pause after writing the request before the first feedback poll.
    pub settle_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for WaiterTimings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("Feedback request already in progress")]
    Busy,
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Fulfilled,
    TimedOut,
}

/// What a call hands back to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackReply {
    pub outcome: WaitOutcome,
    /// Human text plus image references and footer, or the timeout sentinel.
    pub text: String,
    pub images: Vec<ImagePayload>,
    pub image_paths: Vec<PathBuf>,
}

impl FeedbackReply {
    pub fn timed_out() -> Self {
        Self {
            outcome: WaitOutcome::TimedOut,
            text: TIMEOUT_SENTINEL.to_string(),
            images: Vec::new(),
            image_paths: Vec::new(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.outcome == WaitOutcome::TimedOut
    }
}

struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub struct Waiter {
    mailbox: Mailbox,
    timings: WaiterTimings,
    in_flight: Arc<AtomicBool>,
}

impl Waiter {
    pub fn new(mailbox: Mailbox) -> Self {
        Self {
            mailbox,
            timings: WaiterTimings::default(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_timings(mut self, timings: WaiterTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the in-flight slot for one call.
    ///
    /// The slot stays taken until the returned [`FeedbackCall`] finishes or
    /// is dropped.
    pub fn begin(&self) -> Result<FeedbackCall, WaitError> {
        let guard = InFlight::acquire(&self.in_flight).ok_or(WaitError::Busy)?;
        Ok(FeedbackCall {
            mailbox: self.mailbox.clone(),
            timings: self.timings,
            request_out: false,
            _guard: guard,
        })
    }

    /// Ask the human `prompt` and wait at most `timeout` for the answer.
    ///
    /// A timeout is a normal reply carrying [`TIMEOUT_SENTINEL`], not an error.
    pub async fn request_feedback(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<FeedbackReply, WaitError> {
        self.begin()?.wait(prompt, timeout).await
    }
}

/// One claimed round-trip. Consumed by [`FeedbackCall::wait`].
///
/// Dropping a call mid-wait withdraws its unanswered request.
pub struct FeedbackCall {
    mailbox: Mailbox,
    timings: WaiterTimings,
    /// Our `request` file may still be waiting for the host.
    request_out: bool,
    _guard: InFlight,
}

impl FeedbackCall {
    pub async fn wait(mut self, prompt: &str, timeout: Duration) -> Result<FeedbackReply, WaitError> {
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);

        // An answer left over from an earlier cycle must not satisfy this one.
        self.mailbox.discard(MessageKind::Feedback)?;
        self.mailbox
            .write(MessageKind::Request, &RequestMessage::new(prompt))?;
        self.request_out = true;
        debug!("Request written, waiting up to {:?} for feedback", timeout);

        sleep_until((Instant::now() + self.timings.settle_delay).min(deadline)).await;

        loop {
            if let Some(feedback) = self
                .mailbox
                .try_consume::<FeedbackMessage>(MessageKind::Feedback)
            {
                info!("Feedback received");
                self.request_out = false;
                return Ok(self.fulfill(feedback));
            }

            let now = Instant::now();
            if now >= deadline {
                info!("No feedback within {:?}", timeout);
                self.withdraw_request();
                return Ok(FeedbackReply::timed_out());
            }
            sleep_until((now + self.timings.poll_interval).min(deadline)).await;
        }
    }

    fn withdraw_request(&mut self) {
        self.request_out = false;
        if let Err(e) = self.mailbox.discard(MessageKind::Request) {
            debug!("Could not withdraw unanswered request: {}", e);
        }
    }

    fn fulfill(&self, feedback: FeedbackMessage) -> FeedbackReply {
        let mut images = Vec::with_capacity(feedback.images.len());
        for (index, encoded) in feedback.images.iter().enumerate() {
            match ImagePayload::decode(encoded) {
                Ok(image) => images.push(image),
                Err(e) => self.mailbox.diagnostics().report(Diagnostic::ImageDecodeFailed {
                    index,
                    error: e.to_string(),
                }),
            }
        }

        let cycle = if feedback.timestamp > 0 {
            feedback.timestamp
        } else {
            now_millis()
        };
        let image_paths = match save_images(&self.mailbox.dir().images_dir(), cycle, &images) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Could not save feedback images: {}", e);
                Vec::new()
            }
        };

        let config = ConfigSnapshot::load(&self.mailbox);
        FeedbackReply {
            outcome: WaitOutcome::Fulfilled,
            text: compose_reply_text(&feedback.feedback, &image_paths, &config.footer),
            images,
            image_paths,
        }
    }
}

impl Drop for FeedbackCall {
    fn drop(&mut self) {
        if self.request_out {
            debug!("Call abandoned, withdrawing its request");
            self.withdraw_request();
        }
    }
}

impl std::fmt::Debug for FeedbackCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackCall")
            .field("channel", &self.mailbox.dir().root())
            .finish()
    }
}

/// Human text, then saved image paths, then the footer.
pub fn compose_reply_text(feedback: &str, image_paths: &[PathBuf], footer: &str) -> String {
    let mut text = feedback.to_string();
    if !image_paths.is_empty() {
        text.push_str("\n\nAttached images:");
        for path in image_paths {
            text.push_str("\n- ");
            text.push_str(&path.display().to_string());
        }
    }
    let footer = footer.trim();
    if !footer.is_empty() {
        text.push_str("\n\n");
        text.push_str(footer);
    }
    text
}
