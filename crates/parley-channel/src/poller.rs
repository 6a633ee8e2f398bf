//! Host-side loop that picks up agent prompts

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::mailbox::Mailbox;
use crate::message::{MessageKind, RequestMessage};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Receiver of consumed prompts. Must return quickly; the poller calls it
/// inline between ticks.
pub trait RequestSink: Send {
    fn deliver(&mut self, request: RequestMessage);
}

impl<F> RequestSink for F
where
    F: FnMut(RequestMessage) + Send,
{
    fn deliver(&mut self, request: RequestMessage) {
        self(request)
    }
}

/// Constant-interval poller for the `request` file.
#[derive(Debug, Clone)]
pub struct Poller {
    mailbox: Mailbox,
    interval: Duration,
}

impl Poller {
    pub fn new(mailbox: Mailbox) -> Self {
        Self {
            mailbox,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One poll step. Returns whether a request was delivered.
    pub fn tick(&self, sink: &mut impl RequestSink) -> bool {
        match self.mailbox.try_consume::<RequestMessage>(MessageKind::Request) {
            Some(request) => {
                debug!("Picked up request written at {}", request.timestamp);
                sink.deliver(request);
                true
            }
            None => false,
        }
    }

    /// Poll until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken, mut sink: impl RequestSink) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Polling for requests every {:?}", self.interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick(&mut sink);
                }
            }
        }
        debug!("Request poller stopped");
    }

    pub fn spawn(
        self,
        cancel: CancellationToken,
        sink: impl RequestSink + 'static,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ChannelDir;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn mailbox() -> (TempDir, Mailbox) {
        let tmp = TempDir::new().unwrap();
        let dir = ChannelDir::create(tmp.path()).unwrap();
        (tmp, Mailbox::new(dir))
    }

    #[test]
    fn tick_delivers_once() {
        let (_tmp, mailbox) = mailbox();
        let poller = Poller::new(mailbox.clone());
        let mut seen = Vec::new();

        mailbox
            .write(MessageKind::Request, &RequestMessage::new("hello"))
            .unwrap();
        assert!(poller.tick(&mut |r: RequestMessage| seen.push(r.prompt)));
        assert!(!poller.tick(&mut |r: RequestMessage| seen.push(r.prompt)));
        assert_eq!(seen, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn run_delivers_until_cancelled() {
        let (_tmp, mailbox) = mailbox();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();

        let sink_seen = seen.clone();
        let handle = Poller::new(mailbox.clone())
            .with_interval(Duration::from_millis(10))
            .spawn(cancel.clone(), move |r: RequestMessage| {
                sink_seen.lock().unwrap().push(r.prompt);
            });

        mailbox
            .write(MessageKind::Request, &RequestMessage::new("first"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        mailbox
            .write(MessageKind::Request, &RequestMessage::new("second"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first".to_string(), "second".to_string()]
        );
    }
}
