//! Payloads of the control files

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which control file a message lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Prompt from the agent, written by the server, consumed by the host.
    Request,
    /// Human answer, written by the host, consumed by the server.
    Feedback,
    /// Tool metadata mirror, written by the host, read (never consumed) by the server.
    Config,
}

impl MessageKind {
    pub fn file_name(self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Feedback => "feedback",
            MessageKind::Config => "config",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub prompt: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl RequestMessage {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub feedback: String,
    /// Data URIs or raw base64, in the order the human attached them.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub timestamp: i64,
}

impl FeedbackMessage {
    pub fn new(feedback: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            feedback: feedback.into(),
            images,
            timestamp: now_millis(),
        }
    }
}
