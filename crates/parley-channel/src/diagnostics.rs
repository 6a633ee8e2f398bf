//! Observable reporting for input that is dropped instead of propagated.
//!
//! Corrupt control files and malformed RPC frames must never take the bridge
//! down, so they are skipped. Every skip is logged through `tracing` and, when
//! a hook is installed, handed to it as a [`Diagnostic`].

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::message::MessageKind;

/// Something that was skipped rather than processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A control file existed but did not parse.
    MalformedMessage { kind: MessageKind, error: String },
    /// A line on the RPC stream was not a JSON-RPC object.
    MalformedFrame { line: String, error: String },
    /// A feedback image could not be decoded and was left out of the reply.
    ImageDecodeFailed { index: usize, error: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedMessage { kind, error } => {
                write!(f, "malformed {} message skipped: {}", kind, error)
            }
            Diagnostic::MalformedFrame { line, error } => {
                write!(f, "malformed frame dropped ({}): {}", error, line)
            }
            Diagnostic::ImageDecodeFailed { index, error } => {
                write!(f, "image #{} skipped: {}", index, error)
            }
        }
    }
}

type Hook = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// Cloneable handle that logs diagnostics and forwards them to an optional hook.
#[derive(Clone, Default)]
pub struct Diagnostics {
    hook: Option<Hook>,
}

impl Diagnostics {
    pub fn new(hook: impl Fn(&Diagnostic) + Send + Sync + 'static) -> Self {
        Self {
            hook: Some(Arc::new(hook)),
        }
    }

    /// Diagnostics that collect everything reported into a shared vector.
    pub fn recording() -> (Self, Arc<Mutex<Vec<Diagnostic>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let diagnostics = Self::new(move |d| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(d.clone());
            }
        });
        (diagnostics, seen)
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        if let Some(hook) = &self.hook {
            hook(&diagnostic);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
