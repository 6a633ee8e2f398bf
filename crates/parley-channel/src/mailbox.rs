//! Read, write and consume operations on the control files
//!
//! Writes go to a hidden temporary file that is renamed over the control
//! file, so a reader never sees a half-written payload. Consuming renames the
//! control file to a unique claim name first: only one consumer can win that
//! rename, which is what makes delivery at-most-once.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ChannelError, Result};
use crate::layout::ChannelDir;
use crate::message::MessageKind;

#[derive(Debug, Clone)]
pub struct Mailbox {
    dir: ChannelDir,
    diagnostics: Diagnostics,
}

impl Mailbox {
    pub fn new(dir: ChannelDir) -> Self {
        Self {
            dir,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn dir(&self) -> &ChannelDir {
        &self.dir
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn scratch_path(&self, kind: MessageKind, suffix: &str) -> PathBuf {
        self.dir.root().join(format!(
            ".{}.{}.{}",
            kind.file_name(),
            Uuid::new_v4().simple(),
            suffix
        ))
    }

    /// Replace the control file with `payload`.
    pub fn write<T: Serialize>(&self, kind: MessageKind, payload: &T) -> Result<()> {
        let json = serde_json::to_vec(payload)?;
        let tmp = self.scratch_path(kind, "tmp");
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, self.dir.path_for(kind)) {
            let _ = fs::remove_file(&tmp);
            return Err(ChannelError::Io(e));
        }
        debug!("Wrote {} message", kind);
        Ok(())
    }

    /// Take the pending message out of the mailbox.
    ///
    /// Returns `None` when nothing is pending, when the file vanished under
    /// us, or when its content is malformed (reported as a diagnostic). A
    /// consumed message is deleted and never returned again.
    pub fn try_consume<T: DeserializeOwned>(&self, kind: MessageKind) -> Option<T> {
        let claim = self.scratch_path(kind, "claim");
        match fs::rename(self.dir.path_for(kind), &claim) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                debug!("Could not claim {} message: {}", kind, e);
                return None;
            }
        }

        let content = match fs::read(&claim) {
            Ok(content) => content,
            Err(e) => {
                debug!("Could not read claimed {} message: {}", kind, e);
                self.release_claim(kind, &claim);
                return None;
            }
        };
        let _ = fs::remove_file(&claim);

        self.parse(kind, &content)
    }

    /// Put an unread claim back so the next attempt can retry it. A message
    /// written in the meantime wins and the claim is dropped.
    fn release_claim(&self, kind: MessageKind, claim: &Path) {
        let control = self.dir.path_for(kind);
        let restored = if control.exists() {
            fs::remove_file(claim)
        } else {
            fs::rename(claim, &control)
        };
        if let Err(e) = restored {
            debug!("Could not release {} claim: {}", kind, e);
        }
    }

    /// Read the current message without consuming it.
    pub fn read<T: DeserializeOwned>(&self, kind: MessageKind) -> Option<T> {
        match fs::read(self.dir.path_for(kind)) {
            Ok(content) => self.parse(kind, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                debug!("Could not read {} message: {}", kind, e);
                None
            }
        }
    }

    /// Delete the control file. Deleting an absent file is a no-op.
    pub fn discard(&self, kind: MessageKind) -> Result<()> {
        match fs::remove_file(self.dir.path_for(kind)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ChannelError::Io(e)),
        }
    }

    pub fn is_pending(&self, kind: MessageKind) -> bool {
        self.dir.path_for(kind).is_file()
    }

    fn parse<T: DeserializeOwned>(&self, kind: MessageKind, content: &[u8]) -> Option<T> {
        match serde_json::from_slice(content) {
            Ok(value) => Some(value),
            Err(e) => {
                self.diagnostics.report(Diagnostic::MalformedMessage {
                    kind,
                    error: e.to_string(),
                });
                None
            }
        }
    }
}
