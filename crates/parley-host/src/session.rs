//! One host session: its channel directory and mailbox

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parley_channel::{ChannelDir, Diagnostics, Mailbox};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{HostError, Result};

pub const MCP_CONFIG_FILE: &str = "mcp.json";

/// Owns the channel for the lifetime of the host.
///
/// The directory is removed by [`SessionContext::close`], or on drop if
/// `close` was never called.
#[derive(Debug)]
pub struct SessionContext {
    mailbox: Mailbox,
    closed: AtomicBool,
}

impl SessionContext {
    /// Create a fresh channel under `base`. Failure here is fatal for the host.
    pub fn create(base: &Path) -> Result<Self> {
        Self::create_with_diagnostics(base, Diagnostics::default())
    }

    pub fn create_with_diagnostics(base: &Path, diagnostics: Diagnostics) -> Result<Self> {
        let dir = ChannelDir::create(base).map_err(HostError::CreateChannel)?;
        info!("Session channel at {}", dir.root().display());
        Ok(Self {
            mailbox: Mailbox::new(dir).with_diagnostics(diagnostics),
            closed: AtomicBool::new(false),
        })
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn dir(&self) -> &ChannelDir {
        self.mailbox.dir()
    }

    pub fn root(&self) -> &Path {
        self.dir().root()
    }

    /// Write `mcp.json`: an MCP client entry that launches `server_command`
    /// against this channel.
    pub fn write_mcp_config(&self, server_command: &str) -> Result<PathBuf> {
        let config = json!({
            "mcpServers": {
                "parley": {
                    "command": server_command,
                    "args": ["--channel", self.root().display().to_string()],
                }
            }
        });
        let path = self.root().join(MCP_CONFIG_FILE);
        fs::write(&path, serde_json::to_vec_pretty(&config)?)?;
        Ok(path)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Remove the channel directory. Only the first call does anything.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.dir().remove() {
            Ok(()) => info!("Removed session channel {}", self.root().display()),
            Err(e) => warn!("Failed to remove session channel: {}", e),
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sessions_are_disjoint() {
        let tmp = TempDir::new().unwrap();
        let a = SessionContext::create(tmp.path()).unwrap();
        let b = SessionContext::create(tmp.path()).unwrap();
        assert_ne!(a.root(), b.root());
        assert!(a.root().is_dir() && b.root().is_dir());
    }

    #[test]
    fn close_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let session = SessionContext::create(tmp.path()).unwrap();
        let root = session.root().to_path_buf();

        session.close();
        assert!(!root.exists());
        assert!(session.is_closed());
        session.close();
    }

    #[test]
    fn close_tolerates_removed_directory() {
        let tmp = TempDir::new().unwrap();
        let session = SessionContext::create(tmp.path()).unwrap();
        fs::remove_dir_all(session.root()).unwrap();
        session.close();
    }

    #[test]
    fn drop_cleans_up() {
        let tmp = TempDir::new().unwrap();
        let root = SessionContext::create(tmp.path())
            .unwrap()
            .root()
            .to_path_buf();
        assert!(!root.exists());
    }

    #[test]
    fn unusable_base_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            SessionContext::create(&file),
            Err(HostError::CreateChannel(_))
        ));
    }

    #[test]
    fn mcp_config_points_at_channel() {
        let tmp = TempDir::new().unwrap();
        let session = SessionContext::create(tmp.path()).unwrap();
        let path = session.write_mcp_config("parley-mcp").unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        let server = &value["mcpServers"]["parley"];
        assert_eq!(server["command"], "parley-mcp");
        assert_eq!(server["args"][1], session.root().display().to_string());
    }
}
