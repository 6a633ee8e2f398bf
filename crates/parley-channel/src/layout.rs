//! Channel directory layout and lifecycle

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{ChannelError, Result};
use crate::message::MessageKind;

/// Prefix of every channel directory name.
pub const DIR_PREFIX: &str = "parley-";
/// Subfolder receiving decoded feedback images.
pub const IMAGES_DIR: &str = "images";

/// Base directory under which channels are created.
///
/// Priority:
/// 1. `PARLEY_BASE_DIR` environment variable (if set)
/// 2. the OS temporary directory
pub fn default_base_dir() -> PathBuf {
    if let Ok(path) = std::env::var("PARLEY_BASE_DIR") {
        return PathBuf::from(path);
    }
    std::env::temp_dir()
}

/// A session's private mailbox directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDir {
    root: PathBuf,
}

impl ChannelDir {
    /// Create a fresh channel with a new unique id under `base`.
    pub fn create(base: &Path) -> Result<Self> {
        Self::create_with_id(base, &Uuid::new_v4().to_string())
    }

    pub fn create_with_id(base: &Path, session_id: &str) -> Result<Self> {
        let root = base.join(format!("{}{}", DIR_PREFIX, session_id));
        let images = root.join(IMAGES_DIR);
        fs::create_dir_all(&images).map_err(|source| ChannelError::CreateDir {
            path: root.clone(),
            source,
        })?;
        debug!("Created channel directory {:?}", root);
        Ok(Self { root })
    }

    /// Attach to a channel created by another process.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ChannelError::Missing(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Session id encoded in the directory name.
    #[cfg(test)]
    fn session_id(&self) -> Option<&str> {
        self.root
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix(DIR_PREFIX))
    }

    pub fn path_for(&self, kind: MessageKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    /// Remove the whole directory. See [`remove_channel_dir`].
    pub fn remove(&self) -> Result<()> {
        remove_channel_dir(&self.root)
    }
}

/// Remove a channel directory, succeeding if it is already (partly) gone.
pub fn remove_channel_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed channel directory {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ChannelError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_makes_images_subfolder() {
        let tmp = TempDir::new().unwrap();
        let dir = ChannelDir::create(tmp.path()).unwrap();
        assert!(dir.root().is_dir());
        assert!(dir.images_dir().is_dir());
        assert!(dir.root().starts_with(tmp.path()));
    }

    #[test]
    fn sessions_are_disjoint() {
        let tmp = TempDir::new().unwrap();
        let a = ChannelDir::create(tmp.path()).unwrap();
        let b = ChannelDir::create(tmp.path()).unwrap();
        assert_ne!(a.root(), b.root());
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn session_id_round_trips() {
        let tmp = TempDir::new().unwrap();
        let dir = ChannelDir::create_with_id(tmp.path(), "abc").unwrap();
        assert_eq!(dir.session_id(), Some("abc"));
        assert_eq!(dir.path_for(MessageKind::Request), dir.root().join("request"));
    }

    #[test]
    fn open_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let err = ChannelDir::open(tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ChannelError::Missing(_)));
    }

    #[test]
    fn remove_twice_is_fine() {
        let tmp = TempDir::new().unwrap();
        let dir = ChannelDir::create(tmp.path()).unwrap();
        fs::write(dir.path_for(MessageKind::Config), "{}").unwrap();
        dir.remove().unwrap();
        assert!(!dir.root().exists());
        dir.remove().unwrap();
        remove_channel_dir(dir.root()).unwrap();
    }

    #[test]
    fn remove_tolerates_partial_removal() {
        let tmp = TempDir::new().unwrap();
        let dir = ChannelDir::create(tmp.path()).unwrap();
        fs::remove_dir(dir.images_dir()).unwrap();
        dir.remove().unwrap();
        assert!(!dir.root().exists());
    }

    #[test]
    fn create_fails_under_a_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = ChannelDir::create(&blocker).unwrap_err();
        assert!(matches!(err, ChannelError::CreateDir { .. }));
    }
}
