//! Host settings from `settings.toml`
//!
//! ```toml
//! [parley]
//! tool_name = "run_auto_tester"
//! footer = "Report back when done."
//! enter_to_submit = true
//! poll_interval_ms = 500
//! ```
//!
//! A missing file means defaults. [`SettingsWatcher`] reloads the file when it
//! changes on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parley_channel::{
    ConfigSnapshot, DEFAULT_FOOTER, DEFAULT_POLL_INTERVAL, DEFAULT_TOOL_DESCRIPTION,
    DEFAULT_TOOL_NAME,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SettingsError;
use crate::panel::PanelCommand;

pub const SETTINGS_FILE: &str = "settings.toml";

const MIN_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub tool_name: String,
    pub tool_description: String,
    pub footer: String,
    pub enter_to_submit: bool,
    pub ctrl_enter_to_submit: bool,
    pub poll_interval_ms: u64,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            tool_description: DEFAULT_TOOL_DESCRIPTION.to_string(),
            footer: DEFAULT_FOOTER.to_string(),
            enter_to_submit: true,
            ctrl_enter_to_submit: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    parley: HostSettings,
}

impl HostSettings {
    /// `<config_dir>/parley/settings.toml`
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::NoConfigDir)?
            .join("parley");
        Ok(config_dir.join(SETTINGS_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let file: SettingsFile = toml::from_str(content)?;
        Ok(file.parley)
    }

    pub fn to_snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            tool_name: self.tool_name.clone(),
            tool_description: self.tool_description.clone(),
            footer: self.footer.clone(),
        }
        .normalized()
    }

    pub fn panel_config(&self) -> PanelCommand {
        PanelCommand::Config {
            enter_to_submit: self.enter_to_submit,
            ctrl_enter_to_submit: self.ctrl_enter_to_submit,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

/// Watches one settings file and sends each successfully reloaded version.
///
/// Dropping the watcher stops the updates.
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
}

impl SettingsWatcher {
    /// Watch `path`, starting from `current`. Its parent directory is
    /// created if missing so a file written later is still picked up.
    pub fn spawn(
        path: &Path,
        current: HostSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<HostSettings>), SettingsError> {
        let path = path.to_path_buf();
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let (tx, rx) = mpsc::unbounded_channel();

        let target = path.clone();
        let mut last = current;
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &target) => match HostSettings::load(&target) {
                    Ok(settings) if settings != last => {
                        last = settings.clone();
                        if tx.send(settings).is_err() {
                            debug!("Settings receiver dropped");
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Keeping previous settings: {}", e),
                },
                Ok(_) => {}
                Err(e) => warn!("Settings watch error: {}", e),
            },
            Config::default(),
        )?;
        fs::create_dir_all(&parent).map_err(|source| SettingsError::CreateDir {
            path: parent.clone(),
            source,
        })?;
        // Editors often replace the file, so watch the directory.
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;
        info!("Watching settings at {}", path.display());

        Ok((Self { _watcher: watcher }, rx))
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name().is_some() && p.file_name() == target.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = HostSettings::load(&tmp.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, HostSettings::default());
        assert_eq!(settings.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let settings = HostSettings::parse(
            r#"
            [parley]
            tool_name = "ask_me"
            ctrl_enter_to_submit = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.tool_name, "ask_me");
        assert!(settings.ctrl_enter_to_submit);
        assert!(settings.enter_to_submit);
        assert_eq!(settings.footer, DEFAULT_FOOTER);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        fs::write(&path, "[parley\ntool_name = ").unwrap();
        assert!(matches!(
            HostSettings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn snapshot_normalizes_blank_name() {
        let settings = HostSettings {
            tool_name: "  ".into(),
            footer: "bye".into(),
            ..HostSettings::default()
        };
        let snapshot = settings.to_snapshot();
        assert_eq!(snapshot.tool_name, DEFAULT_TOOL_NAME);
        assert_eq!(snapshot.footer, "bye");
    }

    #[test]
    fn poll_interval_has_a_floor() {
        let settings = HostSettings {
            poll_interval_ms: 0,
            ..HostSettings::default()
        };
        assert_eq!(
            settings.poll_interval(),
            Duration::from_millis(MIN_POLL_INTERVAL_MS)
        );
    }

    #[tokio::test]
    async fn watcher_reports_changes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        let (_watcher, mut updates) = SettingsWatcher::spawn(&path, HostSettings::default()).unwrap();

        fs::write(&path, "[parley]\ntool_name = \"renamed\"\n").unwrap();

        let updated = tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .expect("no settings update")
            .unwrap();
        assert_eq!(updated.tool_name, "renamed");
    }

    #[tokio::test]
    async fn watcher_creates_missing_config_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("config").join("parley");
        let path = dir.join(SETTINGS_FILE);
        let (_watcher, mut updates) = SettingsWatcher::spawn(&path, HostSettings::default()).unwrap();
        assert!(dir.is_dir());

        fs::write(&path, "[parley]\nfooter = \"fresh install\"\n").unwrap();

        let updated = tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .expect("no settings update")
            .unwrap();
        assert_eq!(updated.footer, "fresh install");
    }
}
