//! Desktop-session autostart for the tray shell
//!
//! Enabling writes a freedesktop `.desktop` entry under
//! `~/.config/autostart/`; disabling removes it. The file's existence is the
//! only state.

use crate::core::{AutostartConfig, Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const DESCRIPTOR_NAME: &str = "aiov2_ctl.desktop";

pub struct AutostartManager {
    path: PathBuf,
    command: String,
    delay_secs: u64,
    icon: String,
}

impl AutostartManager {
    pub fn new(path: impl Into<PathBuf>, config: &AutostartConfig, icon: &str) -> Self {
        Self {
            path: path.into(),
            command: config.command.clone(),
            delay_secs: config.delay_secs,
            icon: icon.to_string(),
        }
    }

    /// Manager for the descriptor in the current user's autostart directory
    pub fn for_current_user(config: &AutostartConfig, icon: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        Ok(Self::new(config_dir.join("autostart").join(DESCRIPTOR_NAME), config, icon))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_file()
    }

    /// Descriptor contents written by [`enable`](Self::enable)
    pub fn descriptor(&self) -> String {
        let exec = if self.delay_secs > 0 {
            format!("sh -c \"sleep {} && {} --gui\"", self.delay_secs, self.command)
        } else {
            format!("{} --gui", self.command)
        };

        format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=AIO v2 Controller\n\
             Comment=Tray controls for the AIO v2 board features\n\
             Exec={}\n\
             Icon={}\n\
             Terminal=false\n\
             X-GNOME-Autostart-enabled=true\n\
             X-GNOME-Autostart-Delay={}\n",
            exec, self.icon, self.delay_secs
        )
    }

    /// Write the descriptor, replacing any previous one
    pub fn enable(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, self.descriptor())?;
        log::info!("Autostart enabled at {}", self.path.display());
        Ok(())
    }

    /// Remove the descriptor. Returns false when it was already absent.
    pub fn disable(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Autostart disabled ({} removed)", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(dir: &Path) -> AutostartManager {
        let config = AutostartConfig {
            delay_secs: 15,
            command: "/usr/local/bin/aiov2_ctl".to_string(),
        };
        AutostartManager::new(dir.join("autostart").join(DESCRIPTOR_NAME), &config, "utilities-system-monitor")
    }

    fn descriptor_count(dir: &Path) -> usize {
        fs::read_dir(dir.join("autostart")).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_enable_disable_enable() {
        let dir = tempfile::tempdir().unwrap();
        let autostart = manager(dir.path());

        autostart.enable().unwrap();
        assert!(autostart.disable().unwrap());
        assert!(!autostart.is_enabled());
        autostart.enable().unwrap();

        assert_eq!(descriptor_count(dir.path()), 1);
        assert_eq!(fs::read_to_string(autostart.path()).unwrap(), autostart.descriptor());
    }

    #[test]
    fn test_enable_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let autostart = manager(dir.path());

        autostart.enable().unwrap();
        autostart.enable().unwrap();
        assert!(autostart.is_enabled());
        assert_eq!(descriptor_count(dir.path()), 1);
    }

    #[test]
    fn test_disable_when_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let autostart = manager(dir.path());

        assert!(!autostart.disable().unwrap());
        assert!(!autostart.disable().unwrap());
        assert!(!dir.path().join("autostart").exists());
    }

    #[test]
    fn test_descriptor_launches_gui_after_delay() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = manager(dir.path()).descriptor();

        assert!(descriptor.starts_with("[Desktop Entry]\n"));
        assert!(descriptor.contains("Exec=sh -c \"sleep 15 && /usr/local/bin/aiov2_ctl --gui\"\n"));
        assert!(descriptor.contains("X-GNOME-Autostart-Delay=15\n"));
        assert!(descriptor.contains("Icon=utilities-system-monitor\n"));
    }

    #[test]
    fn test_zero_delay_runs_directly() {
        let config = AutostartConfig {
            delay_secs: 0,
            command: "aiov2_ctl".to_string(),
        };
        let descriptor = AutostartManager::new("/tmp/x.desktop", &config, "icon").descriptor();
        assert!(descriptor.contains("Exec=aiov2_ctl --gui\n"));
    }
}
