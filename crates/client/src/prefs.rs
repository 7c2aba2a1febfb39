//! Durable client preference: "user explicitly disconnected".
//!
//! A single boolean, persisted as a marker file, read on load to suppress
//! silent auto-reconnect. Set on explicit disconnect, cleared on explicit
//! connect; never set by revocation events.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

#[derive(Debug, Clone)]
pub struct DisconnectPreference {
    path: PathBuf,
}

impl DisconnectPreference {
    /// Locate the marker under the platform data directory.
    pub fn from_project_dirs() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "registry-client")
            .context("No platform data directory available")?;
        std::fs::create_dir_all(dirs.data_dir())
            .context("Failed to create preference directory")?;
        Ok(Self {
            path: dirs.data_dir().join("wallet-disconnected"),
        })
    }

    /// Use an explicit marker path (tests).
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn user_disconnected(&self) -> bool {
        self.path.exists()
    }

    pub fn set_disconnected(&self) -> io::Result<()> {
        std::fs::write(&self.path, b"1")
    }

    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = DisconnectPreference::at(dir.path().join("flag"));

        assert!(!prefs.user_disconnected());
        prefs.set_disconnected().unwrap();
        assert!(prefs.user_disconnected());
        prefs.clear().unwrap();
        assert!(!prefs.user_disconnected());

        // Clearing an already-clear flag is not an error.
        prefs.clear().unwrap();
    }
}
